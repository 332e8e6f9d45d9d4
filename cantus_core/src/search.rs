// Search pipeline: enumerate, permute, validate.
//
// A run has three stages, each consuming the previous stage's output:
//
// 1. Enumerate (single thread): every zero-sum multiset of the alphabet
//    with `length - 1` elements (`ClosedCombinations`), keeping those with
//    at least `min_steps` seconds. This filter runs before any permutation
//    is expanded.
// 2. Permute (per multiset): distinct orderings ending in two seconds
//    (`StepwiseClosings`).
// 3. Validate (per ordering): build a `Melody` and keep it iff every rule
//    passes (`rules::is_valid`).
//
// Stages 2 and 3 are fused into one task per multiset. Tasks share nothing
// mutable: each reads its multiset and the run's `RuleConfig` and returns a
// `Batch`. A parallel run executes the tasks on a rayon pool built for the
// run; a sequential run maps them in order. Either way the batches are
// merged by set union into a `BTreeSet`, so both modes return the same set.
//
// Failure handling: every task runs under `catch_unwind`. All tasks are
// allowed to finish before any failure is reported, and a panic anywhere
// turns the whole run into `SearchError::WorkerPanicked` rather than a
// silently partial result. The cancel token is polled between stages and at
// the start of every task.
//
// See also: `enumerate.rs` for the two generators, `rules.rs` for the
// validator, `config.rs` for `SearchConfig`.

use crate::config::SearchConfig;
use crate::enumerate::{ClosedCombinations, StepwiseClosings, count_steps};
use crate::error::SearchError;
use crate::melody::Melody;
use crate::rules::{self, RuleConfig};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Counters from one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Zero-sum multisets enumerated.
    pub combinations: usize,
    /// Multisets that met the step threshold.
    pub eligible: usize,
    /// Orderings ending in two seconds, i.e. melodies put to the rules.
    pub candidates: usize,
    /// Melodies that passed every rule.
    pub accepted: usize,
    pub elapsed: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct SearchOutcome {
    /// Accepted interval sequences. A set: no order is implied by the run.
    pub melodies: BTreeSet<Vec<i32>>,
    pub stats: SearchStats,
}

/// The result of stages 2 and 3 for one multiset.
#[derive(Debug, Default)]
struct Batch {
    candidates: usize,
    accepted: Vec<Vec<i32>>,
}

type Validator = fn(&Melody, &RuleConfig) -> bool;

/// One configured search run.
pub struct Search {
    config: SearchConfig,
    cancel: Option<Arc<AtomicBool>>,
    validator: Validator,
}

impl Search {
    pub fn new(config: SearchConfig) -> Self {
        Search {
            config,
            cancel: None,
            validator: rules::is_valid,
        }
    }

    /// Abort the run once `token` is set. Checked between stages and before
    /// each multiset is expanded; work already in flight finishes first.
    pub fn with_cancel(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn run(&self) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        let start = Instant::now();
        let config = &self.config;

        if config.length < 3 {
            // A single interval can never end on two seconds.
            info!(length = config.length, "melody too short for a stepwise close, nothing to search");
            return Ok(SearchOutcome {
                stats: SearchStats {
                    elapsed: start.elapsed(),
                    ..SearchStats::default()
                },
                ..SearchOutcome::default()
            });
        }

        // ── Stage 1: enumerate ──
        self.check_cancelled()?;
        let mut combinations = 0;
        let eligible: Vec<Vec<i32>> = ClosedCombinations::new(&config.alphabet, config.interval_count())
            .inspect(|_| combinations += 1)
            .filter(|c| count_steps(c) >= config.min_steps)
            .collect();
        info!(
            combinations,
            eligible = eligible.len(),
            min_steps = config.min_steps,
            "enumerated closed interval combinations"
        );
        self.check_cancelled()?;

        // ── Stages 2 and 3: permute and validate ──
        let results: Vec<Result<Batch, SearchError>> = if config.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("cantus-search-{i}"))
                .build()?;
            info!(workers = pool.current_num_threads(), "validating candidates in parallel");
            pool.install(|| eligible.par_iter().map(|c| self.run_task(c)).collect())
        } else {
            info!("validating candidates sequentially");
            eligible.iter().map(|c| self.run_task(c)).collect()
        };

        // ── Merge ──
        let mut first_error = None;
        let mut melodies = BTreeSet::new();
        let mut candidates = 0;
        for result in results {
            match result {
                Ok(batch) => {
                    candidates += batch.candidates;
                    melodies.extend(batch.accepted);
                }
                // A panic outranks a cancellation.
                Err(err @ SearchError::WorkerPanicked(_)) => {
                    if !matches!(first_error, Some(SearchError::WorkerPanicked(_))) {
                        first_error = Some(err);
                    }
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            warn!(error = %err, "search aborted");
            return Err(err);
        }

        let stats = SearchStats {
            combinations,
            eligible: eligible.len(),
            candidates,
            accepted: melodies.len(),
            elapsed: start.elapsed(),
        };
        info!(
            candidates = stats.candidates,
            accepted = stats.accepted,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "search complete"
        );
        Ok(SearchOutcome { melodies, stats })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|token| token.load(Ordering::Relaxed))
    }

    fn check_cancelled(&self) -> Result<(), SearchError> {
        if self.is_cancelled() {
            Err(SearchError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn run_task(&self, multiset: &[i32]) -> Result<Batch, SearchError> {
        self.check_cancelled()?;
        let validator = self.validator;
        let rules = &self.config.rules;
        panic::catch_unwind(AssertUnwindSafe(|| expand_and_validate(multiset, rules, validator)))
            .map_err(|payload| SearchError::WorkerPanicked(panic_message(payload.as_ref())))
    }
}

fn expand_and_validate(multiset: &[i32], rules: &RuleConfig, validator: Validator) -> Batch {
    let mut batch = Batch::default();
    for ordering in StepwiseClosings::new(multiset) {
        batch.candidates += 1;
        let melody = Melody::new(ordering);
        if validator(&melody, rules) {
            batch.accepted.push(melody.into_intervals());
        }
    }
    debug!(
        ?multiset,
        candidates = batch.candidates,
        accepted = batch.accepted.len(),
        "expanded combination"
    );
    batch
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run one search with `config`.
pub fn search(config: &SearchConfig) -> Result<SearchOutcome, SearchError> {
    Search::new(config.clone()).run()
}
