// End-to-end tests for the search pipeline.
//
// Runs the reference search (8 notes, at least 4 seconds, alphabet
// {-7,-4,-3,-2,-1,1,2,3,4,5,7}) and checks the accepted set against the
// properties every accepted melody must have: closure, the step threshold,
// no five equal intervals in a row, and that each melody re-validates on
// its own. Also checks that sequential and parallel runs agree and that
// cancellation from another thread stops a run.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use cantus_core::enumerate::count_steps;
use cantus_core::rules::{self, Rule};
use cantus_core::{Melody, Search, SearchConfig, SearchError, search};

fn reference(parallel: bool) -> SearchConfig {
    SearchConfig {
        parallel,
        workers: 4,
        ..SearchConfig::default()
    }
}

#[test]
fn reference_search_is_non_empty_and_revalidates() {
    let config = reference(true);
    let outcome = search(&config).unwrap();
    assert_eq!(outcome.melodies.len(), 84);

    for intervals in &outcome.melodies {
        assert_eq!(intervals.len(), 7);
        let melody = Melody::new(intervals.clone());
        for rule in Rule::ALL {
            assert!(rule.check(&melody, &config.rules), "{rule} failed on {melody}");
        }
        assert!(rules::is_valid(&melody, &config.rules));
    }
}

#[test]
fn accepted_melodies_are_closed_and_stepwise() {
    let config = reference(false);
    let outcome = search(&config).unwrap();
    for intervals in &outcome.melodies {
        assert_eq!(intervals.iter().sum::<i32>(), 0, "{intervals:?} does not return home");
        assert!(count_steps(intervals) >= config.min_steps);
        assert!(intervals.iter().all(|iv| config.alphabet.contains(iv)));
        assert!(
            !intervals.windows(5).any(|w| w.iter().all(|&iv| iv == w[0])),
            "{intervals:?} has a run of five equal intervals"
        );
        let [.., a, b] = intervals.as_slice() else {
            panic!("melody too short: {intervals:?}");
        };
        assert_eq!((a.abs(), b.abs()), (1, 1));
    }
}

#[test]
fn sequential_and_parallel_agree() {
    let sequential = search(&reference(false)).unwrap();
    let parallel = search(&reference(true)).unwrap();
    assert_eq!(sequential.melodies, parallel.melodies);
    assert_eq!(sequential.stats.candidates, parallel.stats.candidates);
}

#[test]
fn raising_the_step_threshold_narrows_the_result() {
    let base = search(&reference(false)).unwrap().melodies;
    let stricter = search(&SearchConfig {
        min_steps: 5,
        ..reference(false)
    })
    .unwrap()
    .melodies;
    assert!(stricter.is_subset(&base));
    let expected: BTreeSet<_> = base.into_iter().filter(|m| count_steps(m) >= 5).collect();
    assert_eq!(stricter, expected);
}

#[test]
fn short_and_invalid_lengths() {
    let two = search(&SearchConfig { length: 2, ..reference(true) }).unwrap();
    assert!(two.melodies.is_empty());

    let one = search(&SearchConfig { length: 1, ..reference(true) });
    assert!(matches!(one, Err(SearchError::InvalidParameters(_))));
}

#[test]
fn cancellation_token_stops_the_run() {
    let token = Arc::new(AtomicBool::new(false));
    let search = Search::new(reference(false)).with_cancel(Arc::clone(&token));
    assert!(search.run().is_ok());

    token.store(true, std::sync::atomic::Ordering::Relaxed);
    assert!(matches!(search.run(), Err(SearchError::Cancelled)));
}
