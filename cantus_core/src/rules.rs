// Rule engine: the cantus firmus rules as independent boolean predicates.
//
// Each rule looks at one `Melody` and answers pass/fail. A melody is a valid
// cantus firmus iff every rule passes. Rules share no state and never mutate
// the melody, so the engine is safe to call from any number of rayon
// workers at once, and the order in which rules run never changes the
// verdict (the engine short-circuits on the first failure).
//
// The rules, in evaluation order:
// - Range bound: total range at most a tenth (9 generic steps).
// - Stepwise close: the final is reached by two consecutive seconds.
// - No long linear run: fewer than 5 identical intervals in a row.
// - Leap preparation/fill: leaps are approached and left by contrary
//   motion, and contrary steps before a leap fill enough of it.
// - Culmination uniqueness: the extreme high (and/or low) point is unique.
// - Direction changes: at least two interior turning points.
// - Pitch-repeat limits: no pitch three times in alternation, and no pitch
//   `max_pitch_repeats` times overall.
// - No repeated pattern: no two adjacent equal windows of pitches.
// - Seventh outline: no two turning points a seventh apart.
// - Modal forbidden leaps: no tritone-family pitches near each other in the
//   reference major mode.
//
// Tunable thresholds live in `RuleConfig`, which is carried by each search
// configuration rather than held globally.
//
// See also: `melody.rs` for the derived views these rules read,
// `search.rs` which calls `is_valid` once per candidate.

use crate::melody::{Melody, is_step};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generic interval of a seventh between two turning points.
pub const SEVENTH: i32 = 6;

/// Pitches (relative to the tonic of the reference major mode) that form
/// augmented or diminished intervals with one another: the leading tone in
/// three octaves (-8, -1, 6) and the subdominant in two (-4, 3).
pub const FORBIDDEN_PITCHES: [i32; 5] = [-8, -4, -1, 3, 6];

/// Leading-tone family of the forbidden pitches.
pub const LEADING_TONE_GROUP: [i32; 3] = [-8, -1, 6];

/// Subdominant family of the forbidden pitches.
pub const SUBDOMINANT_GROUP: [i32; 2] = [-4, 3];

/// Which variant of the modal forbidden-leap rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForbiddenLeapVariant {
    /// Adjacent pairs, pairs one note apart, and no mixing of the leading
    /// tone and subdominant families among the turning points.
    #[default]
    Full,
    /// Legacy form: adjacent pairs only.
    AdjacentOnly,
}

/// Thresholds for the rule battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Largest allowed distance between highest and lowest pitch.
    pub max_range: i32,
    /// A run of this many identical intervals fails.
    pub max_equal_run: usize,
    /// Minimum length of the extremes list (endpoints included).
    pub min_extremes: usize,
    /// A pitch occurring this many times fails. The default of 3 allows at
    /// most two occurrences of any pitch.
    pub max_pitch_repeats: usize,
    pub forbidden_leaps: ForbiddenLeapVariant,
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            max_range: 9,
            max_equal_run: 5,
            min_extremes: 4,
            max_pitch_repeats: 3,
            forbidden_leaps: ForbiddenLeapVariant::Full,
        }
    }
}

/// One rule of the battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    RangeBound,
    StepwiseClose,
    NoLongLinearRun,
    LeapsPreparedAndFilled,
    UniqueCulmination,
    DirectionChanges,
    PitchRepeatLimits,
    NoRepeatedPattern,
    NoSeventhOutline,
    ModalForbiddenLeaps,
}

impl Rule {
    pub const ALL: [Rule; 10] = [
        Rule::RangeBound,
        Rule::StepwiseClose,
        Rule::NoLongLinearRun,
        Rule::LeapsPreparedAndFilled,
        Rule::UniqueCulmination,
        Rule::DirectionChanges,
        Rule::PitchRepeatLimits,
        Rule::NoRepeatedPattern,
        Rule::NoSeventhOutline,
        Rule::ModalForbiddenLeaps,
    ];

    /// Stable identifier, matching the serde form.
    pub fn name(self) -> &'static str {
        match self {
            Rule::RangeBound => "range_bound",
            Rule::StepwiseClose => "stepwise_close",
            Rule::NoLongLinearRun => "no_long_linear_run",
            Rule::LeapsPreparedAndFilled => "leaps_prepared_and_filled",
            Rule::UniqueCulmination => "unique_culmination",
            Rule::DirectionChanges => "direction_changes",
            Rule::PitchRepeatLimits => "pitch_repeat_limits",
            Rule::NoRepeatedPattern => "no_repeated_pattern",
            Rule::NoSeventhOutline => "no_seventh_outline",
            Rule::ModalForbiddenLeaps => "modal_forbidden_leaps",
        }
    }

    /// Evaluate this rule alone.
    pub fn check(self, melody: &Melody, config: &RuleConfig) -> bool {
        match self {
            Rule::RangeBound => melody.range() <= config.max_range,
            Rule::StepwiseClose => has_stepwise_close(melody),
            Rule::NoLongLinearRun => !has_equal_run(melody.intervals(), config.max_equal_run),
            Rule::LeapsPreparedAndFilled => leaps_prepared_and_filled(melody),
            Rule::UniqueCulmination => has_unique_culmination(melody.pitches()),
            Rule::DirectionChanges => melody.extremes().len() >= config.min_extremes,
            Rule::PitchRepeatLimits => within_pitch_repeat_limits(melody.pitches(), config.max_pitch_repeats),
            Rule::NoRepeatedPattern => !has_repeated_pattern(melody.pitches()),
            Rule::NoSeventhOutline => !outlines_seventh(melody.extremes()),
            Rule::ModalForbiddenLeaps => avoids_forbidden_leaps(melody, config.forbidden_leaps),
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Engine ──

/// True iff every rule passes. Stops at the first failure.
pub fn is_valid(melody: &Melody, config: &RuleConfig) -> bool {
    Rule::ALL.iter().all(|rule| rule.check(melody, config))
}

/// The first failing rule in evaluation order, if any.
pub fn first_violation(melody: &Melody, config: &RuleConfig) -> Option<Rule> {
    Rule::ALL.into_iter().find(|rule| !rule.check(melody, config))
}

/// Outcome of a single rule within a full report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: Rule,
    pub passed: bool,
}

/// Every rule evaluated, without short-circuiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReport {
    pub outcomes: Vec<RuleOutcome>,
}

impl RuleReport {
    pub fn is_valid(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn violations(&self) -> Vec<Rule> {
        self.outcomes.iter().filter(|o| !o.passed).map(|o| o.rule).collect()
    }
}

/// Evaluate every rule and collect the outcomes.
pub fn evaluate(melody: &Melody, config: &RuleConfig) -> RuleReport {
    RuleReport {
        outcomes: Rule::ALL
            .into_iter()
            .map(|rule| RuleOutcome {
                rule,
                passed: rule.check(melody, config),
            })
            .collect(),
    }
}

// ── Contour rules ──

fn has_stepwise_close(melody: &Melody) -> bool {
    match melody.intervals() {
        [.., penultimate, last] => is_step(*penultimate) && is_step(*last),
        _ => false,
    }
}

fn has_equal_run(intervals: &[i32], max_run: usize) -> bool {
    let mut run = 1;
    for w in intervals.windows(2) {
        if w[0] == w[1] {
            run += 1;
            if run >= max_run {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

fn has_unique_culmination(pitches: &[i32]) -> bool {
    let (Some(&max), Some(&min)) = (pitches.iter().max(), pitches.iter().min()) else {
        return false;
    };
    let occurs_once = |value: i32| pitches.iter().filter(|&&p| p == value).count() == 1;
    if min >= 0 {
        occurs_once(max)
    } else if max <= 0 {
        occurs_once(min)
    } else {
        occurs_once(max) && occurs_once(min)
    }
}

fn within_pitch_repeat_limits(pitches: &[i32], max_repeats: usize) -> bool {
    // a, x, a, y, a
    if pitches.windows(5).any(|w| w[0] == w[2] && w[2] == w[4]) {
        return false;
    }
    let mut counts: HashMap<i32, usize> = HashMap::with_capacity(pitches.len());
    for &p in pitches {
        let count = counts.entry(p).or_insert(0);
        *count += 1;
        if *count >= max_repeats {
            return false;
        }
    }
    true
}

fn has_repeated_pattern(pitches: &[i32]) -> bool {
    let n = pitches.len();
    (1..=n / 2).any(|len| {
        (0..=n - 2 * len).any(|i| pitches[i..i + len] == pitches[i + len..i + 2 * len])
    })
}

fn outlines_seventh(extremes: &[i32]) -> bool {
    extremes.iter().enumerate().any(|(i, &a)| {
        extremes[i + 1..].iter().any(|&b| (a - b).abs() == SEVENTH)
    })
}

// ── Leap preparation ──

/// How a leap is approached, read backward from the leap over the run of
/// motions against its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeapApproach {
    /// Nothing precedes the leap, or only a unison does.
    Open,
    /// The leap continues motion already going its way.
    SameDirection,
    /// `steps` consecutive motions against the leap precede it, spanning
    /// `fill` in total. `after_same_direction` is set when the note before
    /// that run was itself reached by motion in the leap's direction.
    Opposed {
        steps: usize,
        fill: i32,
        after_same_direction: bool,
    },
}

impl LeapApproach {
    /// Classify the approach to the last interval of `segment`.
    pub fn classify(segment: &[i32]) -> LeapApproach {
        let Some((&leap, before)) = segment.split_last() else {
            return LeapApproach::Open;
        };
        let direction = leap.signum();
        let mut steps = 0;
        let mut fill = 0;
        for &iv in before.iter().rev() {
            if iv.signum() == -direction {
                steps += 1;
                fill += iv;
                continue;
            }
            let same = iv != 0 && iv.signum() == direction;
            return match (steps, same) {
                (0, true) => LeapApproach::SameDirection,
                (0, false) => LeapApproach::Open,
                _ => LeapApproach::Opposed {
                    steps,
                    fill,
                    after_same_direction: same,
                },
            };
        }
        if steps == 0 {
            LeapApproach::Open
        } else {
            LeapApproach::Opposed {
                steps,
                fill,
                after_same_direction: false,
            }
        }
    }

    /// Whether a leap of `leap` approached this way is acceptable.
    ///
    /// A contrary run that itself turned back from motion in the leap's
    /// direction must fill at least half the leap: with one contrary step a
    /// tolerance of half a step applies, with two there is none. Longer
    /// contrary runs are always accepted.
    pub fn accepts(self, leap: i32) -> bool {
        let leap = leap.abs();
        match self {
            LeapApproach::Open => true,
            LeapApproach::SameDirection => false,
            LeapApproach::Opposed {
                steps: 1,
                fill,
                after_same_direction: true,
            } => 2 * fill.abs() >= leap - 1,
            LeapApproach::Opposed {
                steps: 2,
                fill,
                after_same_direction: true,
            } => 2 * fill.abs() >= leap,
            LeapApproach::Opposed { .. } => true,
        }
    }
}

fn leaps_prepared_and_filled(melody: &Melody) -> bool {
    melody.segments_around_leaps().iter().all(|segment| {
        let leap = segment[segment.len() - 1];
        LeapApproach::classify(segment).accepts(leap)
    })
}

// ── Modal rules ──

fn avoids_forbidden_leaps(melody: &Melody, variant: ForbiddenLeapVariant) -> bool {
    let forbidden = |p: &i32| FORBIDDEN_PITCHES.contains(p);
    let pitches = melody.pitches();

    if pitches.windows(2).any(|w| forbidden(&w[0]) && forbidden(&w[1])) {
        return false;
    }
    if variant == ForbiddenLeapVariant::AdjacentOnly {
        return true;
    }
    if pitches.windows(3).any(|w| forbidden(&w[0]) && forbidden(&w[2])) {
        return false;
    }

    let extremes = melody.extremes();
    let has_leading_tone = extremes.iter().any(|e| LEADING_TONE_GROUP.contains(e));
    let has_subdominant = extremes.iter().any(|e| SUBDOMINANT_GROUP.contains(e));
    !(has_leading_tone && has_subdominant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passes(rule: Rule, intervals: &[i32]) -> bool {
        rule.check(&Melody::new(intervals.to_vec()), &RuleConfig::default())
    }

    #[test]
    fn test_range_bound() {
        assert!(passes(Rule::RangeBound, &[4, 5]));
        assert!(!passes(Rule::RangeBound, &[5, 5]));
    }

    #[test]
    fn test_stepwise_close() {
        assert!(passes(Rule::StepwiseClose, &[2, -1, -1]));
        assert!(passes(Rule::StepwiseClose, &[-1, 1]));
        assert!(!passes(Rule::StepwiseClose, &[2, 1, -3]));
        assert!(!passes(Rule::StepwiseClose, &[1]));
        assert!(!passes(Rule::StepwiseClose, &[]));
    }

    #[test]
    fn test_no_long_linear_run() {
        assert!(passes(Rule::NoLongLinearRun, &[1, 1, 1, 1, -4]));
        assert!(!passes(Rule::NoLongLinearRun, &[1, 1, 1, 1, 1, -5]));
        // Same direction but different sizes is not a run.
        assert!(passes(Rule::NoLongLinearRun, &[1, 1, 2, 1, 1, -6]));
    }

    #[test]
    fn test_classify_leap_approach() {
        assert_eq!(LeapApproach::classify(&[4]), LeapApproach::Open);
        assert_eq!(LeapApproach::classify(&[1, 4]), LeapApproach::SameDirection);
        assert_eq!(LeapApproach::classify(&[0, 4]), LeapApproach::Open);
        assert_eq!(
            LeapApproach::classify(&[2, -1, 4]),
            LeapApproach::Opposed { steps: 1, fill: -1, after_same_direction: true }
        );
        assert_eq!(
            LeapApproach::classify(&[-1, -1, 5]),
            LeapApproach::Opposed { steps: 2, fill: -2, after_same_direction: false }
        );
        assert_eq!(
            LeapApproach::classify(&[0, -1, 4]),
            LeapApproach::Opposed { steps: 1, fill: -1, after_same_direction: false }
        );
        assert_eq!(
            LeapApproach::classify(&[1, -1, -1, -1, 5]),
            LeapApproach::Opposed { steps: 3, fill: -3, after_same_direction: true }
        );
    }

    #[test]
    fn test_leap_fill_thresholds() {
        // One contrary step: 2 * |fill| >= |leap| - 1.
        assert!(!LeapApproach::classify(&[2, -1, 4]).accepts(4));
        assert!(LeapApproach::classify(&[2, -2, 4]).accepts(4));
        assert!(LeapApproach::classify(&[2, -1, 3]).accepts(3));
        // Two contrary steps: 2 * |fill| >= |leap|.
        assert_eq!(
            LeapApproach::classify(&[1, -1, -1, 4]),
            LeapApproach::Opposed { steps: 2, fill: -2, after_same_direction: true }
        );
        assert!(LeapApproach::classify(&[1, -1, -1, 4]).accepts(4));
        assert!(!LeapApproach::classify(&[1, -1, -1, 5]).accepts(5));
        assert!(LeapApproach::classify(&[1, -1, -2, 5]).accepts(5));
        // Three contrary steps are never checked.
        assert!(LeapApproach::classify(&[1, -1, -1, -1, 5]).accepts(5));
    }

    #[test]
    fn test_leaps_prepared_and_filled() {
        assert!(!passes(Rule::LeapsPreparedAndFilled, &[1, 4, -1, -2, -1, -1]));
        assert!(passes(Rule::LeapsPreparedAndFilled, &[-1, 4, -1, -1, -1]));
        assert!(!passes(Rule::LeapsPreparedAndFilled, &[2, -1, 4, -3]));
        assert!(passes(Rule::LeapsPreparedAndFilled, &[2, -2, 4, -4]));
        assert!(passes(Rule::LeapsPreparedAndFilled, &[2, -1, 3, -4]));
        assert!(!passes(Rule::LeapsPreparedAndFilled, &[1, -1, -1, 5, -4]));
        assert!(passes(Rule::LeapsPreparedAndFilled, &[1, -1, -2, 5, -3]));
        assert!(passes(Rule::LeapsPreparedAndFilled, &[0, -1, 4, -3]));
        // A leap continued in its own direction fails from the reverse side.
        assert!(!passes(Rule::LeapsPreparedAndFilled, &[-1, 4, 1, -2, -2]));
    }

    #[test]
    fn test_unique_culmination() {
        assert!(passes(Rule::UniqueCulmination, &[1, 1, -1, -1]));
        assert!(!passes(Rule::UniqueCulmination, &[2, 0, -2]));
        assert!(passes(Rule::UniqueCulmination, &[-1, -1, 1, 1]));
        assert!(passes(Rule::UniqueCulmination, &[2, -4, 2]));
        assert!(!passes(Rule::UniqueCulmination, &[2, -4, 2, 2, -2]));
    }

    #[test]
    fn test_direction_changes() {
        assert!(!passes(Rule::DirectionChanges, &[1, 1, -1, -1]));
        assert!(passes(Rule::DirectionChanges, &[2, -1, 2, -3]));
    }

    #[test]
    fn test_pitch_repeat_limits() {
        // 0 1 0 1 0: the same pitch every other note.
        assert!(!passes(Rule::PitchRepeatLimits, &[1, -1, 1, -1]));
        // 0 1 3 1 0 3 0: three zeros, never in alternation.
        let thrice = Melody::new(vec![1, 2, -2, -1, 3, -3]);
        assert!(!Rule::PitchRepeatLimits.check(&thrice, &RuleConfig::default()));
        let lenient = RuleConfig {
            max_pitch_repeats: 4,
            ..RuleConfig::default()
        };
        assert!(Rule::PitchRepeatLimits.check(&thrice, &lenient));
    }

    #[test]
    fn test_no_repeated_pattern() {
        assert!(!passes(Rule::NoRepeatedPattern, &[1, -1, 1, -1]));
        assert!(!passes(Rule::NoRepeatedPattern, &[2, 0, -2]));
        assert!(passes(Rule::NoRepeatedPattern, &[1, 1, -1, -1]));
    }

    #[test]
    fn test_no_seventh_outline() {
        assert!(!passes(Rule::NoSeventhOutline, &[3, 3, -6]));
        assert!(passes(Rule::NoSeventhOutline, &[2, 2, -4]));
        // 4 and -2 are not adjacent turning points but still a seventh apart.
        assert!(!passes(Rule::NoSeventhOutline, &[4, -2, 1, -5]));
    }

    #[test]
    fn test_modal_forbidden_leaps() {
        // 3 then 6: adjacent forbidden pitches.
        assert!(!passes(Rule::ModalForbiddenLeaps, &[3, 3]));
        // -1 and 3 one note apart.
        assert!(!passes(Rule::ModalForbiddenLeaps, &[-1, 2, 2]));
        // -1 and 3 far apart, but both are turning points.
        assert!(!passes(Rule::ModalForbiddenLeaps, &[-1, 1, 1, 1, 1]));
        assert!(passes(Rule::ModalForbiddenLeaps, &[1, 1, -1, -1]));
    }

    #[test]
    fn test_adjacent_only_variant_is_weaker() {
        let legacy = RuleConfig {
            forbidden_leaps: ForbiddenLeapVariant::AdjacentOnly,
            ..RuleConfig::default()
        };
        let gapped = Melody::new(vec![-1, 2, 2]);
        assert!(Rule::ModalForbiddenLeaps.check(&gapped, &legacy));
        let adjacent = Melody::new(vec![3, 3]);
        assert!(!Rule::ModalForbiddenLeaps.check(&adjacent, &legacy));
    }

    #[test]
    fn test_reference_cantus_fails_only_on_repeats() {
        let m = Melody::new(vec![1, 2, -1, 3, -1, -1, -2, 1, -1, -1]);
        let report = evaluate(&m, &RuleConfig::default());
        assert_eq!(report.violations(), vec![Rule::PitchRepeatLimits]);
        assert_eq!(first_violation(&m, &RuleConfig::default()), Some(Rule::PitchRepeatLimits));

        let lenient = RuleConfig {
            max_pitch_repeats: 4,
            ..RuleConfig::default()
        };
        assert!(is_valid(&m, &lenient));
    }

    #[test]
    fn test_known_valid_melody() {
        let m = Melody::new(vec![-1, -1, 3, -2, 3, -1, -1]);
        assert!(is_valid(&m, &RuleConfig::default()));
        assert_eq!(first_violation(&m, &RuleConfig::default()), None);
        assert!(evaluate(&m, &RuleConfig::default()).is_valid());
    }

    #[test]
    fn test_rule_names_match_serde() {
        for rule in Rule::ALL {
            let json = serde_json::to_string(&rule).unwrap();
            assert_eq!(json, format!("\"{}\"", rule.name()));
        }
    }

    #[test]
    fn test_rule_config_partial_json() {
        let config: RuleConfig = serde_json::from_str(r#"{"max_range": 7}"#).unwrap();
        assert_eq!(config.max_range, 7);
        assert_eq!(config.max_pitch_repeats, 3);
        assert_eq!(config.forbidden_leaps, ForbiddenLeapVariant::Full);
    }
}
