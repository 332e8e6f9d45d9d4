// Property tests for the melody model and rule engine.
//
// Random interval sequences drawn from the full generic range (-7..=7,
// unisons included) must always satisfy the structural invariants of the
// derived views, and rule evaluation must be a pure function of the
// sequence.

use cantus_core::melody::{Melody, format_intervals, parse_intervals};
use cantus_core::rules::{self, RuleConfig, evaluate};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_intervals() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-7i32..=7, 0..16)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Pitches start at zero and have one more entry than there are intervals.
    #[test]
    fn pitches_start_at_zero(intervals in arb_intervals()) {
        let melody = Melody::new(intervals.clone());
        prop_assert_eq!(melody.pitches()[0], 0);
        prop_assert_eq!(melody.pitches().len(), intervals.len() + 1);
        prop_assert_eq!(*melody.pitches().last().unwrap(), intervals.iter().sum::<i32>());
    }

    /// Turning points always include both endpoints.
    #[test]
    fn extremes_include_endpoints(intervals in arb_intervals()) {
        let melody = Melody::new(intervals);
        let pitches = melody.pitches();
        let extremes = melody.extremes();
        prop_assert_eq!(extremes[0], pitches[0]);
        prop_assert_eq!(extremes[extremes.len() - 1], pitches[pitches.len() - 1]);
        prop_assert!(extremes.len() <= pitches.len());
    }

    /// Degrees are pitch classes in 0..7 and the range spans every pitch.
    #[test]
    fn degrees_and_range_are_consistent(intervals in arb_intervals()) {
        let melody = Melody::new(intervals);
        for (&pitch, &degree) in melody.pitches().iter().zip(melody.degrees()) {
            prop_assert!((0..7).contains(&degree));
            prop_assert_eq!((pitch - degree).rem_euclid(7), 0);
        }
        let max = melody.pitches().iter().max().unwrap();
        let min = melody.pitches().iter().min().unwrap();
        prop_assert_eq!(melody.range(), max - min);
    }

    /// Building the model twice gives identical views and verdicts.
    #[test]
    fn derivation_is_idempotent(intervals in arb_intervals()) {
        let a = Melody::new(intervals.clone());
        let b = Melody::new(intervals);
        prop_assert_eq!(&a, &b);
        let config = RuleConfig::default();
        prop_assert_eq!(evaluate(&a, &config), evaluate(&b, &config));
        prop_assert_eq!(rules::is_valid(&a, &config), evaluate(&a, &config).is_valid());
    }

    /// The comma-delimited encoding reads back to the same sequence.
    #[test]
    fn text_encoding_reads_back(intervals in arb_intervals()) {
        let text = format_intervals(&intervals);
        prop_assert_eq!(parse_intervals(&text).unwrap(), intervals);
    }
}
