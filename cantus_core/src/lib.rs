// Cantus Firmus Core
//
// Exhaustive generation of cantus firmus melodies under the rules of strict
// counterpoint. Melodies are sequences of generic intervals in Taneyev
// notation (0 = unison, ±1 = second, ±3 = fourth), so the search is
// independent of key and mode; turning an accepted sequence into notes is
// left to the `cantus_music` crate.
//
// Architecture:
// - melody.rs: Interval sequence plus its derived views (pitches, degrees,
//   turning points, range), computed once at construction
// - rules.rs: The rule battery as independent predicates, with thresholds
//   in `RuleConfig`
// - enumerate.rs: Zero-sum multiset enumeration and stepwise-closing
//   permutation generators
// - search.rs: The enumerate / permute / validate pipeline on a rayon pool
// - config.rs: `SearchConfig`, loaded from JSON
// - error.rs: `ConfigError` and `SearchError`
//
// Results are deterministic as a set for a given config, whether the run is
// sequential or parallel.

pub mod config;
pub mod enumerate;
pub mod error;
pub mod melody;
pub mod rules;
pub mod search;

pub use config::SearchConfig;
pub use error::{ConfigError, SearchError};
pub use melody::Melody;
pub use rules::{Rule, RuleConfig};
pub use search::{Search, SearchOutcome, SearchStats, search};
