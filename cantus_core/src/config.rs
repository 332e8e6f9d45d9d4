// Search configuration.
//
// Every tunable parameter of a search run lives in `SearchConfig`: melody
// length, the unit-step threshold, the interval alphabet, parallelism, and
// the rule thresholds (`RuleConfig`). Each run owns its config; nothing is
// read from process-wide state. Configs load from JSON, and any field left
// out of the JSON takes its default, so a file can override just the
// parameters it cares about.
//
// See also: `search.rs` which consumes the config, `rules.rs` for
// `RuleConfig`, and the `cantus` binary which layers command-line flags on
// top of a loaded config.

use crate::error::ConfigError;
use crate::melody::MAX_INTERVAL;
use crate::rules::RuleConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Interval alphabet of the reference search: no unisons, no sixths.
pub const DEFAULT_ALPHABET: [i32; 11] = [-7, -4, -3, -2, -1, 1, 2, 3, 4, 5, 7];

pub const DEFAULT_LENGTH: usize = 8;

pub const DEFAULT_MIN_STEPS: usize = 4;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of notes in each melody (one more than the number of intervals).
    pub length: usize,
    /// Minimum count of seconds (intervals of magnitude 1) per melody.
    pub min_steps: usize,
    /// Generic intervals the search may use.
    pub alphabet: Vec<i32>,
    /// Fan the permute and validate stages out across a worker pool.
    pub parallel: bool,
    /// Worker threads for a parallel run. 0 means one per available core.
    pub workers: usize,
    pub rules: RuleConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            length: DEFAULT_LENGTH,
            min_steps: DEFAULT_MIN_STEPS,
            alphabet: DEFAULT_ALPHABET.to_vec(),
            parallel: true,
            workers: 0,
            rules: RuleConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of intervals per melody.
    pub fn interval_count(&self) -> usize {
        self.length.saturating_sub(1)
    }

    /// Reject parameters the pipeline cannot meaningfully run with.
    ///
    /// A zero step threshold is accepted: it only widens the candidate set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.length < 2 {
            return Err(ConfigError::LengthTooShort(self.length));
        }
        if self.alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        if let Some(&bad) = self
            .alphabet
            .iter()
            .find(|iv| **iv == 0 || iv.abs() > MAX_INTERVAL)
        {
            return Err(ConfigError::IntervalOutOfRange(bad));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ForbiddenLeapVariant;

    #[test]
    fn test_default_is_reference_search() {
        let config = SearchConfig::default();
        assert_eq!(config.length, 8);
        assert_eq!(config.min_steps, 4);
        assert_eq!(config.interval_count(), 7);
        assert_eq!(config.alphabet, vec![-7, -4, -3, -2, -1, 1, 2, 3, 4, 5, 7]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SearchConfig::from_json_str(
            r#"{
                "length": 10,
                "rules": { "forbidden_leaps": "adjacent_only" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.length, 10);
        assert_eq!(config.min_steps, 4);
        assert!(config.parallel);
        assert_eq!(config.rules.forbidden_leaps, ForbiddenLeapVariant::AdjacentOnly);
        assert_eq!(config.rules.max_range, 9);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SearchConfig {
            length: 9,
            alphabet: vec![-2, -1, 1, 2],
            parallel: false,
            ..SearchConfig::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(SearchConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_malformed_json() {
        let err = SearchConfig::from_json_str("{ length: 8 }").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let short = SearchConfig { length: 1, ..SearchConfig::default() };
        assert!(matches!(short.validate(), Err(ConfigError::LengthTooShort(1))));

        let empty = SearchConfig { alphabet: vec![], ..SearchConfig::default() };
        assert!(matches!(empty.validate(), Err(ConfigError::EmptyAlphabet)));

        let unison = SearchConfig { alphabet: vec![-1, 0, 1], ..SearchConfig::default() };
        assert!(matches!(unison.validate(), Err(ConfigError::IntervalOutOfRange(0))));

        let wide = SearchConfig { alphabet: vec![-1, 1, 8], ..SearchConfig::default() };
        assert!(matches!(wide.validate(), Err(ConfigError::IntervalOutOfRange(8))));

        let no_threshold = SearchConfig { min_steps: 0, ..SearchConfig::default() };
        assert!(no_threshold.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SearchConfig::load(Path::new("/nonexistent/cantus.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        std::fs::write(&path, r#"{"min_steps": 5, "workers": 2}"#).unwrap();
        let config = SearchConfig::load(&path).unwrap();
        assert_eq!(config.min_steps, 5);
        assert_eq!(config.workers, 2);
    }
}
