// Error types for the core crate.
//
// `ConfigError` covers everything wrong with the caller's input: a config
// file that cannot be read or parsed, or parameters the pipeline refuses to
// run with. `SearchError` is what `Search::run` returns; it wraps a
// `ConfigError` for invalid parameters and adds the runtime failures
// (cancellation, a panicking worker, a pool that failed to start).

use crate::melody::MAX_INTERVAL;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("melody length must be at least 2 notes, got {0}")]
    LengthTooShort(usize),

    #[error("interval alphabet is empty")]
    EmptyAlphabet,

    #[error("interval {0} is not allowed in the alphabet (expected a non-zero interval of magnitude at most {max})", max = MAX_INTERVAL)]
    IntervalOutOfRange(i32),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search parameters: {0}")]
    InvalidParameters(#[from] ConfigError),

    #[error("search cancelled")]
    Cancelled,

    #[error("search worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
