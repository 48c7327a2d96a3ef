use thiserror::Error;

/// Closed error taxonomy for the dependency tracker.
#[derive(Error, Debug)]
pub enum DepMapError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error at {path}: {source}")]
    IoAt {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("key exhaustion under '{parent_key}' at '{path}': {suggestion}")]
    KeyExhaustion {
        parent_key: String,
        path: String,
        suggestion: String,
    },

    #[error("key invariant violation: {0}")]
    KeyInvariantViolation(String),

    #[error("grid invariant violation: {0}")]
    GridInvariantViolation(String),

    #[error("tracker parse error in '{path}': {reason}")]
    TrackerParse { path: String, reason: String },

    #[error("analysis failed for '{path}': {reason}")]
    AnalysisFailure { path: String, reason: String },

    #[error("embedding failed for '{path}': {reason}")]
    EmbeddingFailure { path: String, reason: String },

    #[error("key '{key}' resolves to multiple paths without context: {candidates:?}")]
    AmbiguousLookup {
        key: String,
        candidates: Vec<String>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DepMapError>;
