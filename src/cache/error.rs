//! Cache error types.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache operation failed: {0}")]
    Operation(String),

    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid TTL: {0} seconds (must be between 1 and {max} seconds)", max = crate::cache::MAX_TTL_SECONDS)]
    InvalidTtl(u64),

    #[error("Invalid key pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Cache operation '{operation}' timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },
}

impl CacheError {
    /// Whether the error is a caller mistake rather than a backend failure.
    ///
    /// Caller mistakes are raised to the caller; backend failures are
    /// absorbed by the manager and degrade to a cache miss.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CacheError::Serialization(_)
                | CacheError::InvalidTtl(_)
                | CacheError::InvalidPattern { .. }
        )
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        CacheError::Serialization(error.to_string())
    }
}
