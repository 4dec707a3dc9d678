use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;

/// Application-wide error type that represents all possible errors in the system.
///
/// Cache backend failures never show up here: the cache manager absorbs them.
/// `Cache` only carries caller mistakes such as a zero TTL or an
/// unserializable value.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Cache usage error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Origin data source error with operation context
    #[error("Data source operation failed: {operation}")]
    Source {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn not_found(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        AppError::NotFound {
            entity: entity.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = AppError::not_found("product", "id", "p-1");
        assert_eq!(err.to_string(), "Resource not found: product with id=p-1");
    }

    #[test]
    fn test_cache_error_conversion() {
        let err: AppError = CacheError::InvalidTtl(0).into();
        assert!(matches!(err, AppError::Cache(CacheError::InvalidTtl(0))));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: AppError = ConfigError::validation("cache.default_ttl_seconds", "zero").into();
        assert!(err.to_string().contains("cache.default_ttl_seconds"));
    }
}
