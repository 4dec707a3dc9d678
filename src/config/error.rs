//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required file such as `default.toml` is missing
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// The merged sources do not deserialize into [`Settings`](super::Settings)
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A value deserialized but is out of range or inconsistent
    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    #[error(
        "Invalid environment '{0}'. Valid values are: development, test, staging, production"
    )]
    InvalidEnvironment(String),

    /// `MARKET_CONFIG_DIR` and `MARKET_CONFIG_FILE` were both set
    #[error("Mutual exclusivity error: {0}")]
    MutualExclusivityError(String),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        ConfigError::FileNotFound(path.into())
    }

    pub fn mutual_exclusivity(message: impl Into<String>) -> Self {
        ConfigError::MutualExclusivityError(message.into())
    }

    /// The dotted settings path a validation error points at.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::ValidationError { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_field() {
        let err = ConfigError::validation("cache.default_ttl_seconds", "must be positive");
        assert_eq!(err.field(), Some("cache.default_ttl_seconds"));
        assert_eq!(
            err.to_string(),
            "Validation error: cache.default_ttl_seconds - must be positive"
        );
        assert_eq!(ConfigError::file_not_found("default.toml").field(), None);
    }
}
