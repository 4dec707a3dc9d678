//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::cache::MAX_TTL_SECONDS;
use crate::config::error::ConfigError;
use crate::config::settings::{
    CacheBackend, CacheConfig, FileSettings, LoggerSettings, MemoryCacheConfig,
    RedisCacheConfig, SeasonMultipliers, SeasonTtls, SeasonalConfig, Settings,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// Accepted Redis URL schemes
const VALID_REDIS_SCHEMES: &[&str] = &["redis://", "rediss://", "unix://", "redis+unix://"];

impl FileSettings {
    /// Validate file settings
    fn validate(&self) -> Result<(), ConfigError> {
        // If file logging is enabled, path must not be empty
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.file.format",
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    /// - At least one output must be enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        self.file.validate()?;

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        Ok(())
    }
}

impl MemoryCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::validation(
                "cache.memory.max_size",
                "Max size must be greater than 0 entries.",
            ));
        }

        if self.sweep_interval_seconds == 0 {
            return Err(ConfigError::validation(
                "cache.memory.sweep_interval_seconds",
                "Sweep interval must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl RedisCacheConfig {
    /// Validate Redis settings
    ///
    /// The URL is optional here; whether it is required depends on the
    /// selected backend.
    fn validate(&self) -> Result<(), ConfigError> {
        let bad_scheme = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .is_some_and(|url| !VALID_REDIS_SCHEMES.iter().any(|scheme| url.starts_with(scheme)));
        if bad_scheme {
            return Err(ConfigError::validation(
                "cache.redis.url",
                format!(
                    "Invalid Redis URL. Expected one of the schemes: {}",
                    VALID_REDIS_SCHEMES.join(", ")
                ),
            ));
        }

        if self.pool_size == 0 {
            return Err(ConfigError::validation(
                "cache.redis.pool_size",
                "Pool size must be greater than 0.",
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "cache.redis.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "cache.redis.operation_timeout_ms",
                "Operation timeout must be greater than 0 milliseconds.",
            ));
        }

        if self.key_prefix.trim().is_empty() {
            return Err(ConfigError::validation(
                "cache.redis.key_prefix",
                "Key prefix cannot be empty.",
            ));
        }

        if self.key_prefix.chars().any(char::is_whitespace)
            || self.key_prefix.contains(['*', '?', '[', ']'])
        {
            return Err(ConfigError::validation(
                "cache.redis.key_prefix",
                format!(
                    "Key prefix '{}' must not contain whitespace or glob characters.",
                    self.key_prefix
                ),
            ));
        }

        if self.key_prefix.ends_with(':') {
            return Err(ConfigError::validation(
                "cache.redis.key_prefix",
                "Key prefix must not end with ':'; the separator is added automatically.",
            ));
        }

        if self.scan_count == 0 {
            return Err(ConfigError::validation(
                "cache.redis.scan_count",
                "Scan count must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl SeasonTtls {
    fn validate(&self) -> Result<(), ConfigError> {
        for (season, ttl) in [
            ("spring", self.spring),
            ("summer", self.summer),
            ("fall", self.fall),
            ("winter", self.winter),
        ] {
            if ttl == 0 || ttl > MAX_TTL_SECONDS {
                return Err(ConfigError::validation(
                    format!("cache.seasonal.fixed.{}", season),
                    format!(
                        "Seasonal TTL must be between 1 and {} seconds, got {}.",
                        MAX_TTL_SECONDS, ttl
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl SeasonMultipliers {
    /// Each factor must be positive and keep `base_ttl * factor` within
    /// [`MAX_TTL_SECONDS`].
    fn validate(&self, base_ttl: u64) -> Result<(), ConfigError> {
        for (season, factor) in [
            ("spring", self.spring),
            ("summer", self.summer),
            ("fall", self.fall),
            ("winter", self.winter),
        ] {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(ConfigError::validation(
                    format!("cache.seasonal.multipliers.{}", season),
                    format!("Multiplier must be a finite number greater than 0, got {}.", factor),
                ));
            }
            if (base_ttl as f64 * factor).round() > MAX_TTL_SECONDS as f64 {
                return Err(ConfigError::validation(
                    format!("cache.seasonal.multipliers.{}", season),
                    format!(
                        "Multiplier {} scales the default TTL past {} seconds.",
                        factor, MAX_TTL_SECONDS
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl SeasonalConfig {
    fn validate(&self, base_ttl: u64) -> Result<(), ConfigError> {
        self.fixed.validate()?;
        self.multipliers.validate(base_ttl)?;
        Ok(())
    }
}

impl CacheConfig {
    /// Validate cache configuration
    ///
    /// # Validation Rules
    /// - Default TTL, memory size and sweep interval must be greater than 0
    /// - Default TTL and every seasonal TTL must not exceed `MAX_TTL_SECONDS`
    /// - Redis URL, when present, must use a Redis scheme
    /// - `backend = "redis"` requires a Redis URL
    /// - Seasonal TTLs and multipliers must be positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_seconds == 0 {
            return Err(ConfigError::validation(
                "cache.default_ttl_seconds",
                "Default TTL must be greater than 0 seconds.",
            ));
        }

        if self.default_ttl_seconds > MAX_TTL_SECONDS {
            return Err(ConfigError::validation(
                "cache.default_ttl_seconds",
                format!(
                    "Default TTL must not exceed {} seconds, got {}.",
                    MAX_TTL_SECONDS, self.default_ttl_seconds
                ),
            ));
        }

        self.memory.validate()?;
        self.redis.validate()?;
        self.seasonal.validate(self.default_ttl_seconds)?;

        if self.enabled && self.backend == CacheBackend::Redis && !self.redis.is_configured() {
            return Err(ConfigError::validation(
                "cache.redis.url",
                "Redis URL is required when cache backend is 'redis'. Set cache.redis.url or REDIS_URL.",
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// This method validates all sub-configurations and returns the first
    /// validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}
