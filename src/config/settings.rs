//! Configuration settings structures for market-cache
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "market-cache".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/market-cache.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_max_size() -> usize {
    1000
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_redis_pool_size() -> u32 {
    4
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_redis_operation_timeout_ms() -> u64 {
    250
}

fn default_redis_key_prefix() -> String {
    "market".to_string()
}

fn default_redis_scan_count() -> usize {
    200
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name, also used as the cache name in remote keys
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = self.file.into_file_config()?;

        LoggerConfig::new(console, file, self.level)
            .map_err(|e| ConfigError::validation("logger", e.to_string()))
    }
}

impl FileSettings {
    /// Convert FileSettings to FileConfig
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format)
            .map_err(|e| ConfigError::validation("logger.file", e.to_string()))
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Redis when a URL is configured and reachable, memory otherwise
    #[default]
    Auto,
    Memory,
    Redis,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Auto => "auto",
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
        }
    }
}

/// Memory cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries in the cache
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,

    /// Seconds between background sweeps of expired entries
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

/// Redis cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL. `REDIS_URL` overrides this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,

    /// Upper bound for a single remote cache call, in milliseconds
    #[serde(default = "default_redis_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Key prefix for all cache entries
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,

    /// `COUNT` hint for `SCAN` during pattern invalidation
    #[serde(default = "default_redis_scan_count")]
    pub scan_count: usize,
}

impl RedisCacheConfig {
    /// Whether a non-blank URL is present
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
            operation_timeout_ms: default_redis_operation_timeout_ms(),
            key_prefix: default_redis_key_prefix(),
            scan_count: default_redis_scan_count(),
        }
    }
}

/// How seasonal TTLs are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalPolicyKind {
    /// One fixed TTL per season, ignoring the base TTL
    #[default]
    Fixed,
    /// Base TTL scaled by a per-season factor
    Multiplier,
}

/// Fixed TTL in seconds for each season
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonTtls {
    pub spring: u64,
    pub summer: u64,
    pub fall: u64,
    pub winter: u64,
}

impl Default for SeasonTtls {
    fn default() -> Self {
        Self {
            spring: 1800,
            summer: 900,
            fall: 1800,
            winter: 7200,
        }
    }
}

/// TTL multiplier for each season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonMultipliers {
    pub spring: f64,
    pub summer: f64,
    pub fall: f64,
    pub winter: f64,
}

impl Default for SeasonMultipliers {
    fn default() -> Self {
        Self {
            spring: 0.75,
            summer: 0.5,
            fall: 1.0,
            winter: 2.0,
        }
    }
}

/// Seasonal TTL policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SeasonalConfig {
    /// Which policy `set_seasonal` and seasonal options use
    #[serde(default)]
    pub policy: SeasonalPolicyKind,

    /// Table used by the fixed policy
    #[serde(default)]
    pub fixed: SeasonTtls,

    /// Factors used by the multiplier policy
    #[serde(default)]
    pub multipliers: SeasonMultipliers,
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache backend type
    #[serde(default)]
    pub backend: CacheBackend,

    /// TTL applied when a write does not specify one
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_seconds: u64,

    /// Memory cache settings
    #[serde(default)]
    pub memory: MemoryCacheConfig,

    /// Redis cache settings
    #[serde(default)]
    pub redis: RedisCacheConfig,

    /// Seasonal TTL settings
    #[serde(default)]
    pub seasonal: SeasonalConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            backend: CacheBackend::default(),
            default_ttl_seconds: default_cache_ttl(),
            memory: MemoryCacheConfig::default(),
            redis: RedisCacheConfig::default(),
            seasonal: SeasonalConfig::default(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}
