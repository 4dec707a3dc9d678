//! Configuration loader for market-cache
//!
//! This module provides the `ConfigLoader` struct that handles loading
//! configuration from multiple sources with proper precedence.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "MARKET_CONFIG_DIR";

/// Environment variable for specific configuration file
const CONFIG_FILE_ENV: &str = "MARKET_CONFIG_FILE";

/// Conventional Redis URL variable, mapped onto `cache.redis.url`
const REDIS_URL_ENV: &str = "REDIS_URL";

/// Default configuration directory
const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "MARKET";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles layered configuration loading
///
/// The loader supports the following configuration sources (in order of priority):
/// 1. `default.toml` - Base default configuration (required)
/// 2. `{environment}.toml` - Environment-specific configuration (optional)
/// 3. `local.toml` - Local development overrides (optional)
/// 4. `MARKET_*` environment variables
/// 5. `REDIS_URL` (highest priority, only for `cache.redis.url`)
#[derive(Debug)]
pub struct ConfigLoader {
    /// Configuration directory path
    config_dir: PathBuf,
    /// Specific configuration file path (if set, skips layered loading)
    config_file: Option<PathBuf>,
    /// Current application environment
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a new configuration loader
    ///
    /// This reads environment variables to determine:
    /// - Configuration directory (`MARKET_CONFIG_DIR`)
    /// - Specific configuration file (`MARKET_CONFIG_FILE`)
    /// - Application environment (`MARKET_APP_ENV`)
    ///
    /// # Errors
    ///
    /// Returns an error if both `MARKET_CONFIG_DIR` and `MARKET_CONFIG_FILE` are set,
    /// as they are mutually exclusive.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));

        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_file.is_some() && std::env::var(CONFIG_DIR_ENV).is_ok() {
            return Err(ConfigError::mutual_exclusivity(
                "MARKET_CONFIG_DIR and MARKET_CONFIG_FILE cannot both be set. \
                 Use MARKET_CONFIG_DIR for layered configuration or \
                 MARKET_CONFIG_FILE for a single configuration file.",
            ));
        }

        let environment = AppEnvironment::from_env();

        Ok(Self {
            config_dir,
            config_file,
            environment,
        })
    }

    /// Load a single file instead of the layered directory
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Override the environment read from `MARKET_APP_ENV`
    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Get the current application environment
    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    /// Get the configuration directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Load configuration from all sources
    ///
    /// If a single configuration file is set, loads only that file.
    /// Otherwise, performs layered loading from the configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `default.toml` is not found (when using layered loading)
    /// - Configuration parsing fails
    /// - Configuration validation fails
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Build the config::Config instance from all sources
    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = if let Some(ref config_file) = self.config_file {
            self.add_file_source(builder, config_file, true)?
        } else {
            self.build_layered_config(builder)?
        };

        // MARKET_CACHE__REDIS__URL -> cache.redis.url
        let builder = Self::add_env_source(builder);
        let builder = Self::add_redis_url_override(builder)?;

        builder.build().map_err(ConfigError::from)
    }

    /// Build layered configuration from multiple files
    fn build_layered_config(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let default_path = self.config_dir.join("default.toml");
        let builder = self.add_file_source(builder, &default_path, true)?;

        let env_path = self
            .config_dir
            .join(self.environment.overlay_file());
        let builder = self.add_file_source(builder, &env_path, false)?;

        let local_path = self.config_dir.join("local.toml");
        let builder = self.add_file_source(builder, &local_path, false)?;

        Ok(builder)
    }

    /// Add a file source to the config builder
    fn add_file_source(
        &self,
        builder: ConfigBuilder<DefaultState>,
        path: &Path,
        required: bool,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        if required && !path.exists() {
            return Err(ConfigError::file_not_found(format!(
                "Required configuration file not found: {}",
                path.display()
            )));
        }

        Ok(builder.add_source(
            File::new(path.to_str().unwrap_or_default(), FileFormat::Toml).required(required),
        ))
    }

    /// Add environment variable source to the config builder
    ///
    /// Environment variables with prefix `MARKET_` are mapped to configuration keys.
    /// Double underscores (`__`) are used as separators for nested keys.
    ///
    /// Examples:
    /// - `MARKET_CACHE__BACKEND` -> `cache.backend`
    /// - `MARKET_CACHE__MEMORY__MAX_SIZE` -> `cache.memory.max_size`
    fn add_env_source(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
        builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        )
    }

    /// Map a non-empty `REDIS_URL` onto `cache.redis.url`
    fn add_redis_url_override(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let redis_url = std::env::var(REDIS_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty());

        builder
            .set_override_option("cache.redis.url", redis_url)
            .map_err(ConfigError::from)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{CacheBackend, SeasonalPolicyKind};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Global mutex to ensure tests run sequentially to avoid env var conflicts
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    const DEFAULT_CONFIG: &str = r#"
[application]
name = "test-app"
version = "1.0.0"

[logger]
level = "info"

[logger.console]
enabled = true
colored = true

[logger.file]
enabled = false

[cache]
enabled = true
backend = "auto"
default_ttl_seconds = 300

[cache.memory]
max_size = 1000
sweep_interval_seconds = 60

[cache.redis]
pool_size = 4
key_prefix = "market"
"#;

    /// Helper to create a temporary config directory with files
    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            fs::write(&path, content).expect("Failed to write config file");
        }
        temp_dir
    }

    /// Helper to safely set environment variables for a test
    struct EnvGuard {
        vars_to_restore: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self {
                vars_to_restore: Vec::new(),
            }
        }

        fn set(&mut self, key: &str, value: &str) {
            let original = std::env::var(key).ok();
            self.vars_to_restore.push((key.to_string(), original));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        fn remove(&mut self, key: &str) {
            let original = std::env::var(key).ok();
            self.vars_to_restore.push((key.to_string(), original));
            unsafe {
                std::env::remove_var(key);
            }
        }

        /// Clear every variable the loader reads
        fn isolate(&mut self) {
            for key in [
                CONFIG_DIR_ENV,
                CONFIG_FILE_ENV,
                AppEnvironment::ENV_VAR,
                REDIS_URL_ENV,
                "MARKET_CACHE__BACKEND",
                "MARKET_CACHE__DEFAULT_TTL_SECONDS",
                "MARKET_CACHE__REDIS__URL",
            ] {
                self.remove(key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // Restore in reverse so a key touched twice ends at its original value
            for (key, original_value) in self.vars_to_restore.iter().rev() {
                unsafe {
                    match original_value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    fn load_from(dir: &TempDir, env: &mut EnvGuard) -> Result<Settings, ConfigError> {
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());
        ConfigLoader::new().expect("Should create loader").load()
    }

    #[test]
    fn test_config_loader_new_default() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let loader = ConfigLoader::new().expect("Should create loader");
        assert_eq!(loader.config_dir, PathBuf::from("config"));
        assert!(loader.config_file.is_none());
        assert_eq!(loader.environment, AppEnvironment::Development);
    }

    #[test]
    fn test_config_loader_mutual_exclusivity_error() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        env.set(CONFIG_DIR_ENV, "/custom/config");
        env.set(CONFIG_FILE_ENV, "/path/to/config.toml");

        let result = ConfigLoader::new();
        if let Err(ConfigError::MutualExclusivityError(msg)) = result {
            assert!(msg.contains("MARKET_CONFIG_DIR"));
            assert!(msg.contains("MARKET_CONFIG_FILE"));
        } else {
            panic!("Expected MutualExclusivityError");
        }
    }

    #[test]
    fn test_config_loader_environment_from_env() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();
        env.set(AppEnvironment::ENV_VAR, "production");

        let loader = ConfigLoader::new().expect("Should create loader");
        assert_eq!(loader.environment(), AppEnvironment::Production);

        let loader = loader.with_environment(AppEnvironment::Test);
        assert_eq!(loader.environment(), AppEnvironment::Test);
    }

    #[test]
    fn test_load_missing_default_toml() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let temp_dir = setup_config_dir(&[]);
        let result = load_from(&temp_dir, &mut env);

        if let Err(ConfigError::FileNotFound(msg)) = result {
            assert!(msg.contains("default.toml"));
        } else {
            panic!("Expected FileNotFound error");
        }
    }

    #[test]
    fn test_load_default_toml_only() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let temp_dir = setup_config_dir(&[("default.toml", DEFAULT_CONFIG)]);
        let settings = load_from(&temp_dir, &mut env).expect("Should load settings");

        assert_eq!(settings.application.name, "test-app");
        assert_eq!(settings.cache.backend, CacheBackend::Auto);
        assert_eq!(settings.cache.redis.url, None);
        assert_eq!(settings.cache.redis.operation_timeout_ms, 250);
        assert_eq!(settings.cache.seasonal.policy, SeasonalPolicyKind::Fixed);
    }

    #[test]
    fn test_load_full_precedence_chain() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let production_config = r#"
[application]
name = "prod-app"

[cache]
default_ttl_seconds = 900

[cache.memory]
max_size = 5000
"#;

        let local_config = r#"
[cache.memory]
max_size = 50
"#;

        let temp_dir = setup_config_dir(&[
            ("default.toml", DEFAULT_CONFIG),
            ("production.toml", production_config),
            ("local.toml", local_config),
        ]);
        env.set(AppEnvironment::ENV_VAR, "production");
        env.set("MARKET_CACHE__DEFAULT_TTL_SECONDS", "120");

        let settings = load_from(&temp_dir, &mut env).expect("Should load settings");

        // Environment variable beats every file
        assert_eq!(settings.cache.default_ttl_seconds, 120);
        // local.toml beats production.toml
        assert_eq!(settings.cache.memory.max_size, 50);
        // production.toml beats default.toml
        assert_eq!(settings.application.name, "prod-app");
        // default.toml provides the rest
        assert_eq!(settings.application.version, "1.0.0");
        assert_eq!(settings.cache.memory.sweep_interval_seconds, 60);
    }

    #[test]
    fn test_redis_url_env_selects_redis_url() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let temp_dir = setup_config_dir(&[("default.toml", DEFAULT_CONFIG)]);
        env.set(REDIS_URL_ENV, "redis://cache.internal:6379");

        let settings = load_from(&temp_dir, &mut env).expect("Should load settings");
        assert_eq!(
            settings.cache.redis.url.as_deref(),
            Some("redis://cache.internal:6379")
        );
        assert!(settings.cache.redis.is_configured());
    }

    #[test]
    fn test_redis_url_env_beats_prefixed_variable() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let temp_dir = setup_config_dir(&[("default.toml", DEFAULT_CONFIG)]);
        env.set("MARKET_CACHE__REDIS__URL", "redis://from-prefixed:6379");
        env.set(REDIS_URL_ENV, "redis://from-redis-url:6379");

        let settings = load_from(&temp_dir, &mut env).expect("Should load settings");
        assert_eq!(
            settings.cache.redis.url.as_deref(),
            Some("redis://from-redis-url:6379")
        );
    }

    #[test]
    fn test_empty_redis_url_is_ignored() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let temp_dir = setup_config_dir(&[("default.toml", DEFAULT_CONFIG)]);
        env.set(REDIS_URL_ENV, "  ");

        let settings = load_from(&temp_dir, &mut env).expect("Should load settings");
        assert_eq!(settings.cache.redis.url, None);
    }

    #[test]
    fn test_load_rejects_invalid_cache_config() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let temp_dir = setup_config_dir(&[("default.toml", DEFAULT_CONFIG)]);
        env.set("MARKET_CACHE__BACKEND", "redis");

        let result = load_from(&temp_dir, &mut env);
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "cache.redis.url"
        ));
    }

    #[test]
    fn test_load_single_file_mode() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let single_config = r#"
[application]
name = "single-file-app"

[cache]
backend = "memory"

[cache.seasonal]
policy = "multiplier"
"#;

        let temp_dir = setup_config_dir(&[("single.toml", single_config)]);
        let config_file_path = temp_dir.path().join("single.toml");

        let settings = ConfigLoader::new()
            .expect("Should create loader")
            .with_config_file(config_file_path)
            .load()
            .expect("Should load settings");

        assert_eq!(settings.application.name, "single-file-app");
        assert_eq!(settings.cache.backend, CacheBackend::Memory);
        assert_eq!(settings.cache.seasonal.policy, SeasonalPolicyKind::Multiplier);
    }

    #[test]
    fn test_repository_default_toml_is_valid() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.isolate();

        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let settings = ConfigLoader::new()
            .expect("Should create loader")
            .with_config_file(path)
            .load()
            .expect("Shipped default.toml should load");

        assert_eq!(settings.application.name, "market-cache");
        assert_eq!(settings.cache.default_ttl_seconds, 300);
    }
}
