//! Configuration merger for CLI arguments and config files
//!
//! Applies global CLI flags on top of file and environment configuration.

use super::parser::Cli;
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, settings::Settings};

/// Holds the file-based configuration that CLI flags are applied to.
///
/// CLI arguments take precedence over every file and environment source.
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    /// Create a new configuration merger with base configuration
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration the CLI points at
    ///
    /// `--config` switches the loader to single-file mode and `--env` replaces
    /// the environment read from `MARKET_APP_ENV`.
    ///
    /// # Errors
    /// Returns ConfigError if configuration loading or validation fails
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;

        if let Some(ref path) = cli.config {
            loader = loader.with_config_file(path);
        }
        if let Some(env) = cli.env {
            loader = loader.with_environment(env.into());
        }

        tracing::debug!(environment = %loader.environment(), "Loading configuration");
        Ok(Self::new(loader.load()?))
    }

    /// The configuration before CLI overrides
    pub fn base_config(&self) -> &Settings {
        &self.base_config
    }

    /// Merge CLI arguments with the base configuration
    ///
    /// Returns a new, validated Settings instance with CLI overrides applied.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["market-cache"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_merge_without_flags_keeps_base() {
        let merger = ConfigurationMerger::new(Settings::default());
        let merged = merger.merge_cli_args(&cli(&["check"])).unwrap();
        assert_eq!(merged.logger.level, merger.base_config().logger.level);
        assert_eq!(merged.cache.default_ttl_seconds, 300);
    }

    #[test]
    fn test_merge_verbose_flag() {
        let merger = ConfigurationMerger::new(Settings::default());
        let merged = merger.merge_cli_args(&cli(&["--verbose", "stats"])).unwrap();
        assert_eq!(merged.logger.level, "debug");
    }

    #[test]
    fn test_merge_quiet_flag() {
        let merger = ConfigurationMerger::new(Settings::default());
        let merged = merger.merge_cli_args(&cli(&["-q", "stats"])).unwrap();
        assert_eq!(merged.logger.level, "error");
    }

    #[test]
    fn test_merge_validates_result() {
        let mut base = Settings::default();
        base.cache.default_ttl_seconds = 0;

        let merger = ConfigurationMerger::new(base);
        let err = merger.merge_cli_args(&cli(&["check"])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
