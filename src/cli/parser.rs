//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use jiff::civil::Date;
use std::path::PathBuf;

use super::validation::{
    validate_cache_key, validate_config_file_path, validate_date, validate_json_value,
    validate_pattern, validate_season, validate_ttl,
};
use crate::build;
use crate::cache::Season;

/// Operate the farmers market cache layer
#[derive(Parser, Debug)]
#[command(name = "market-cache")]
#[command(about = "Inspect and manage the farmers market cache")]
#[command(long_about = "
market-cache operates the seasonal key-value cache that sits in front of the
farmers market catalog. It loads the same configuration as the application,
connects to the configured backend and runs one command against it.

The in-memory backend lives only as long as this process, so get/set across
separate invocations are only meaningful with the redis backend.

EXAMPLES:
    # Validate configuration and show the selected backend
    market-cache check

    # Read and write entries
    market-cache set product:42 '{\"name\":\"Heirloom Tomatoes\"}' --ttl 600 --tag product:42
    market-cache get product:42

    # Store with the TTL the seasonal policy assigns to winter
    market-cache set seasonal-products:winter '[]' --season winter

    # Drop every product list page or everything tagged with a farm
    market-cache invalidate --pattern 'products:list:*'
    market-cache invalidate --tag farm:7

    # Show which season a date falls in and its TTL
    market-cache season --date 2026-12-01

    # Use a production config file with verbose logging
    market-cache --config /etc/market/production.toml --verbose stats
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    ///
    /// Load a single TOML file instead of the layered config directory.
    /// Environment variable overrides still apply on top of it.
    /// The file must exist and be readable.
    ///
    /// Example: --config /etc/market/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Force a specific environment, which selects the
    /// `config/{environment}.toml` overlay.
    ///
    /// Available values: development (dev), staging (stage), production (prod), test
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Raises the log level to debug, which includes every cache hit and miss.
    /// Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Lowers the log level to error, hiding fail-open warnings.
    /// Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and print the selected backend
    ///
    /// Loads and validates the configuration, connects the cache and reports
    /// which backend is actually serving requests. With `backend = "auto"`
    /// this shows whether the redis connection succeeded.
    Check,

    /// Print a cached value as JSON
    ///
    /// Exits with an error if the key is missing or expired.
    ///
    /// Example:
    ///   market-cache get product:42
    Get {
        /// Cache key to read
        #[arg(value_name = "KEY", value_parser = validate_cache_key)]
        key: String,
    },

    /// Store a JSON value
    ///
    /// Examples:
    ///   market-cache set farm:7 '{"name":"Hillside"}'
    ///   market-cache set product:42 '{"price":350}' --ttl 60 --tag farm:7
    ///   market-cache set seasonal-products:summer '[]' --season summer
    Set {
        /// Cache key to write
        #[arg(value_name = "KEY", value_parser = validate_cache_key)]
        key: String,

        /// Value to store, as a JSON document
        #[arg(value_name = "JSON", value_parser = validate_json_value)]
        value: serde_json::Value,

        /// Time to live in seconds
        ///
        /// Defaults to `cache.default_ttl_seconds`. Cannot be used with --season.
        #[arg(long, value_name = "SECONDS", value_parser = validate_ttl, conflicts_with = "season")]
        ttl: Option<u64>,

        /// Tag the entry for group invalidation (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Use the TTL the seasonal policy assigns to this season
        ///
        /// Available values: spring, summer, fall (autumn), winter
        #[arg(long, value_name = "SEASON", value_parser = validate_season)]
        season: Option<Season>,
    },

    /// Remove a single key
    Del {
        /// Cache key to remove
        #[arg(value_name = "KEY", value_parser = validate_cache_key)]
        key: String,
    },

    /// Remove entries by glob pattern or by tag
    ///
    /// Patterns support `*` (any run of characters) and `?` (one character).
    /// With redis, pattern invalidation scans the whole keyspace.
    ///
    /// Examples:
    ///   market-cache invalidate --pattern 'farm:7:*'
    ///   market-cache invalidate --tag catalog
    Invalidate(InvalidateArgs),

    /// Remove every entry owned by this cache
    Clear,

    /// Print backend and manager statistics as JSON
    Stats,

    /// Show the season for a date and the TTL the policy assigns to it
    ///
    /// Example:
    ///   market-cache season --date 2026-12-01 --base 600
    Season {
        /// Date to classify (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = validate_date)]
        date: Option<Date>,

        /// Base TTL for the multiplier policy (defaults to `cache.default_ttl_seconds`)
        #[arg(long, value_name = "SECONDS", value_parser = validate_ttl)]
        base: Option<u64>,
    },
}

/// Target of an invalidation; exactly one must be given.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct InvalidateArgs {
    /// Glob pattern of keys to remove
    #[arg(long, value_name = "PATTERN", value_parser = validate_pattern)]
    pub pattern: Option<String>,

    /// Tag whose entries should be removed
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
    #[value(name = "test")]
    Test,
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
            Environment::Test => crate::config::Environment::Test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["market-cache", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["market-cache", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_command_is_required() {
        let err = Cli::try_parse_from(["market-cache"]).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_check_command_with_globals() {
        let cli = Cli::try_parse_from(["market-cache", "--env", "prod", "-v", "check"]).unwrap();
        assert!(matches!(cli.command, Commands::Check));
        assert_eq!(cli.env, Some(Environment::Production));
        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_set_command() {
        let cli = Cli::try_parse_from([
            "market-cache",
            "set",
            "product:42",
            r#"{"name":"kale","price_cents":300}"#,
            "--ttl",
            "120",
            "--tag",
            "product:42",
            "--tag",
            "catalog",
        ])
        .unwrap();

        let Commands::Set {
            key,
            value,
            ttl,
            tags,
            season,
        } = cli.command
        else {
            panic!("Expected Set command");
        };
        assert_eq!(key, "product:42");
        assert_eq!(value["price_cents"], 300);
        assert_eq!(ttl, Some(120));
        assert_eq!(tags, vec!["product:42", "catalog"]);
        assert!(season.is_none());
    }

    #[test]
    fn test_set_with_season() {
        let cli =
            Cli::try_parse_from(["market-cache", "set", "k", "1", "--season", "winter"]).unwrap();
        let Commands::Set { season, ttl, .. } = cli.command else {
            panic!("Expected Set command");
        };
        assert_eq!(season, Some(Season::Winter));
        assert!(ttl.is_none());
    }

    #[test]
    fn test_set_rejects_ttl_with_season() {
        let err = Cli::try_parse_from([
            "market-cache",
            "set",
            "k",
            "1",
            "--ttl",
            "60",
            "--season",
            "summer",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_set_rejects_invalid_json() {
        let err = Cli::try_parse_from(["market-cache", "set", "k", "{not json"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_set_rejects_zero_ttl() {
        let err =
            Cli::try_parse_from(["market-cache", "set", "k", "1", "--ttl", "0"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_invalidate_requires_exactly_one_target() {
        let cli =
            Cli::try_parse_from(["market-cache", "invalidate", "--pattern", "search:*"]).unwrap();
        let Commands::Invalidate(args) = cli.command else {
            panic!("Expected Invalidate command");
        };
        assert_eq!(args.pattern.as_deref(), Some("search:*"));
        assert!(args.tag.is_none());

        let err = Cli::try_parse_from(["market-cache", "invalidate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from([
            "market-cache",
            "invalidate",
            "--pattern",
            "a:*",
            "--tag",
            "catalog",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_season_command() {
        let cli = Cli::try_parse_from([
            "market-cache",
            "season",
            "--date",
            "2026-04-15",
            "--base",
            "600",
        ])
        .unwrap();
        let Commands::Season { date, base } = cli.command else {
            panic!("Expected Season command");
        };
        assert_eq!(date, Some(jiff::civil::date(2026, 4, 15)));
        assert_eq!(base, Some(600));
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["market-cache", "--verbose", "--quiet", "stats"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_environment_conversion() {
        assert_eq!(
            crate::config::Environment::from(Environment::Staging),
            crate::config::Environment::Staging
        );
        assert_eq!(
            crate::config::Environment::from(Environment::Test),
            crate::config::Environment::Test
        );
    }
}
