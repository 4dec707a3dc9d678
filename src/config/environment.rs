//! Deployment environment, which selects the config overlay file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

/// Where the cache is running.
///
/// Each environment may ship a `config/{name}.toml` overlay on top of
/// `default.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    /// Variable holding the environment name
    pub const ENV_VAR: &'static str = "MARKET_APP_ENV";

    pub const ALL: [Environment; 4] = [
        Environment::Development,
        Environment::Test,
        Environment::Staging,
        Environment::Production,
    ];

    /// Read `MARKET_APP_ENV`, falling back to development when unset or unknown.
    pub fn from_env() -> Self {
        match std::env::var(Self::ENV_VAR) {
            Ok(value) => value.parse().unwrap_or_else(|e: ConfigError| {
                tracing::warn!(error = %e, "Ignoring {}", Self::ENV_VAR);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Name of the overlay file loaded after `default.toml`
    pub fn overlay_file(&self) -> String {
        format!("{}.toml", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        for (input, expected) in [
            ("development", Environment::Development),
            ("dev", Environment::Development),
            ("test", Environment::Test),
            ("stage", Environment::Staging),
            ("PROD", Environment::Production),
            (" production ", Environment::Production),
        ] {
            assert_eq!(input.parse::<Environment>().unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn test_parse_unknown() {
        let err = "qa".parse::<Environment>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment(ref name) if name == "qa"));
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn test_display_round_trips() {
        for env in Environment::ALL {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
    }

    #[test]
    fn test_overlay_file() {
        assert_eq!(Environment::Production.overlay_file(), "production.toml");
        assert_eq!(Environment::default().overlay_file(), "development.toml");
    }
}
