//! CLI argument validation functions
//!
//! Custom value parsers for arguments clap cannot check on its own.

use std::fs;
use std::path::PathBuf;

use jiff::civil::Date;

use crate::cache::Season;
use crate::cache::pattern::KeyPattern;

/// Longest TTL accepted from the command line (30 days).
const MAX_CLI_TTL_SECONDS: u64 = 30 * 86_400;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate a cache key: non-empty and free of surrounding whitespace
pub fn validate_cache_key(key: &str) -> Result<String, String> {
    if key.is_empty() {
        return Err("Cache key cannot be empty".to_string());
    }

    if key.trim() != key {
        return Err(format!(
            "Cache key cannot start or end with whitespace, got: '{}'",
            key
        ));
    }

    Ok(key.to_string())
}

/// Validate a TTL in seconds (1 to 30 days)
pub fn validate_ttl(ttl_str: &str) -> Result<u64, String> {
    let ttl: u64 = ttl_str
        .parse()
        .map_err(|_| format!("TTL must be a whole number of seconds, got: '{}'", ttl_str))?;

    if ttl == 0 {
        return Err("TTL must be at least 1 second".to_string());
    }

    if ttl > MAX_CLI_TTL_SECONDS {
        return Err(format!(
            "TTL cannot exceed {} seconds (30 days), got: {}",
            MAX_CLI_TTL_SECONDS, ttl
        ));
    }

    Ok(ttl)
}

/// Validate that a value is well-formed JSON
pub fn validate_json_value(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Value must be valid JSON: {}", e))
}

/// Validate a glob pattern for invalidation
pub fn validate_pattern(pattern: &str) -> Result<String, String> {
    KeyPattern::new(pattern)
        .map(|p| p.as_str().to_string())
        .map_err(|e| e.to_string())
}

/// Validate a season name
pub fn validate_season(season: &str) -> Result<Season, String> {
    season.parse()
}

/// Validate a calendar date in `YYYY-MM-DD` form
pub fn validate_date(date: &str) -> Result<Date, String> {
    date.parse::<Date>()
        .map_err(|e| format!("Date must be in YYYY-MM-DD form, got '{}': {}", date, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_config_file_path() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[cache]\nenabled = true").unwrap();
        let path = temp_file.path().to_str().unwrap();

        assert_eq!(validate_config_file_path(path).unwrap(), PathBuf::from(path));
        assert!(validate_config_file_path("/nonexistent/market.toml").is_err());

        let dir = tempfile::tempdir().unwrap();
        let err = validate_config_file_path(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.contains("not a file"));
    }

    #[test]
    fn test_validate_cache_key() {
        assert_eq!(validate_cache_key("product:42").unwrap(), "product:42");
        assert!(validate_cache_key("").is_err());
        assert!(validate_cache_key(" product:42").is_err());
        assert!(validate_cache_key("product:42\n").is_err());
    }

    #[test]
    fn test_validate_ttl() {
        assert_eq!(validate_ttl("1").unwrap(), 1);
        assert_eq!(validate_ttl("3600").unwrap(), 3600);
        assert_eq!(validate_ttl("2592000").unwrap(), MAX_CLI_TTL_SECONDS);

        assert!(validate_ttl("0").is_err());
        assert!(validate_ttl("2592001").is_err());
        assert!(validate_ttl("-5").is_err());
        assert!(validate_ttl("soon").is_err());
    }

    #[test]
    fn test_validate_json_value() {
        assert_eq!(
            validate_json_value(r#"{"name":"kale"}"#).unwrap(),
            serde_json::json!({"name": "kale"})
        );
        assert_eq!(validate_json_value("42").unwrap(), serde_json::json!(42));
        assert!(validate_json_value("{name: kale}").is_err());
        assert!(validate_json_value("").is_err());
    }

    #[test]
    fn test_validate_pattern() {
        assert_eq!(validate_pattern("product:*").unwrap(), "product:*");
        assert!(validate_pattern("").is_err());
    }

    #[test]
    fn test_validate_season() {
        assert_eq!(validate_season("Summer").unwrap(), Season::Summer);
        assert_eq!(validate_season("autumn").unwrap(), Season::Fall);
        assert!(validate_season("monsoon").is_err());
    }

    #[test]
    fn test_validate_date() {
        let date = validate_date("2026-07-04").unwrap();
        assert_eq!(Season::from_date(date), Season::Summer);

        assert!(validate_date("2026-13-01").is_err());
        assert!(validate_date("07/04/2026").is_err());
    }
}
