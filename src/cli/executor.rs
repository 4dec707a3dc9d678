//! Command executor for dispatching CLI commands
//!
//! Runs one parsed command against the application's cache and writes the
//! human-readable result to the given output.

use std::io::Write;

use super::parser::{Commands, InvalidateArgs};
use crate::AppState;
use crate::cache::{CacheBackend, CacheOptions, Season};
use crate::error::AppError;

/// Execute a CLI command against the application state
///
/// # Errors
/// Returns an error for usage mistakes (bad TTL, bad pattern), a `get` miss,
/// or a failure writing to `out`. Backend failures are absorbed by the cache.
pub async fn execute_command<W: Write>(
    command: &Commands,
    state: &AppState,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Commands::Check => check(state, out),
        Commands::Get { key } => get(state, key, out).await,
        Commands::Set {
            key,
            value,
            ttl,
            tags,
            season,
        } => set(state, key, value, *ttl, tags, *season, out).await,
        Commands::Del { key } => {
            state.cache.delete(key).await;
            writeln!(out, "OK")?;
            Ok(())
        }
        Commands::Invalidate(args) => invalidate(state, args, out).await,
        Commands::Clear => {
            state.cache.clear().await;
            writeln!(out, "OK")?;
            Ok(())
        }
        Commands::Stats => {
            let stats = state.cache.stats().await;
            writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            Ok(())
        }
        Commands::Season { date, base } => season(state, *date, *base, out),
    }
}

fn check<W: Write>(state: &AppState, out: &mut W) -> anyhow::Result<()> {
    let config = state.cache.config();
    let active = state.cache.backend().kind();

    writeln!(out, "✓ Configuration is valid")?;
    writeln!(out, "✓ Cache enabled: {}", config.enabled)?;
    writeln!(out, "✓ Requested backend: {}", config.backend.as_str())?;
    writeln!(out, "✓ Active backend: {}", active)?;
    writeln!(out, "✓ Default TTL: {}s", config.default_ttl_seconds)?;
    writeln!(
        out,
        "✓ Seasonal policy: {} (current season: {})",
        state.cache.policy().name(),
        Season::current()
    )?;

    let wants_redis = match config.backend {
        CacheBackend::Redis => true,
        CacheBackend::Auto => config.redis.is_configured(),
        CacheBackend::Memory => false,
    };
    if config.enabled && wants_redis && active != "redis" {
        writeln!(out, "! Redis is unreachable, serving from {}", active)?;
    }

    Ok(())
}

async fn get<W: Write>(state: &AppState, key: &str, out: &mut W) -> anyhow::Result<()> {
    let value = state
        .cache
        .get::<serde_json::Value>(key)
        .await
        .ok_or_else(|| AppError::not_found("cache entry", "key", key))?;

    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

async fn set<W: Write>(
    state: &AppState,
    key: &str,
    value: &serde_json::Value,
    ttl: Option<u64>,
    tags: &[String],
    season: Option<Season>,
    out: &mut W,
) -> anyhow::Result<()> {
    let config = state.cache.config();
    let ttl = match season {
        Some(season) => state.cache.policy().ttl_for(season, config.default_ttl_seconds),
        None => ttl.unwrap_or(config.default_ttl_seconds),
    };

    let options = tags
        .iter()
        .fold(CacheOptions::new().ttl(ttl), |options, tag| options.tag(tag.as_str()));
    state.cache.set_with(key, value, &options).await?;

    writeln!(out, "OK (ttl {}s)", ttl)?;
    Ok(())
}

async fn invalidate<W: Write>(
    state: &AppState,
    args: &InvalidateArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let removed = match (&args.pattern, &args.tag) {
        (Some(pattern), _) => state.cache.invalidate_pattern(pattern).await?,
        (None, Some(tag)) => state.cache.invalidate_tag(tag).await,
        (None, None) => {
            return Err(AppError::bad_request("invalidate needs --pattern or --tag").into());
        }
    };

    writeln!(out, "Removed {} entries", removed)?;
    Ok(())
}

fn season<W: Write>(
    state: &AppState,
    date: Option<jiff::civil::Date>,
    base: Option<u64>,
    out: &mut W,
) -> anyhow::Result<()> {
    let date = date.unwrap_or_else(|| jiff::Zoned::now().date());
    let base = base.unwrap_or(state.cache.config().default_ttl_seconds);
    let season = Season::from_date(date);
    let policy = state.cache.policy();

    writeln!(out, "date: {}", date)?;
    writeln!(out, "season: {}", season)?;
    writeln!(out, "policy: {}", policy.name())?;
    writeln!(out, "ttl_seconds: {}", policy.ttl_for(season, base))?;
    Ok(())
}
