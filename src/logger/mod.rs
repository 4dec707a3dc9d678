//! Logger Module
//!
//! A logging system based on `tracing-subscriber` with support for:
//! - Console output with color control
//! - File output with multiple formats (Full, Compact, JSON)

pub mod config;
pub mod error;
pub(crate) mod writer;

// Re-export main types
pub use config::*;
pub use error::LoggerError;

use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use writer::open_log_file;

/// Initialize the global subscriber with the given configuration
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    config.validate()?;

    let filter = EnvFilter::try_new(config.filter_directive()?)?;

    match (config.console.enabled, config.file.enabled) {
        (true, true) => init_both(&config, filter)?,
        (true, false) => init_console_only(&config.console, filter)?,
        (false, true) => init_file_only(&config.file, filter)?,
        (false, false) => anyhow::bail!("At least one output (console or file) must be enabled"),
    }

    Ok(())
}

fn console_ansi(config: &ConsoleConfig) -> bool {
    config.colored && std::io::stdout().is_terminal()
}

fn console_layer<S>(config: &ConsoleConfig) -> fmt::Layer<S> {
    fmt::layer()
        .with_ansi(console_ansi(config))
        .with_target(true)
        .with_level(true)
}

fn init_console_only(config: &ConsoleConfig, filter: EnvFilter) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(console_ansi(config))
                .with_target(true)
                .with_level(true),
        )
        .try_init()?;
    Ok(())
}

fn init_file_only(config: &FileConfig, filter: EnvFilter) -> anyhow::Result<()> {
    let writer = open_log_file(config)?;

    match config.format {
        LogFormat::Full => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false).with_target(true).with_writer(writer))
            .try_init()?,
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .compact()
                    .with_writer(writer),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false).json().with_writer(writer))
            .try_init()?,
    }

    Ok(())
}

fn init_both(config: &LoggerConfig, filter: EnvFilter) -> anyhow::Result<()> {
    let writer = open_log_file(&config.file)?;

    // File layer goes first so ANSI codes from the console layer do not leak
    // into span fields written to the file (tokio-rs/tracing#1817).
    match config.file.format {
        LogFormat::Full => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false).with_target(true).with_writer(writer))
            .with(console_layer(&config.console))
            .try_init()?,
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .compact()
                    .with_writer(writer),
            )
            .with(console_layer(&config.console))
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false).json().with_writer(writer))
            .with(console_layer(&config.console))
            .try_init()?,
    }

    Ok(())
}
