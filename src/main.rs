use clap::Parser;
use market_cache::AppState;
use market_cache::cli::{Cli, execute_command, init_logger_from_settings, load_and_merge_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_and_merge_config(&cli)?;
    init_logger_from_settings(&settings)?;

    tracing::debug!(
        version = market_cache::pkg_version(),
        backend = settings.cache.backend.as_str(),
        "Starting market-cache"
    );

    let state = AppState::new(settings).await?;

    let mut stdout = std::io::stdout().lock();
    let result = execute_command(&cli.command, &state, &mut stdout).await;

    state.shutdown();
    result
}
