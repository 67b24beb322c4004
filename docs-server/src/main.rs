use anyhow::Result;
use clap::Parser;
use docs_server::cli::{run, Cli};
use docs_server::load_config::{peek_log_level, DEFAULT_LOG_LEVEL};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // RUST_LOG wins over the config's log_level. Logs go to stderr so stdout stays
    // clean for `snapshot` and `fetch` output.
    let level = peek_log_level(cli.command.config_path())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::info!(log_level = %level, "CLI application startup: tracing initialised, environment loaded");

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
