mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cookhub::config::Config;
use cookhub::error::ClientError;
use cookhub::state::AppState;

use crate::commands::Cli;

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        match err.downcast_ref::<ClientError>() {
            Some(client_err) => {
                tracing::debug!(error = %client_err, "Command failed");
                eprintln!("{}", client_err.user_message());
            }
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli.config);
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli.config)?;
    tracing::debug!(api = %config.api.base_url, "Using CookHUB API");

    let state = AppState::from_config(config)?;
    commands::run(cli.command, &state).await
}
