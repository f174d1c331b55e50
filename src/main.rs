//! betsync - lottery agency client
//!
//! Uploads the agency's bet file to the lottery server in batches over one
//! TCP connection, then asks for the agency's winners.

use betsync_client::{spawn_signal_listener, ClientConfig, ClientError, RunOutcome, Session, ShutdownHandle};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "betsync")]
#[command(about = "Upload an agency's bets and query its winners")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "CLI_CONFIG")]
    config: Option<PathBuf>,

    /// Agency id (overrides config and CLI_ID)
    #[arg(long)]
    id: Option<u32>,

    /// Server address as host:port (overrides config and CLI_SERVER_ADDRESS)
    #[arg(short, long)]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ClientConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(id) = cli.id {
        config.client.id = id;
    }
    if let Some(server) = cli.server {
        config.server.address = server;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log.level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Some(ref path) = cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }
    tracing::info!("Starting betsync client");
    tracing::info!("  Agency: {}", config.client.id);
    tracing::info!("  Server address: {}", config.server.address);
    tracing::info!("  Batch max amount: {}", config.batch.max_amount);
    tracing::info!("  Bet file: {}", config.data_path().display());

    let shutdown = ShutdownHandle::new();
    let listener = spawn_signal_listener(shutdown.clone());

    let code = match run(&config, shutdown).await {
        Ok(RunOutcome::Completed(summary)) => {
            tracing::info!(
                "action: consulta_ganadores | result: success | cant_ganadores: {}",
                summary.winners.count()
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Cancelled) | Err(ClientError::Cancelled) => {
            tracing::info!("Client stopped by shutdown signal");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Client failed: {}", e);
            ExitCode::FAILURE
        }
    };

    listener.abort();
    tracing::info!("Client exited");
    code
}

async fn run(config: &ClientConfig, shutdown: ShutdownHandle) -> Result<RunOutcome, ClientError> {
    let mut session = Session::connect(config, shutdown).await?;
    session.run().await
}
