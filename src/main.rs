use anyhow::Result;
use clap::Parser;
use courier::config::Config;
use courier::server::Server;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "courier", about = "Resilient email delivery service")]
struct Cli {
    /// Bind address, overriding configuration
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Path to a JSON configuration file (environment variables otherwise)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?,
        None => Config::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?,
    };
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("courier={},tower_http=debug", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting courier service");
    tracing::info!(
        "configuration: bind_addr={}, max_retries={}, rate_limit={}/{}s",
        config.bind_addr,
        config.delivery.max_retries,
        config.rate_limit.max_requests,
        config.rate_limit.window.as_secs()
    );

    let server = Server::new(config);

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
