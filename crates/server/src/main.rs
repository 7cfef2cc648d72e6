use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod config;
mod middleware;

use config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "cqgate")]
#[command(about = "HTTP and JSON-RPC gateway for the cq Cardano transaction decoder", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cqgate.toml")]
    config: PathBuf,

    /// Path to the cq binary (overrides the config file and CQ_BINARY_PATH)
    #[arg(short, long)]
    decoder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1", env = "HOST")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cqgate=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::info!("Starting cqgate");

    // Load configuration
    let mut config = ServerConfig::load(&args.config)?;
    if let Some(decoder) = args.decoder {
        config.decoder.binary_path = decoder;
    }
    config.validate()?;

    tracing::info!("Decoder binary: {}", config.decoder.binary_path.display());

    // Start API server
    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting API server on {}", addr);

    api::serve(&addr, config).await?;

    Ok(())
}
