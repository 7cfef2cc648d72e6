// Standalone MCP server binary speaking JSON-RPC over stdio

use anyhow::{Context, Result};
use clap::Parser;
use cqgate_core::{bridge::DEFAULT_BINARY_PATH, CqDecoder, ProcessBridge};
use cqgate_mcp::transport::serve_stdio;
use cqgate_mcp::McpServer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cqgate-mcp")]
#[command(about = "cq Cardano transaction decoder as MCP tools over stdio", long_about = None)]
struct Args {
    /// Path to the cq binary
    #[arg(long, env = "CQ_BINARY_PATH", default_value = DEFAULT_BINARY_PATH)]
    decoder: PathBuf,

    /// Kill decoder runs that take longer than this many milliseconds
    #[arg(long, env = "CQ_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries protocol messages, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    tracing::info!("cq MCP server starting...");

    let bridge = ProcessBridge::new(args.decoder)
        .context("Decoder binary unavailable")?
        .with_timeout(args.timeout_ms.map(Duration::from_millis));
    let decoder = CqDecoder::new(bridge);

    tracing::info!(
        decoder = %decoder.bridge().binary().display(),
        timeout_ms = ?decoder.bridge().timeout().map(|t| t.as_millis()),
        "Using cq decoder"
    );

    let server = McpServer::new(Arc::new(decoder)).context("Invalid tool schemas")?;
    serve_stdio(&server).await?;

    Ok(())
}
