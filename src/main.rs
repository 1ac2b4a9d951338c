//! Client IP server.
//!
//! ```text
//! Client ──▶ [proxy ──▶ proxy ──▶] request id → trace → timeout
//!                                  → client_ip (header / peer / 0.0.0.0)
//!                                  → rate limit (per resolved address)
//!                                  → /ip, /health
//! ```

use std::path::PathBuf;

use clap::Parser;

use client_ip::config::loader::load_config;
use client_ip::lifecycle::{start, Shutdown};
use client_ip::observability::logging::init_logging;
use client_ip::ServerConfig;

#[derive(Parser)]
#[command(name = "client-ip-server")]
#[command(about = "Reports and rate-limits callers by their resolved client address", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "CLIENT_IP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability);

    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        rate_limit = config.rate_limit.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "client-ip v0.1.0 starting"
    );

    let shutdown = Shutdown::new();
    start(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
