//! Sand Daemon
//!
//! Keeps countdown timers in memory and serves them over a Unix socket.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sand_core::config::DaemonConfig;
use sand_daemon::LogHook;

#[derive(Parser, Debug)]
#[command(name = "sandd")]
#[command(about = "Sand daemon - countdown timer backend", long_about = None)]
struct Args {
    /// Log level (overridden by RUST_LOG)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = DaemonConfig::from_env(&args.log_level)?;
    sand_daemon::init_logging(&config.log_level);
    tracing::info!("Socket: {}", config.socket);

    sand_daemon::run(config, Arc::new(LogHook)).await?;
    Ok(())
}
