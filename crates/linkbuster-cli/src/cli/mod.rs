//! CLI for LinkBuster.

mod bus_socket;
mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linkbuster_core::clock::SystemClock;
use linkbuster_core::config::{self, LinkbusterConfig};
use linkbuster_core::remote::HttpScanClient;
use linkbuster_core::service::ProtectionService;
use linkbuster_core::store::{KeyValueStore, SqliteStore};

use commands::{run_bus, run_ping, run_scan, run_stats, run_status, run_test_connection};

/// Top-level CLI for LinkBuster.
#[derive(Debug, Parser)]
#[command(name = "linkbuster")]
#[command(about = "LinkBuster: URL risk scanning and threat warnings", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Scan one URL and print the result.
    Scan {
        /// URL to scan.
        url: String,
        /// Treat the scan as a direct request from this context (may raise a warning).
        #[arg(long, value_name = "ID")]
        context: Option<u64>,
    },

    /// Show usage statistics.
    Stats,

    /// Show service status.
    Status,

    /// Liveness check.
    Ping,

    /// Probe the remote scoring service.
    TestConnection,

    /// Serve the message bus on a Unix socket until interrupted.
    Run {
        /// Socket path (default: $XDG_STATE_HOME/linkbuster/bus.sock).
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let svc = build_service(cfg).await?;

        match cli.command {
            CliCommand::Scan { url, context } => run_scan(&svc, &url, context).await?,
            CliCommand::Stats => run_stats(&svc).await?,
            CliCommand::Status => run_status(&svc).await?,
            CliCommand::Ping => run_ping(&svc).await?,
            CliCommand::TestConnection => run_test_connection(&svc).await?,
            CliCommand::Run { socket } => {
                let path = match socket {
                    Some(p) => p,
                    None => config::default_bus_socket_path()?,
                };
                run_bus(&svc, &path).await?;
            }
        }

        Ok(())
    }
}

/// Open the store and wire the service to the configured scoring API.
async fn build_service(cfg: LinkbusterConfig) -> Result<Arc<ProtectionService>> {
    let store = match &cfg.store_path {
        Some(path) => SqliteStore::open_at(path).await,
        None => SqliteStore::open_default().await,
    }
    .context("open store")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    let remote = Arc::new(HttpScanClient::from_config(&cfg));
    Ok(ProtectionService::new(cfg, store, remote, Arc::new(SystemClock)).await)
}

#[cfg(test)]
mod tests;
