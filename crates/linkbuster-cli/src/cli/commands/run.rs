//! `linkbuster run` – serve the bus until interrupted.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use linkbuster_core::service::ProtectionService;

use crate::cli::bus_socket;

pub async fn run_bus(svc: &Arc<ProtectionService>, socket: &Path) -> Result<()> {
    svc.spawn_maintenance();
    let listener = bus_socket::spawn_bus_listener(Arc::clone(svc), socket)?;
    tracing::info!(path = %socket.display(), "bus socket listening");
    println!("LinkBuster protection active; bus at {}", socket.display());

    tokio::signal::ctrl_c()
        .await
        .context("wait for interrupt")?;

    listener.abort();
    svc.shutdown();
    svc.flush().await;
    if let Err(e) = std::fs::remove_file(socket) {
        tracing::debug!(path = %socket.display(), "remove bus socket: {}", e);
    }
    Ok(())
}
