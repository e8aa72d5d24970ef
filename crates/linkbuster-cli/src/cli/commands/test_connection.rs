//! `linkbuster test-connection` – probe the scoring service.

use std::sync::Arc;

use anyhow::Result;
use linkbuster_core::service::ProtectionService;

pub async fn run_test_connection(svc: &Arc<ProtectionService>) -> Result<()> {
    let c = svc.test_connection().await;
    println!("{}", serde_json::to_string_pretty(&c)?);
    if !c.connected {
        tracing::info!(status = ?c.status, "scoring service not reachable");
        anyhow::bail!("scoring service not reachable");
    }
    Ok(())
}
