//! `linkbuster scan` – scan one URL.

use std::sync::Arc;

use anyhow::Result;
use linkbuster_core::bus::Request;
use linkbuster_core::notify::ContextId;
use linkbuster_core::service::ProtectionService;

use super::print_reply;

pub async fn run_scan(svc: &Arc<ProtectionService>, url: &str, context: Option<u64>) -> Result<()> {
    let reply = svc.handle(Request::ScanUrl {
        url: url.to_string(),
        context_id: context.map(ContextId),
    });
    print_reply(reply).await?;
    if let Some(ctx) = context.map(ContextId) {
        if let Some(n) = svc.dispatcher().active(ctx) {
            eprintln!(
                "warning raised in context {}: risk {} ({})",
                ctx,
                n.risk_score,
                n.threats.join(", ")
            );
        }
    }
    // Emergency alerts are fire-and-forget; give them a chance before exit.
    svc.flush().await;
    Ok(())
}
