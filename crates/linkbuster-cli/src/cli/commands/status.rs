//! `linkbuster status` – service status.

use std::sync::Arc;

use anyhow::Result;
use linkbuster_core::bus::Request;
use linkbuster_core::service::ProtectionService;

use super::print_reply;

pub async fn run_status(svc: &Arc<ProtectionService>) -> Result<()> {
    print_reply(svc.handle(Request::GetStatus)).await
}
