//! CLI command handlers, one per file.

mod ping;
mod run;
mod scan;
mod stats;
mod status;
mod test_connection;

pub use ping::run_ping;
pub use run::run_bus;
pub use scan::run_scan;
pub use stats::run_stats;
pub use status::run_status;
pub use test_connection::run_test_connection;

use anyhow::{Context, Result};
use linkbuster_core::bus::Reply;

/// Wait for a reply and print it as pretty JSON.
pub(crate) async fn print_reply(reply: Reply) -> Result<()> {
    let response = reply
        .resolve()
        .await
        .context("request was abandoned before a response arrived")?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
