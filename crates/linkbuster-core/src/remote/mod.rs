//! Remote scoring service client.
//!
//! The service is an opaque HTTP collaborator: `POST /scan`, `GET /status`
//! and `POST /emergency-alert` under a configurable base URL. Every call is
//! bounded by a hard timeout and never retried; callers decide what a
//! failure means.

mod error;
mod http;
mod wire;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::scan::ScanResult;

pub use error::{RemoteError, RemoteErrorKind};
pub use http::HttpScanClient;
pub use wire::{decode_scan_response, EmergencyAlert};

/// Port for the remote scoring service.
#[async_trait]
pub trait RemoteScanner: Send + Sync + std::fmt::Debug {
    /// Score `url` (already normalized). Any non-2xx, transport error,
    /// timeout or undecodable body is an error.
    async fn scan(&self, url: &str) -> Result<ScanResult, RemoteError>;

    /// Connectivity probe. Returns the HTTP status code of `GET /status`;
    /// only transport failures and timeouts are errors.
    async fn status(&self) -> Result<u32, RemoteError>;

    /// Best-effort high-risk report.
    async fn emergency_alert(&self, alert: &EmergencyAlert) -> Result<(), RemoteError>;
}
