//! Request/response protocol.
//!
//! JSON form is tagged by `action` in camelCase, e.g.
//! `{"action":"scanUrl","url":"https://example.com/"}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::notify::ContextId;
use crate::scan::ScanResult;
use crate::stats::Stats;

/// Kind of frame a navigation targets; only top-level documents are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    #[default]
    MainFrame,
    SubFrame,
    Other,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Scan one URL. With a context id the scan counts as a direct request
    /// from that context and may raise a warning there.
    #[serde(rename_all = "camelCase")]
    ScanUrl {
        url: String,
        #[serde(default)]
        context_id: Option<ContextId>,
    },
    GetStats,
    GetStatus,
    Ping,
    /// Probe the remote scoring service; touches neither cache nor stats.
    TestConnection,
    /// A navigation observed by the host.
    #[serde(rename_all = "camelCase")]
    Navigate {
        url: String,
        context_id: ContextId,
        #[serde(default)]
        frame: FrameKind,
        #[serde(default = "default_true")]
        background: bool,
    },
    /// A top-level document finished loading.
    #[serde(rename_all = "camelCase")]
    PageLoaded { url: String, context_id: ContextId },
    #[serde(rename_all = "camelCase")]
    DismissWarning { context_id: ContextId },
    #[serde(rename_all = "camelCase")]
    FocusContext { context_id: ContextId },
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::ScanUrl { .. } => "scanUrl",
            Request::GetStats => "getStats",
            Request::GetStatus => "getStatus",
            Request::Ping => "ping",
            Request::TestConnection => "testConnection",
            Request::Navigate { .. } => "navigate",
            Request::PageLoaded { .. } => "pageLoaded",
            Request::DismissWarning { .. } => "dismissWarning",
            Request::FocusContext { .. } => "focusContext",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ServiceState,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingResponse {
    pub alive: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of handling a navigation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationOutcome {
    /// False when the navigation was filtered out (non-web URL, sub-frame,
    /// own API, auto-scan off).
    pub scanned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Scan(ScanResult),
    Stats(Stats),
    Status(StatusResponse),
    Ping(PingResponse),
    Connection(ConnectionResponse),
    Navigation(NavigationOutcome),
    Ack(AckResponse),
}

/// Answer to a [`Request`].
#[derive(Debug)]
pub enum Reply {
    Ready(Response),
    /// The response will arrive later; keep the handle to receive it.
    Pending(PendingResponse),
}

impl Reply {
    /// Wait for the response. `None` means it was abandoned.
    pub async fn resolve(self) -> Option<Response> {
        match self {
            Reply::Ready(r) => Some(r),
            Reply::Pending(p) => p.wait().await,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Reply::Pending(_))
    }
}

/// Receiving half of an async-pending response.
#[derive(Debug)]
pub struct PendingResponse(oneshot::Receiver<Response>);

impl PendingResponse {
    pub async fn wait(self) -> Option<Response> {
        self.0.await.ok()
    }
}

/// Sending half of an async-pending response.
#[derive(Debug)]
pub struct Responder(oneshot::Sender<Response>);

impl Responder {
    /// Deliver the response. If the requester went away this is a no-op.
    pub fn send(self, response: Response) {
        if self.0.send(response).is_err() {
            tracing::debug!("requester abandoned pending response");
        }
    }
}

/// Create a linked responder / pending pair.
pub fn pending() -> (Responder, PendingResponse) {
    let (tx, rx) = oneshot::channel();
    (Responder(tx), PendingResponse(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_extension_message_shapes() {
        let r: Request = serde_json::from_value(json!({"action": "scanUrl", "url": "https://a.test/"})).unwrap();
        assert_eq!(
            r,
            Request::ScanUrl {
                url: "https://a.test/".into(),
                context_id: None
            }
        );
        let r: Request = serde_json::from_value(json!({"action": "getStats"})).unwrap();
        assert_eq!(r, Request::GetStats);
        let r: Request = serde_json::from_value(json!({"action": "testConnection"})).unwrap();
        assert_eq!(r.action(), "testConnection");
    }

    #[test]
    fn navigate_defaults_to_background_main_frame() {
        let r: Request = serde_json::from_value(json!({
            "action": "navigate",
            "url": "https://a.test/",
            "contextId": 4
        }))
        .unwrap();
        assert_eq!(
            r,
            Request::Navigate {
                url: "https://a.test/".into(),
                context_id: ContextId(4),
                frame: FrameKind::MainFrame,
                background: true,
            }
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(serde_json::from_value::<Request>(json!({"action": "openDetails"})).is_err());
    }

    #[test]
    fn responses_serialize_as_plain_bodies() {
        let v = serde_json::to_value(Response::Connection(ConnectionResponse {
            connected: false,
            status: None,
            error: Some("refused".into()),
        }))
        .unwrap();
        assert_eq!(v, json!({"connected": false, "error": "refused"}));

        let v = serde_json::to_value(Response::Ack(AckResponse { success: true })).unwrap();
        assert_eq!(v, json!({"success": true}));
    }

    #[tokio::test]
    async fn pending_reply_resolves_when_responder_sends() {
        let (responder, pending) = pending();
        let reply = Reply::Pending(pending);
        assert!(reply.is_pending());
        responder.send(Response::Ack(AckResponse { success: true }));
        assert_eq!(
            reply.resolve().await,
            Some(Response::Ack(AckResponse { success: true }))
        );
    }

    #[tokio::test]
    async fn dropped_responder_means_no_observer() {
        let (responder, pending) = pending();
        drop(responder);
        assert!(pending.wait().await.is_none());
    }

    #[test]
    fn abandoned_requester_is_not_an_error() {
        let (responder, pending) = pending();
        drop(pending);
        responder.send(Response::Ack(AckResponse { success: true }));
    }
}
