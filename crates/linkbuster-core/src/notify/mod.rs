//! Threat notifications: one active warning per browsing context.
//!
//! The dispatcher owns per-context state (`idle` / `active`), delivers
//! warnings to observing surfaces over the bus, and escalates each triggering
//! scan to the remote service exactly once.

mod dispatcher;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use dispatcher::Dispatcher;

/// A logical observation point (one browsing surface, e.g. a tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the triggering scan came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOrigin {
    /// The user asked for this scan from the context itself.
    Direct,
    /// Background navigation interception, not directly observed by the user.
    Background,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatNotification {
    pub id: Uuid,
    pub url: String,
    pub risk_score: u8,
    pub threats: Vec<String>,
    pub context_id: ContextId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Why an active notification stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationEnd {
    Dismissed,
    Expired,
    Superseded,
}

/// State change produced by a threshold-crossing scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub notification: ThreatNotification,
    /// Id of the notification this one replaced, if the context was already active.
    pub superseded: Option<Uuid>,
}
