//! Core → surface messages, fanned out over a broadcast channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::notify::{ContextId, NotificationEnd, ThreatNotification};
use crate::scan::ScanResult;

const SURFACE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SurfaceMessage {
    /// Raise a warning in `context_id`.
    #[serde(rename_all = "camelCase")]
    ShowWarning {
        context_id: ContextId,
        notification: ThreatNotification,
    },
    /// Refresh the score shown by an existing warning.
    #[serde(rename_all = "camelCase")]
    UpdateWarning {
        context_id: ContextId,
        result: ScanResult,
    },
    /// Take a warning down.
    #[serde(rename_all = "camelCase")]
    ClearWarning {
        context_id: ContextId,
        notification_id: Uuid,
        reason: NotificationEnd,
    },
}

impl SurfaceMessage {
    pub fn context_id(&self) -> ContextId {
        match self {
            SurfaceMessage::ShowWarning { context_id, .. }
            | SurfaceMessage::UpdateWarning { context_id, .. }
            | SurfaceMessage::ClearWarning { context_id, .. } => *context_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceBus {
    tx: broadcast::Sender<SurfaceMessage>,
}

impl Default for SurfaceBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SURFACE_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Deliver to every current subscriber; returns how many received it.
    /// With nobody listening the message is dropped.
    pub fn deliver(&self, msg: SurfaceMessage) -> usize {
        match self.tx.send(msg) {
            Ok(n) => n,
            Err(broadcast::error::SendError(msg)) => {
                tracing::debug!(context = %msg.context_id(), "no surface observers, message dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceMessage> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanSource;
    use chrono::Utc;

    fn update(ctx: u64) -> SurfaceMessage {
        SurfaceMessage::UpdateWarning {
            context_id: ContextId(ctx),
            result: ScanResult::completed(90, vec![], 0.9, Utc::now(), ScanSource::Remote),
        }
    }

    #[test]
    fn delivery_without_observers_is_noop() {
        let bus = SurfaceBus::new();
        assert_eq!(bus.deliver(update(1)), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives() {
        let bus = SurfaceBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.deliver(update(7)), 2);
        assert_eq!(a.recv().await.unwrap().context_id(), ContextId(7));
        assert_eq!(b.recv().await.unwrap().context_id(), ContextId(7));
    }

    #[test]
    fn wire_form_is_action_tagged() {
        let v = serde_json::to_value(update(3)).unwrap();
        assert_eq!(v["action"], "updateWarning");
        assert_eq!(v["contextId"], 3);
        assert_eq!(v["result"]["risk_score"], 90);
    }
}
