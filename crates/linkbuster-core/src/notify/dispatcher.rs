//! Per-context warning state machine and delivery.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{ContextId, NotificationEnd, ThreatNotification, Transition, TriggerOrigin};
use crate::bus::{SurfaceBus, SurfaceMessage};
use crate::clock::Clock;
use crate::remote::{EmergencyAlert, RemoteScanner};
use crate::scan::ScanResult;
use crate::settings::LiveSettings;

#[derive(Debug)]
struct ActiveSlot {
    notification: ThreatNotification,
    timer: Option<JoinHandle<()>>,
}

impl ActiveSlot {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Owns notification state for every context.
///
/// A context with an entry in `contexts` is `active`; no entry means `idle`.
/// Methods that spawn (alerts, expiry timers) must run inside a tokio runtime.
#[derive(Debug)]
pub struct Dispatcher {
    bus: SurfaceBus,
    remote: Arc<dyn RemoteScanner>,
    clock: Arc<dyn Clock>,
    settings: LiveSettings,
    expiry: Duration,
    contexts: Mutex<HashMap<ContextId, ActiveSlot>>,
    focused: Mutex<Option<ContextId>>,
    alerts: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(
        bus: SurfaceBus,
        remote: Arc<dyn RemoteScanner>,
        clock: Arc<dyn Clock>,
        settings: LiveSettings,
        expiry: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            remote,
            clock,
            settings,
            expiry,
            contexts: Mutex::new(HashMap::new()),
            focused: Mutex::new(None),
            alerts: Mutex::new(Vec::new()),
        })
    }

    /// React to a scan result for `context`.
    ///
    /// Below the threshold nothing happens. At or above it the context becomes
    /// active with a fresh notification (superseding any current one), the
    /// warning is delivered, and one emergency alert is sent.
    pub fn on_scan(
        self: &Arc<Self>,
        context: ContextId,
        origin: TriggerOrigin,
        url: &str,
        result: &ScanResult,
    ) -> Option<Transition> {
        if !result.is_high_risk(self.settings.get().risk_threshold) {
            return None;
        }

        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(self.expiry)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        let notification = ThreatNotification {
            id: Uuid::new_v4(),
            url: url.to_string(),
            risk_score: result.risk_score,
            threats: result.threats.clone(),
            context_id: context,
            created_at: now,
            expires_at,
        };

        let timer = self.spawn_expiry(context, notification.id);
        let superseded = {
            let mut contexts = self.contexts.lock();
            contexts
                .insert(
                    context,
                    ActiveSlot {
                        notification: notification.clone(),
                        timer: Some(timer),
                    },
                )
                .map(|mut old| {
                    old.cancel_timer();
                    old.notification.id
                })
        };

        tracing::warn!(
            context = %context,
            url,
            risk_score = result.risk_score,
            "threat detected"
        );

        if let Some(old_id) = superseded {
            self.deliver(SurfaceMessage::ClearWarning {
                context_id: context,
                notification_id: old_id,
                reason: NotificationEnd::Superseded,
            });
        }
        self.deliver(SurfaceMessage::ShowWarning {
            context_id: context,
            notification: notification.clone(),
        });
        if origin == TriggerOrigin::Background {
            let focused = *self.focused.lock();
            if let Some(focused) = focused.filter(|f| *f != context) {
                self.deliver(SurfaceMessage::ShowWarning {
                    context_id: focused,
                    notification: notification.clone(),
                });
            }
        }
        self.escalate(url, result);

        Some(Transition {
            notification,
            superseded,
        })
    }

    /// Push a fresh score to the active warning of `context` (page-load
    /// rescan). Idle contexts get nothing. Returns true if an update was sent.
    pub fn refresh(&self, context: ContextId, result: &ScanResult) -> bool {
        if !result.is_high_risk(self.settings.get().risk_threshold) {
            return false;
        }
        if !self.contexts.lock().contains_key(&context) {
            return false;
        }
        self.deliver(SurfaceMessage::UpdateWarning {
            context_id: context,
            result: result.clone(),
        });
        true
    }

    /// User dismissal. Returns the notification that was active, if any.
    pub fn dismiss(&self, context: ContextId) -> Option<ThreatNotification> {
        let mut slot = self.contexts.lock().remove(&context)?;
        slot.cancel_timer();
        self.deliver(SurfaceMessage::ClearWarning {
            context_id: context,
            notification_id: slot.notification.id,
            reason: NotificationEnd::Dismissed,
        });
        Some(slot.notification)
    }

    /// Auto-expiry of notification `id`. Ignored if `context` has since moved
    /// on to another notification (or to idle).
    pub fn expire(&self, context: ContextId, id: Uuid) -> bool {
        let removed = {
            let mut contexts = self.contexts.lock();
            match contexts.get(&context) {
                Some(slot) if slot.notification.id == id => contexts.remove(&context),
                _ => None,
            }
        };
        if removed.is_none() {
            return false;
        }
        tracing::debug!(context = %context, %id, "notification expired");
        self.deliver(SurfaceMessage::ClearWarning {
            context_id: context,
            notification_id: id,
            reason: NotificationEnd::Expired,
        });
        true
    }

    pub fn active(&self, context: ContextId) -> Option<ThreatNotification> {
        self.contexts
            .lock()
            .get(&context)
            .map(|slot| slot.notification.clone())
    }

    pub fn active_count(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn set_focused(&self, context: ContextId) {
        *self.focused.lock() = Some(context);
    }

    pub fn focused(&self) -> Option<ContextId> {
        *self.focused.lock()
    }

    /// Wait for emergency alerts still in flight.
    pub async fn flush_alerts(&self) {
        let in_flight: Vec<_> = self.alerts.lock().drain(..).collect();
        for alert in in_flight {
            let _ = alert.await;
        }
    }

    /// Stop all expiry timers. Active state is left as is.
    pub fn shutdown(&self) {
        for slot in self.contexts.lock().values_mut() {
            slot.cancel_timer();
        }
    }

    fn deliver(&self, msg: SurfaceMessage) {
        if !self.settings.get().notifications_enabled {
            tracing::debug!(context = %msg.context_id(), "notifications disabled, not delivering");
            return;
        }
        self.bus.deliver(msg);
    }

    fn spawn_expiry(self: &Arc<Self>, context: ContextId, id: Uuid) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let expiry = self.expiry;
        tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            if let Some(dispatcher) = weak.upgrade() {
                dispatcher.expire(context, id);
            }
        })
    }

    /// Fire-and-forget emergency alert; failures are logged and dropped.
    fn escalate(&self, url: &str, result: &ScanResult) {
        let alert = EmergencyAlert::from_result(url, result, self.clock.now());
        let remote = Arc::clone(&self.remote);
        let task = tokio::spawn(async move {
            match remote.emergency_alert(&alert).await {
                Ok(()) => tracing::debug!(url = %alert.url, "emergency alert sent"),
                Err(e) => tracing::warn!(
                    url = %alert.url,
                    kind = ?e.kind(),
                    "emergency alert failed: {}",
                    e
                ),
            }
        });
        let mut alerts = self.alerts.lock();
        alerts.retain(|t| !t.is_finished());
        alerts.push(task);
    }
}
