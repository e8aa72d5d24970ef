//! User-facing settings, persisted under the `settings` key.
//!
//! Settings are configured externally (popup, CLI, direct store writes); the
//! core only reads them. A running service follows later writes through
//! [`LiveSettings`].

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::store::{get_json, set_json, KeyValueStore};

pub const SETTINGS_KEY: &str = "settings";

/// Default high-risk threshold.
pub const DEFAULT_RISK_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_threshold")]
    pub risk_threshold: u8,
    #[serde(rename = "notifications", default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub auto_scan: bool,
}

fn default_threshold() -> u8 {
    DEFAULT_RISK_THRESHOLD
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            notifications_enabled: true,
            auto_scan: true,
        }
    }
}

/// Current settings shared by the dispatcher, stats and navigation filter.
#[derive(Debug, Clone)]
pub struct LiveSettings(Arc<RwLock<Settings>>);

impl LiveSettings {
    pub fn new(initial: Settings) -> Self {
        Self(Arc::new(RwLock::new(initial)))
    }

    pub fn get(&self) -> Settings {
        *self.0.read()
    }

    /// Replace the current value; returns whether it changed.
    pub fn replace(&self, next: Settings) -> bool {
        let mut cur = self.0.write();
        let changed = *cur != next;
        *cur = next;
        changed
    }

    /// Apply a raw stored value. An unreadable value is logged and the current
    /// settings are kept.
    pub fn apply_stored(&self, value: serde_json::Value) {
        match serde_json::from_value::<Settings>(value) {
            Ok(next) => {
                if self.replace(next) {
                    tracing::info!(
                        risk_threshold = next.risk_threshold,
                        notifications = next.notifications_enabled,
                        auto_scan = next.auto_scan,
                        "settings reloaded"
                    );
                }
            }
            Err(e) => tracing::warn!("ignoring unreadable settings update: {}", e),
        }
    }
}

/// Read settings, writing the defaults first if none are stored.
///
/// Unreadable settings are logged and replaced by defaults for this run
/// (the stored value is left alone).
pub async fn load_or_init(store: &dyn KeyValueStore) -> Settings {
    match get_json::<Settings>(store, SETTINGS_KEY).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            let defaults = Settings::default();
            if let Err(e) = set_json(store, SETTINGS_KEY, &defaults).await {
                tracing::warn!("could not persist default settings: {:#}", e);
            }
            defaults
        }
        Err(e) => {
            tracing::warn!("stored settings unreadable, using defaults: {:#}", e);
            Settings::default()
        }
    }
}
