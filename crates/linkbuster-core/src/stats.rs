//! Usage counters and the last-scan record, persisted under the `stats` key.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::scan::ScanResult;
use crate::settings::LiveSettings;
use crate::store::{get_json, set_json, KeyValueStore};

pub const STATS_KEY: &str = "stats";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastScan {
    pub url: String,
    pub risk_score: u8,
    pub timestamp: DateTime<Utc>,
}

/// `threats_blocked <= urls_scanned` always holds; both only grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub urls_scanned: u64,
    #[serde(default)]
    pub threats_blocked: u64,
    #[serde(default)]
    pub last_scan: Option<LastScan>,
}

impl Stats {
    fn apply(&mut self, url: &str, result: &ScanResult, threshold: u8, now: DateTime<Utc>) {
        self.urls_scanned = self.urls_scanned.saturating_add(1);
        if result.is_high_risk(threshold) {
            self.threats_blocked = self.threats_blocked.saturating_add(1);
        }
        // Repair a persisted value that broke the invariant.
        self.threats_blocked = self.threats_blocked.min(self.urls_scanned);
        self.last_scan = Some(LastScan {
            url: url.to_string(),
            risk_score: result.risk_score,
            timestamp: now,
        });
    }
}

/// Sole writer of [`Stats`].
///
/// The lock is held across the store write so persisted snapshots are
/// written in the same order the counters advanced.
#[derive(Debug)]
pub struct StatsAggregator {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    settings: LiveSettings,
    state: Mutex<Stats>,
}

impl StatsAggregator {
    /// Load persisted stats, initializing zeros on first run. Threats are
    /// counted against the threshold current at each record.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        settings: LiveSettings,
    ) -> Self {
        let initial = match get_json::<Stats>(store.as_ref(), STATS_KEY).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                let zero = Stats::default();
                if let Err(e) = set_json(store.as_ref(), STATS_KEY, &zero).await {
                    tracing::warn!("could not persist initial stats: {:#}", e);
                }
                zero
            }
            Err(e) => {
                tracing::warn!("stored stats unreadable, starting from zero: {:#}", e);
                Stats::default()
            }
        };
        Self {
            store,
            clock,
            settings,
            state: Mutex::new(initial),
        }
    }

    /// Count one scan of `url` and persist. A failed write is logged; the
    /// updated in-memory value is returned either way.
    pub async fn record(&self, url: &str, result: &ScanResult) -> Stats {
        let mut stats = self.state.lock().await;
        let threshold = self.settings.get().risk_threshold;
        stats.apply(url, result, threshold, self.clock.now());
        let snapshot = stats.clone();
        if let Err(e) = set_json(self.store.as_ref(), STATS_KEY, &snapshot).await {
            tracing::warn!(url, "stats persistence failed: {:#}", e);
        }
        tracing::debug!(
            urls_scanned = snapshot.urls_scanned,
            threats_blocked = snapshot.threats_blocked,
            "stats updated"
        );
        snapshot
    }

    pub async fn snapshot(&self) -> Stats {
        self.state.lock().await.clone()
    }
}
