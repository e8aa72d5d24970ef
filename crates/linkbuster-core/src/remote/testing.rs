//! Scriptable remote scanner for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EmergencyAlert, RemoteError, RemoteScanner};
use crate::scan::ScanResult;

#[derive(Debug, Default)]
pub(crate) struct FakeRemote {
    /// `None` makes every scan fail with HTTP 503.
    pub scan_result: Mutex<Option<ScanResult>>,
    /// `None` makes the probe fail with a timeout.
    pub status_code: Mutex<Option<u32>>,
    pub fail_alerts: bool,
    pub scan_delay: Option<Duration>,
    pub scans: AtomicUsize,
    pub probes: AtomicUsize,
    pub alerts: Mutex<Vec<EmergencyAlert>>,
}

impl FakeRemote {
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn returning(result: ScanResult) -> Self {
        Self {
            scan_result: Mutex::new(Some(result)),
            status_code: Mutex::new(Some(200)),
            ..Self::default()
        }
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().len()
    }

    /// Wait (briefly) for fire-and-forget alerts to land.
    pub async fn wait_for_alerts(&self, n: usize) -> usize {
        for _ in 0..100 {
            if self.alert_count() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.alert_count()
    }
}

#[async_trait]
impl RemoteScanner for FakeRemote {
    async fn scan(&self, _url: &str) -> Result<ScanResult, RemoteError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.scan_delay {
            tokio::time::sleep(d).await;
        }
        let scripted = self.scan_result.lock().clone();
        scripted.ok_or(RemoteError::Http(503))
    }

    async fn status(&self) -> Result<u32, RemoteError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let code = *self.status_code.lock();
        code.ok_or(RemoteError::Timeout(Duration::from_secs(5)))
    }

    async fn emergency_alert(&self, alert: &EmergencyAlert) -> Result<(), RemoteError> {
        self.alerts.lock().push(alert.clone());
        if self.fail_alerts {
            return Err(RemoteError::Http(500));
        }
        Ok(())
    }
}
