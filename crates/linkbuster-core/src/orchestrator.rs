//! Scan orchestration: cache, then remote, then the heuristic fallback.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::ResultCache;
use crate::clock::Clock;
use crate::heuristic::HeuristicScorer;
use crate::notify::ContextId;
use crate::remote::RemoteScanner;
use crate::scan::ScanResult;
use crate::url_model::ScanRequest;

/// Produces a [`ScanResult`] for any URL.
///
/// The cache lock is only held for the lookup and the insert, never across
/// the remote call, so two concurrent scans of one URL both go to the remote
/// and the later write wins.
#[derive(Debug)]
pub struct ScanOrchestrator {
    cache: Mutex<ResultCache>,
    remote: Arc<dyn RemoteScanner>,
    heuristic: HeuristicScorer,
    clock: Arc<dyn Clock>,
}

impl ScanOrchestrator {
    pub fn new(
        cache: ResultCache,
        remote: Arc<dyn RemoteScanner>,
        heuristic: HeuristicScorer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache: Mutex::new(cache),
            remote,
            heuristic,
            clock,
        }
    }

    /// Scan `raw_url`. Never fails: remote failures fall back to the heuristic.
    pub async fn scan(&self, raw_url: &str) -> ScanResult {
        self.scan_request(ScanRequest::new(raw_url, None, self.clock.now()))
            .await
    }

    /// Scan on behalf of a browsing context.
    pub async fn scan_for(&self, raw_url: &str, context: Option<ContextId>) -> ScanResult {
        self.scan_request(ScanRequest::new(raw_url, context, self.clock.now()))
            .await
    }

    async fn scan_request(&self, req: ScanRequest) -> ScanResult {
        let key = req.normalized_url.as_str();

        let cached = self.cache.lock().get(key, self.clock.now()).cloned();
        if let Some(hit) = cached {
            tracing::debug!(url = key, risk_score = hit.risk_score, "cache hit");
            return hit;
        }

        let result = match self.remote.scan(key).await {
            Ok(r) => {
                tracing::debug!(url = key, risk_score = r.risk_score, "remote scan completed");
                r
            }
            Err(e) => {
                tracing::warn!(
                    url = key,
                    kind = ?e.kind(),
                    "remote scan failed, using heuristic: {}",
                    e
                );
                self.heuristic.score(key, self.clock.now())
            }
        };

        self.cache.lock().put(key, result.clone(), self.clock.now());
        tracing::info!(
            url = key,
            context = ?req.origin_context,
            risk_score = result.risk_score,
            source = ?result.source,
            "scanned"
        );
        result
    }

    /// Drop expired cache entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let removed = self.cache.lock().sweep(self.clock.now());
        if removed > 0 {
            tracing::debug!(removed, "cache sweep");
        }
        removed
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Cached result for `raw_url` without any scanning.
    pub fn peek(&self, raw_url: &str) -> Option<ScanResult> {
        let key = crate::url_model::normalize_or_raw(raw_url);
        self.cache.lock().get(&key, self.clock.now()).cloned()
    }
}
