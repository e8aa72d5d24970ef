//! TTL cache of the most recent scan result per normalized URL.
//!
//! The cache is process-local and small. Expired entries are treated as
//! absent by [`ResultCache::get`] even before [`ResultCache::sweep`] removes
//! them; the sweep only bounds memory.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::scan::ScanResult;

/// Default lifetime of a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub result: ScanResult,
    pub inserted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    ttl: chrono::Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Live result for `key`, if any.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<&ScanResult> {
        self.entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| &e.result)
    }

    /// Insert or overwrite the entry for `key`.
    pub fn put(&mut self, key: &str, result: ScanResult, now: DateTime<Utc>) {
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                result,
                inserted_at: now,
                expires_at,
            },
        );
    }

    /// Remove every entry with `expires_at <= now`. Returns how many were removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(now));
        before - self.entries.len()
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Physical entry count, including expired entries not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanSource;

    fn result(score: u8, at: DateTime<Utc>) -> ScanResult {
        ScanResult::completed(score, vec![], 0.9, at, ScanSource::Remote)
    }

    #[test]
    fn get_before_expiry_hits() {
        let t0 = Utc::now();
        let mut cache = ResultCache::default();
        cache.put("https://example.com/", result(10, t0), t0);
        let hit = cache.get("https://example.com/", t0 + chrono::Duration::seconds(299));
        assert_eq!(hit.map(|r| r.risk_score), Some(10));
    }

    #[test]
    fn get_at_or_after_expiry_misses() {
        let t0 = Utc::now();
        let mut cache = ResultCache::default();
        cache.put("https://example.com/", result(10, t0), t0);
        assert!(cache.get("https://example.com/", t0 + chrono::Duration::seconds(300)).is_none());
        assert!(cache.get("https://example.com/", t0 + chrono::Duration::seconds(301)).is_none());
        // Still physically present until swept.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_overwrites_and_resets_expiry() {
        let t0 = Utc::now();
        let mut cache = ResultCache::default();
        cache.put("k", result(10, t0), t0);
        let t1 = t0 + chrono::Duration::seconds(200);
        cache.put("k", result(80, t1), t1);
        assert_eq!(cache.len(), 1);
        let later = t0 + chrono::Duration::seconds(400);
        assert_eq!(cache.get("k", later).map(|r| r.risk_score), Some(80));
        let entry = cache.entry("k").unwrap();
        assert_eq!(entry.inserted_at, t1);
        assert_eq!(entry.expires_at, t1 + chrono::Duration::seconds(300));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let t0 = Utc::now();
        let mut cache = ResultCache::new(Duration::from_secs(60));
        cache.put("old", result(1, t0), t0);
        let t1 = t0 + chrono::Duration::seconds(30);
        cache.put("new", result(2, t1), t1);

        let removed = cache.sweep(t0 + chrono::Duration::seconds(60));
        assert_eq!(removed, 1);
        assert!(cache.entry("old").is_none());
        assert!(cache.entry("new").is_some());

        assert_eq!(cache.sweep(t0 + chrono::Duration::seconds(61)), 0);
        assert_eq!(cache.sweep(t1 + chrono::Duration::seconds(60)), 1);
        assert!(cache.is_empty());
    }
}
