//! Scan result model shared by the orchestrator, cache, stats and bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest possible risk score.
pub const MAX_RISK_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Completed,
    Error,
}

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    Remote,
    Heuristic,
}

/// Outcome of scanning one URL.
///
/// `risk_score` is always within `0..=100`, and an `Error` status always
/// carries a zero score and no threats; the constructors enforce both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub risk_score: u8,
    pub status: ScanStatus,
    #[serde(default)]
    pub threats: Vec<String>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub source: ScanSource,
}

impl ScanResult {
    pub fn completed(
        risk_score: u8,
        threats: Vec<String>,
        confidence: f64,
        timestamp: DateTime<Utc>,
        source: ScanSource,
    ) -> Self {
        Self {
            risk_score: risk_score.min(MAX_RISK_SCORE),
            status: ScanStatus::Completed,
            threats,
            confidence: clamp_confidence(confidence),
            timestamp,
            source,
        }
    }

    pub fn error(timestamp: DateTime<Utc>, source: ScanSource) -> Self {
        Self {
            risk_score: 0,
            status: ScanStatus::Error,
            threats: Vec::new(),
            confidence: 0.0,
            timestamp,
            source,
        }
    }

    /// True when the score meets or exceeds `threshold`.
    pub fn is_high_risk(&self, threshold: u8) -> bool {
        self.risk_score >= threshold
    }
}

fn clamp_confidence(c: f64) -> f64 {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}
