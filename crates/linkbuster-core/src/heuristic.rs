//! Local fallback scorer used when the remote scoring service is unreachable.
//!
//! An ordered table of substring rules; the first rule whose pattern occurs in
//! the URL decides the score and labels. URLs that match nothing get a score
//! from a low-risk band so an unknown domain is never reported as certainly
//! safe. That band is random unless [`UnmatchedScore::Fixed`] is configured.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::scan::{ScanResult, ScanSource};

/// Confidence reported for every heuristic result.
pub const HEURISTIC_CONFIDENCE: f64 = 0.95;

/// One substring rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicRule {
    pub pattern: String,
    pub risk_score: u8,
    pub threats: Vec<String>,
}

impl HeuristicRule {
    pub fn new(pattern: &str, risk_score: u8, threats: &[&str]) -> Self {
        Self {
            pattern: pattern.to_string(),
            risk_score,
            threats: threats.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Score assigned when no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedScore {
    /// Uniformly drawn from `min..=max` on every call (non-deterministic).
    RandomBand { min: u8, max: u8 },
    /// Always the same score.
    Fixed(u8),
}

impl Default for UnmatchedScore {
    fn default() -> Self {
        UnmatchedScore::RandomBand { min: 5, max: 35 }
    }
}

#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    rules: Vec<HeuristicRule>,
    unmatched: UnmatchedScore,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new(default_rules(), UnmatchedScore::default())
    }
}

impl HeuristicScorer {
    pub fn new(rules: Vec<HeuristicRule>, unmatched: UnmatchedScore) -> Self {
        Self { rules, unmatched }
    }

    /// Built-in rules with a fixed score for unmatched URLs.
    pub fn deterministic(unmatched_score: u8) -> Self {
        Self::new(default_rules(), UnmatchedScore::Fixed(unmatched_score))
    }

    /// First rule whose pattern is a substring of `url`.
    pub fn matching_rule(&self, url: &str) -> Option<&HeuristicRule> {
        self.rules.iter().find(|r| url.contains(r.pattern.as_str()))
    }

    /// Score `url`. Never fails.
    pub fn score(&self, url: &str, now: DateTime<Utc>) -> ScanResult {
        let (risk_score, threats) = match self.matching_rule(url) {
            Some(rule) => (rule.risk_score, rule.threats.clone()),
            None => (self.unmatched_score(), Vec::new()),
        };
        ScanResult::completed(
            risk_score,
            threats,
            HEURISTIC_CONFIDENCE,
            now,
            ScanSource::Heuristic,
        )
    }

    fn unmatched_score(&self) -> u8 {
        match self.unmatched {
            UnmatchedScore::Fixed(s) => s,
            UnmatchedScore::RandomBand { min, max } => {
                let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
                rand::rng().random_range(lo..=hi)
            }
        }
    }
}

/// The built-in rule table. Order matters: `test-phishing` must precede `phish`.
pub fn default_rules() -> Vec<HeuristicRule> {
    vec![
        HeuristicRule::new(
            "test-malicious",
            95,
            &["Malware distribution", "Command & control server", "Exploit kit"],
        ),
        HeuristicRule::new(
            "test-phishing",
            85,
            &["Credential harvesting", "Impersonation attack", "Social engineering"],
        ),
        HeuristicRule::new("test-suspicious", 65, &[]),
        HeuristicRule::new(
            "malware",
            90,
            &["Trojan infection", "Ransomware payload", "Spyware component"],
        ),
        HeuristicRule::new(
            "phish",
            80,
            &["Suspicious activity", "Potential security risk", "Low reputation domain"],
        ),
        HeuristicRule::new(
            "scam",
            75,
            &["Financial fraud", "Fake services", "Advance-fee fraud"],
        ),
        HeuristicRule::new("google.com", 5, &[]),
        HeuristicRule::new("github.com", 10, &[]),
        HeuristicRule::new("wikipedia.org", 15, &[]),
        HeuristicRule::new("stackoverflow.com", 10, &[]),
    ]
}
