//! JSON bodies exchanged with the scoring service.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scan::{ScanResult, ScanSource};

/// Confidence assumed when the service omits it.
const DEFAULT_REMOTE_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Serialize)]
pub(super) struct ScanRequestBody<'a> {
    pub url: &'a str,
}

/// Body of `POST /emergency-alert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub url: String,
    pub risk_score: u8,
    pub threats: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl EmergencyAlert {
    pub fn from_result(url: &str, result: &ScanResult, now: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            risk_score: result.risk_score,
            threats: result.threats.clone(),
            timestamp: now,
        }
    }
}

/// Loose shape of a scan response; the service is not trusted to keep
/// scores in range or to send every field.
#[derive(Debug, Deserialize)]
struct ScanResponseBody {
    risk_score: f64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    threats: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Decode a 2xx `POST /scan` body into a [`ScanResult`] with `source = remote`.
pub fn decode_scan_response(
    body: &[u8],
    received_at: DateTime<Utc>,
) -> Result<ScanResult, serde_json::Error> {
    let raw: ScanResponseBody = serde_json::from_slice(body)?;
    let timestamp = raw
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(received_at);

    let is_error = raw
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("error"));
    if is_error {
        return Ok(ScanResult::error(timestamp, ScanSource::Remote));
    }

    let score = if raw.risk_score.is_finite() {
        raw.risk_score.round().clamp(0.0, 100.0) as u8
    } else {
        0
    };
    Ok(ScanResult::completed(
        score,
        raw.threats,
        raw.confidence.unwrap_or(DEFAULT_REMOTE_CONFIDENCE),
        timestamp,
        ScanSource::Remote,
    ))
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanStatus;

    #[test]
    fn decodes_full_response() {
        let body = br#"{
            "risk_score": 88,
            "status": "completed",
            "threats": ["Credential harvesting"],
            "confidence": 0.8,
            "timestamp": "2024-05-01T12:00:00Z",
            "source": "remote"
        }"#;
        let r = decode_scan_response(body, Utc::now()).unwrap();
        assert_eq!(r.risk_score, 88);
        assert_eq!(r.status, ScanStatus::Completed);
        assert_eq!(r.threats, vec!["Credential harvesting".to_string()]);
        assert_eq!(r.confidence, 0.8);
        assert_eq!(r.source, ScanSource::Remote);
        assert_eq!(r.timestamp.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn tolerates_extra_fields_and_naive_timestamp() {
        let body = br#"{
            "url": "https://x.test/",
            "risk_score": 42.6,
            "status": "Suspicious",
            "insights": ["a"],
            "badge_text": "?",
            "timestamp": "2024-05-01T12:00:00.123456"
        }"#;
        let now = Utc::now();
        let r = decode_scan_response(body, now).unwrap();
        assert_eq!(r.risk_score, 43);
        assert_eq!(r.status, ScanStatus::Completed);
        assert!(r.threats.is_empty());
        assert_eq!(r.confidence, DEFAULT_REMOTE_CONFIDENCE);
        assert_ne!(r.timestamp, now);
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let r = decode_scan_response(br#"{"risk_score": 140}"#, Utc::now()).unwrap();
        assert_eq!(r.risk_score, 100);
        let r = decode_scan_response(br#"{"risk_score": -3}"#, Utc::now()).unwrap();
        assert_eq!(r.risk_score, 0);
    }

    #[test]
    fn error_status_is_coerced_to_invariant() {
        let body = br#"{"risk_score": 90, "status": "error", "threats": ["x"]}"#;
        let r = decode_scan_response(body, Utc::now()).unwrap();
        assert_eq!(r.status, ScanStatus::Error);
        assert_eq!(r.risk_score, 0);
        assert!(r.threats.is_empty());
    }

    #[test]
    fn missing_score_is_decode_error() {
        assert!(decode_scan_response(br#"{"error": "No URL provided"}"#, Utc::now()).is_err());
        assert!(decode_scan_response(b"<html>", Utc::now()).is_err());
    }

    #[test]
    fn emergency_alert_body_shape() {
        let result = ScanResult::completed(
            95,
            vec!["Exploit kit".into()],
            0.95,
            Utc::now(),
            ScanSource::Heuristic,
        );
        let alert = EmergencyAlert::from_result("https://bad.test/", &result, Utc::now());
        let v = serde_json::to_value(&alert).unwrap();
        assert_eq!(v["url"], "https://bad.test/");
        assert_eq!(v["risk_score"], 95);
        assert_eq!(v["threats"][0], "Exploit kit");
        assert!(v["timestamp"].is_string());
    }
}
