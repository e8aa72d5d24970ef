//! URL normalization and scan request modeling.
//!
//! The normalized form is `scheme://host/path`: userinfo, port, query and
//! fragment are dropped. It is the cache key and the heuristic input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::ContextId;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("invalid URL {url:?}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL has no host: {0:?}")]
    MissingHost(String),
}

/// Normalize a URL to `scheme://host/path`.
///
/// Idempotent: normalizing an already-normalized URL returns it unchanged.
pub fn normalize(raw: &str) -> Result<String, NormalizeError> {
    let parsed = url::Url::parse(raw.trim()).map_err(|source| NormalizeError::Parse {
        url: raw.to_string(),
        source,
    })?;
    let host = parsed
        .host_str()
        .ok_or_else(|| NormalizeError::MissingHost(raw.to_string()))?;
    Ok(format!("{}://{}{}", parsed.scheme(), host, parsed.path()))
}

/// Normalize, or fall back to the raw string when the URL is malformed.
pub fn normalize_or_raw(raw: &str) -> String {
    match normalize(raw) {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!("normalization failed, using raw url: {}", e);
            raw.to_string()
        }
    }
}

/// True for `http` and `https` URLs (the only ones worth scanning).
pub fn is_web_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

/// One unit of scan work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub raw_url: String,
    pub normalized_url: String,
    pub origin_context: Option<ContextId>,
    pub requested_at: DateTime<Utc>,
}

impl ScanRequest {
    pub fn new(raw_url: &str, origin_context: Option<ContextId>, requested_at: DateTime<Utc>) -> Self {
        Self {
            raw_url: raw_url.to_string(),
            normalized_url: normalize_or_raw(raw_url),
            origin_context,
            requested_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_and_fragment() {
        let n = normalize("https://example.com/login?next=/home#top").unwrap();
        assert_eq!(n, "https://example.com/login");
    }

    #[test]
    fn empty_path_becomes_root() {
        assert_eq!(normalize("https://www.google.com").unwrap(), "https://www.google.com/");
    }

    #[test]
    fn drops_port_and_userinfo_and_lowercases_host() {
        let n = normalize("http://user:pw@Example.COM:8080/a/b").unwrap();
        assert_eq!(n, "http://example.com/a/b");
    }

    #[test]
    fn normalization_is_idempotent() {
        let urls = [
            "https://example.com/",
            "https://Example.com:443/path/to?q=1#frag",
            "http://sub.domain.test/a%20b/c",
            "https://test-malicious.com/fake",
            "http://10.0.0.1:8080/x?y",
        ];
        for u in urls {
            let once = normalize(u).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {u}");
        }
    }

    #[test]
    fn malformed_url_is_error_and_raw_fallback() {
        assert!(matches!(normalize("not a url"), Err(NormalizeError::Parse { .. })));
        assert_eq!(normalize_or_raw("not a url"), "not a url");
    }

    #[test]
    fn url_without_host_is_error() {
        assert!(matches!(
            normalize("mailto:someone@example.com"),
            Err(NormalizeError::MissingHost(_))
        ));
    }

    #[test]
    fn scan_request_carries_normalized_key() {
        let req = ScanRequest::new("https://example.com/x?y=1", Some(ContextId(3)), Utc::now());
        assert_eq!(req.normalized_url, "https://example.com/x");
        assert_eq!(req.origin_context, Some(ContextId(3)));
    }

    #[test]
    fn web_url_checks() {
        assert!(is_web_url("https://a.test"));
        assert!(!is_web_url("chrome-extension://abc/popup.html"));
    }
}
