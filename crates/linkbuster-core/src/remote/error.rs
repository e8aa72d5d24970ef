//! Remote call error type and its classification for logs.

use std::time::Duration;

/// Error returned by a remote scoring call.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Curl reported an error (connection refused, DNS, reset, ...).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// Response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// The call did not finish within its budget and was abandoned.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// 2xx response whose body is not a scan result.
    #[error("decode response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The blocking request task panicked or was cancelled.
    #[error("request task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Coarse category of a [`RemoteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Timeout,
    Connection,
    Throttled,
    Http5xx(u16),
    Decode,
    Other,
}

impl RemoteError {
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            RemoteError::Timeout(_) => RemoteErrorKind::Timeout,
            RemoteError::Transport(e) => classify_curl_error(e),
            RemoteError::Http(code) => classify_http_status(*code),
            RemoteError::Decode(_) => RemoteErrorKind::Decode,
            RemoteError::Join(_) => RemoteErrorKind::Other,
        }
    }
}

/// Classify an HTTP status code.
pub fn classify_http_status(code: u32) -> RemoteErrorKind {
    match code {
        429 | 503 => RemoteErrorKind::Throttled,
        500..=599 => RemoteErrorKind::Http5xx(code as u16),
        _ => RemoteErrorKind::Other,
    }
}

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> RemoteErrorKind {
    if e.is_operation_timedout() {
        return RemoteErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return RemoteErrorKind::Connection;
    }
    RemoteErrorKind::Other
}
