//! curl-backed implementation of [`RemoteScanner`].
//!
//! Requests run on the blocking pool (`spawn_blocking`) with curl's own
//! timeout set, and the await is additionally wrapped in
//! `tokio::time::timeout` so a wedged transfer is abandoned on schedule.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::wire::{decode_scan_response, EmergencyAlert, ScanRequestBody};
use super::{RemoteError, RemoteScanner};
use crate::config::LinkbusterConfig;
use crate::scan::ScanResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

/// Raw HTTP response: status code and body bytes.
#[derive(Debug)]
struct HttpResponse {
    code: u32,
    body: Vec<u8>,
}

impl HttpResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

#[derive(Debug, Clone)]
pub struct HttpScanClient {
    base_url: String,
    scan_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpScanClient {
    pub fn new(base_url: &str, scan_timeout: Duration, probe_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            scan_timeout,
            probe_timeout,
        }
    }

    pub fn from_config(cfg: &LinkbusterConfig) -> Self {
        Self::new(&cfg.api_base_url, cfg.scan_timeout(), cfg.probe_timeout())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        budget: Duration,
    ) -> Result<HttpResponse, RemoteError> {
        let url = self.endpoint(path);
        let task = tokio::task::spawn_blocking(move || perform(method, &url, body.as_deref(), budget));
        match tokio::time::timeout(budget, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(RemoteError::Timeout(budget)),
        }
    }
}

#[async_trait]
impl RemoteScanner for HttpScanClient {
    async fn scan(&self, url: &str) -> Result<ScanResult, RemoteError> {
        let body = serde_json::to_vec(&ScanRequestBody { url })?;
        let resp = self
            .request(Method::Post, "/scan", Some(body), self.scan_timeout)
            .await?;
        if !resp.is_success() {
            return Err(RemoteError::Http(resp.code));
        }
        Ok(decode_scan_response(&resp.body, Utc::now())?)
    }

    async fn status(&self) -> Result<u32, RemoteError> {
        let resp = self
            .request(Method::Get, "/status", None, self.probe_timeout)
            .await?;
        Ok(resp.code)
    }

    async fn emergency_alert(&self, alert: &EmergencyAlert) -> Result<(), RemoteError> {
        let body = serde_json::to_vec(alert)?;
        let resp = self
            .request(Method::Post, "/emergency-alert", Some(body), self.scan_timeout)
            .await?;
        if !resp.is_success() {
            return Err(RemoteError::Http(resp.code));
        }
        Ok(())
    }
}

/// Performs one HTTP request in the current thread.
fn perform(
    method: Method,
    url: &str,
    body: Option<&[u8]>,
    budget: Duration,
) -> Result<HttpResponse, RemoteError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.connect_timeout(budget)?;
    easy.timeout(budget)?;

    let mut headers = curl::easy::List::new();
    headers.append("Accept: application/json")?;
    if method == Method::Post {
        headers.append("Content-Type: application/json")?;
        easy.post(true)?;
        easy.post_fields_copy(body.unwrap_or_default())?;
    }
    easy.http_headers(headers)?;

    let mut buf = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            buf.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform().map_err(|e| {
            if e.is_operation_timedout() {
                RemoteError::Timeout(budget)
            } else {
                RemoteError::Transport(e)
            }
        })?;
    }

    let code = easy.response_code()?;
    Ok(HttpResponse { code, body: buf })
}
