//! Minimal HTTP/1.1 stand-in for the scoring service, for integration tests.
//!
//! Answers `POST /scan` with a fixed status and body, `GET /status` with a
//! fixed status, and `POST /emergency-alert` with 200. Every request is
//! recorded so tests can assert on what was sent.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScanServerOptions {
    pub scan_status: u16,
    pub scan_body: String,
    pub status_code: u16,
    /// Sleep before answering `/scan` (simulates a slow service).
    pub scan_delay: Option<Duration>,
}

impl Default for ScanServerOptions {
    fn default() -> Self {
        Self {
            scan_status: 200,
            scan_body: r#"{"risk_score": 12, "status": "completed", "threats": [], "confidence": 0.9}"#
                .to_string(),
            status_code: 200,
            scan_delay: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ScanServer {
    /// Base URL including the `/api` prefix, e.g. "http://127.0.0.1:12345/api".
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScanServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    /// Poll (briefly) until at least `n` requests to `path` were seen.
    pub async fn wait_for(&self, path: &str, n: usize) -> usize {
        for _ in 0..200 {
            if self.count(path) >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.count(path)
    }
}

/// Starts a server in a background thread. Runs until the process exits.
pub fn start(opts: ScanServerOptions) -> ScanServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let opts = Arc::new(opts);
    let recorded = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let opts = Arc::clone(&opts);
            let recorded = Arc::clone(&recorded);
            thread::spawn(move || handle(stream, &opts, &recorded));
        }
    });
    ScanServer {
        base_url: format!("http://127.0.0.1:{}/api", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, opts: &ScanServerOptions, recorded: &Mutex<Vec<RecordedRequest>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    recorded.lock().unwrap().push(req.clone());

    let (status, body) = match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/api/scan") => {
            if let Some(d) = opts.scan_delay {
                thread::sleep(d);
            }
            (opts.scan_status, opts.scan_body.clone())
        }
        ("GET", "/api/status") => (opts.status_code, r#"{"status":"ok"}"#.to_string()),
        ("POST", "/api/emergency-alert") => (200, r#"{"received":true}"#.to_string()),
        _ => (404, String::new()),
    };
    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

/// Reads headers and a Content-Length body.
fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = find(&data, b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = std::str::from_utf8(&data[..header_end]).ok()?.to_string();
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
    let end = (header_end + content_length).min(data.len());
    let body = String::from_utf8_lossy(&data[header_end..end]).into_owned();
    Some(RecordedRequest { method, path, body })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
