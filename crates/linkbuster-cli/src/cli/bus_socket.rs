//! Bus socket: serves the message bus during `linkbuster run`.
//!
//! Protocol: newline-delimited JSON in both directions. Each input line is a
//! request (`{"action":"scanUrl","url":"...","id":1}`; `id` is optional and
//! echoed back). Each answer is `{"reply":"scanUrl","id":1,"response":{...}}`.
//! Surface messages (`showWarning`, `updateWarning`, `clearWarning`) are
//! written to every connection as they happen. Answers arrive in completion
//! order, not request order.

use anyhow::{Context, Result};
use linkbuster_core::bus::Request;
use linkbuster_core::service::ProtectionService;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

const OUTBOUND_CAPACITY: usize = 64;

/// Binds `path` (replacing a stale socket) and spawns the accept loop.
pub fn spawn_bus_listener(
    svc: Arc<ProtectionService>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    let _ = std::fs::remove_file(path);
    let listener =
        UnixListener::bind(path).with_context(|| format!("bind bus socket: {}", path.display()))?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    tokio::spawn(serve_connection(Arc::clone(&svc), stream));
                }
                Err(e) => tracing::debug!("bus socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve_connection(svc: Arc<ProtectionService>, stream: UnixStream) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut surface = svc.surface();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(mut line) = out_rx.recv().await {
            line.push('\n');
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        answer(&svc, line, out_tx.clone());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("bus socket read: {}", e);
                    break;
                }
            },
            msg = surface.recv() => match msg {
                Ok(msg) => match serde_json::to_string(&msg) {
                    Ok(text) => {
                        if out_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("encode surface message: {}", e),
                },
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "bus client too slow, surface messages dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    drop(out_tx);
    let _ = writer.await;
}

/// Parse one request line and answer it asynchronously on `out`.
fn answer(svc: &Arc<ProtectionService>, line: &str, out: mpsc::Sender<String>) {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            send_now(&out, json!({ "error": format!("invalid JSON: {e}") }));
            return;
        }
    };
    let id = value.get("id").cloned();
    let request: Request = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            send_now(&out, json!({ "id": id, "error": format!("unknown request: {e}") }));
            return;
        }
    };
    let action = request.action();
    let reply = svc.handle(request);
    tokio::spawn(async move {
        let Some(response) = reply.resolve().await else {
            return;
        };
        let line = json!({ "reply": action, "id": id, "response": response });
        let _ = out.send(line.to_string()).await;
    });
}

fn send_now(out: &mpsc::Sender<String>, value: Value) {
    if out.try_send(value.to_string()).is_err() {
        tracing::debug!("bus client outbound queue full, error reply dropped");
    }
}
