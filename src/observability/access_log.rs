//! Per-request access log entries.
//!
//! An entry is created when a request enters the dispatcher, accumulates
//! diagnostic fields through dispatch, and is published on a broadcast
//! channel when the response goes out. The debug sidecar subscribes to
//! the channel; with no subscribers, emission is a no-op.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

/// Diagnostic record for one request.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub timestamp: String,
    pub method: String,
    pub path: String,
    /// Resolved action identifier, once routing has run.
    pub action: Option<String>,
    /// Bound upstream URL, once the action was bound.
    pub upstream_url: Option<String>,
    pub status: u16,
    pub duration_ms: u64,
}

impl AccessLogEntry {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            method: method.into(),
            path: path.into(),
            action: None,
            upstream_url: None,
            status: 0,
            duration_ms: 0,
        }
    }
}

/// Publisher for finished access log entries.
#[derive(Clone)]
pub struct AccessLogSink {
    tx: broadcast::Sender<AccessLogEntry>,
}

impl AccessLogSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Subscribe to emitted entries.
    pub fn subscribe(&self) -> broadcast::Receiver<AccessLogEntry> {
        self.tx.subscribe()
    }

    /// Publish a finished entry. Lagging or absent subscribers never
    /// affect the request path.
    pub fn emit(&self, entry: AccessLogEntry) {
        let _ = self.tx.send(entry);
    }
}

impl Default for AccessLogSink {
    fn default() -> Self {
        Self::new()
    }
}
