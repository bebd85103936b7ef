//! Request console
//!
//! Every exchange with the simulator is echoed here and to the `simulator`
//! tracing target. Only the newest entries are kept.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// One request and the answer it got
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    pub status: u16,
    pub response: Value,
}

pub struct Console {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl Console {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, entry: LogEntry) {
        info!(
            target: "simulator",
            "{} {} from {} -> {} {}",
            entry.method,
            entry.path,
            entry.source_ip.as_deref().unwrap_or("unknown"),
            entry.status,
            entry.response
        );

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
