use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::deriver::FileHandle;

/// Highest percentage reported before storage has acknowledged the upload
pub const MAX_IN_FLIGHT_PERCENT: u8 = 98;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

/// Upload state of one file in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgressEntry {
    pub file: FileHandle,
    pub progress_percent: u8,
    pub status: UploadStatus,
    pub error_message: Option<String>,
    /// Transfer attempts started so far
    pub attempts: u32,
}

impl UploadProgressEntry {
    fn pending(file: FileHandle) -> Self {
        Self {
            file,
            progress_percent: 0,
            status: UploadStatus::Pending,
            error_message: None,
            attempts: 0,
        }
    }
}

/// `round(sent / total * 98)`, never above 98
pub fn in_flight_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return MAX_IN_FLIGHT_PERCENT;
    }
    let ratio = sent.min(total) as f64 / total as f64;
    let percent = (ratio * MAX_IN_FLIGHT_PERCENT as f64).round() as u8;
    percent.min(MAX_IN_FLIGHT_PERCENT)
}

/// Per-batch progress map keyed by storage key.
///
/// Every key has its own watch channel. The store keeps the receiving ends;
/// the sending end goes to the single task uploading that key.
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    entries: HashMap<String, watch::Receiver<UploadProgressEntry>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` in `pending` state and hand back the writer for it
    pub fn register(&mut self, key: &str, file: FileHandle) -> ProgressReporter {
        let (tx, rx) = watch::channel(UploadProgressEntry::pending(file));
        self.entries.insert(key.to_string(), rx);
        ProgressReporter {
            key: key.to_string(),
            tx: Arc::new(tx),
        }
    }

    pub fn get(&self, key: &str) -> Option<UploadProgressEntry> {
        self.entries.get(key).map(|rx| rx.borrow().clone())
    }

    /// Stream of updates for `key`, starting with its current state
    pub fn subscribe(&self, key: &str) -> Option<WatchStream<UploadProgressEntry>> {
        self.entries.get(key).map(|rx| WatchStream::new(rx.clone()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current state of every key
    pub fn snapshot(&self) -> HashMap<String, UploadProgressEntry> {
        self.entries
            .iter()
            .map(|(key, rx)| (key.clone(), rx.borrow().clone()))
            .collect()
    }
}

/// Write side of one key's progress entry
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    key: String,
    tx: Arc<watch::Sender<UploadProgressEntry>>,
}

impl ProgressReporter {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Enter `uploading` for attempt number `attempt`.
    ///
    /// Progress from an earlier attempt is kept so the percentage never moves
    /// backwards while uploading.
    pub fn begin_attempt(&self, attempt: u32) {
        self.tx.send_modify(|entry| {
            entry.status = UploadStatus::Uploading;
            entry.attempts = attempt;
            entry.error_message = None;
        });
    }

    pub fn advance(&self, sent: u64, total: u64) {
        let percent = in_flight_percent(sent, total);
        self.tx.send_if_modified(|entry| {
            if entry.status != UploadStatus::Uploading || percent <= entry.progress_percent {
                return false;
            }
            entry.progress_percent = percent;
            true
        });
    }

    pub fn complete(&self) {
        self.tx.send_modify(|entry| {
            entry.status = UploadStatus::Completed;
            entry.progress_percent = 100;
            entry.error_message = None;
        });
    }

    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|entry| {
            entry.status = UploadStatus::Error;
            entry.error_message = Some(message);
        });
    }
}
