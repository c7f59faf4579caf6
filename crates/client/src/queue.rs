use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::{info, warn};

use common::env::ensure_data_dir;
use common::types::VisitorSubmission;

use crate::errors::ClientError;

/// A submission captured while the server was unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedVisitor {
    pub submission: VisitorSubmission,
    pub queued_at: DateTime<Utc>,
}

impl QueuedVisitor {
    /// The submission to replay, stamped with its capture time unless it already has one.
    pub fn replay(&self) -> VisitorSubmission {
        let mut sub = self.submission.clone();
        sub.timestamp.get_or_insert(self.queued_at);
        sub
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct FlushReport {
    pub sent: usize,
    pub remaining: usize,
    pub error: Option<String>,
}

/// Offline visitor queue persisted as a JSON array.
///
/// Entries keep insertion order. A flush replays them front to back and stops at the
/// first failure, leaving that entry and everything after it queued.
#[derive(Clone)]
pub struct OfflineQueue {
    entries: Arc<Mutex<Vec<QueuedVisitor>>>,
    file_path: PathBuf,
}

impl OfflineQueue {
    /// Open the queue file, creating its directory. A missing file is an empty queue.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_data_dir(parent).await.map_err(|e| ClientError::Io(std::io::Error::other(e.to_string())))?;
        }
        let entries = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { entries: Arc::new(Mutex::new(entries)), file_path })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    async fn save(&self, entries: &[QueuedVisitor]) -> Result<(), ClientError> {
        let data = serde_json::to_vec_pretty(entries)?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.file_path).await?;
        Ok(())
    }

    pub async fn push(&self, submission: VisitorSubmission) -> Result<QueuedVisitor, ClientError> {
        let entry = QueuedVisitor { submission, queued_at: Utc::now() };
        let mut entries = self.entries.lock().await;
        entries.push(entry.clone());
        self.save(&entries).await?;
        info!(queued = entries.len(), "visitor queued offline");
        Ok(entry)
    }

    pub async fn list(&self) -> Vec<QueuedVisitor> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        let mut entries = self.entries.lock().await;
        entries.clear();
        self.save(&entries).await
    }

    /// Replay queued entries in order through `sink`.
    ///
    /// Each accepted entry is removed and the file rewritten before the next one is sent,
    /// so an interrupted flush never replays an accepted entry twice.
    pub async fn flush<F, Fut, E>(&self, mut sink: F) -> Result<FlushReport, ClientError>
    where
        F: FnMut(VisitorSubmission) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        let mut entries = self.entries.lock().await;
        let mut report = FlushReport::default();
        while let Some(front) = entries.first() {
            match sink(front.replay()).await {
                Ok(()) => {
                    entries.remove(0);
                    self.save(&entries).await?;
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(error = %e, remaining = entries.len(), "flush stopped");
                    report.error = Some(e.to_string());
                    break;
                }
            }
        }
        report.remaining = entries.len();
        Ok(report)
    }
}
