//! The archive log: `archive.jsonl`, append-only. An id may appear more
//! than once across the file's lifetime only when a transfer was
//! interrupted between its append and the active-store rewrite that
//! follows it (spec §4.7's "Transfer" two-step); every read-side query
//! resolves that down to the most recent record per id.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dex_core::error::{DexError, Result};
use dex_core::model::ArchivedTask;
use tracing::debug;

use crate::common::{ensure_dir, io_error};

const ARCHIVE_FILE: &str = "archive.jsonl";

/// Durable, append-only storage for compacted [`ArchivedTask`] records.
pub trait ArchiveLog: Send + Sync {
    fn append_archive(&self, records: &[ArchivedTask]) -> Result<()>;
    fn list(&self, query: Option<&str>) -> Result<Vec<ArchivedTask>>;
    fn get_archived(&self, id: &str) -> Result<Option<ArchivedTask>>;
}

pub struct FileArchiveLog {
    dir: PathBuf,
}

impl FileArchiveLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(ARCHIVE_FILE)
    }

    /// Reads every record in file order, then keeps only the last
    /// occurrence of each id — "archive retains the most recent record per
    /// id; older ones are ignored" (spec §4.7).
    fn latest_by_id(&self) -> Result<Vec<ArchivedTask>> {
        let path = self.path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path).map_err(|e| io_error(&path, e))?;
        let mut latest: HashMap<String, ArchivedTask> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| io_error(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ArchivedTask =
                serde_json::from_str(&line).map_err(|e| DexError::DataCorruption {
                    file: path.display().to_string(),
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            if !latest.contains_key(&record.id) {
                order.push(record.id.clone());
            }
            latest.insert(record.id.clone(), record);
        }
        Ok(order
            .into_iter()
            .filter_map(|id| latest.remove(&id))
            .collect())
    }
}

impl ArchiveLog for FileArchiveLog {
    fn append_archive(&self, records: &[ArchivedTask]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        ensure_dir(&self.dir)?;
        let path = self.path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| DexError::Internal(format!("failed to encode archived task: {e}")))?;
            writeln!(file, "{line}").map_err(|e| io_error(&path, e))?;
        }
        file.sync_all().map_err(|e| io_error(&path, e))?;
        debug!(count = records.len(), "appended records to archive log");
        Ok(())
    }

    fn list(&self, query: Option<&str>) -> Result<Vec<ArchivedTask>> {
        let records = self.latest_by_id()?;
        match query {
            None => Ok(records),
            Some(q) => {
                let needle = q.to_lowercase();
                Ok(records
                    .into_iter()
                    .filter(|r| {
                        r.id.to_lowercase().contains(&needle)
                            || r.name.to_lowercase().contains(&needle)
                            || r.description.to_lowercase().contains(&needle)
                            || r.result.as_deref().unwrap_or("").to_lowercase().contains(&needle)
                    })
                    .collect())
            }
        }
    }

    fn get_archived(&self, id: &str) -> Result<Option<ArchivedTask>> {
        Ok(self.latest_by_id()?.into_iter().find(|r| r.id == id))
    }
}

/// Async wrapper over [`FileArchiveLog`], mirroring [`crate::active::TokioActiveStore`].
#[async_trait]
pub trait AsyncArchiveLog: Send + Sync {
    async fn append_archive(&self, records: Vec<ArchivedTask>) -> Result<()>;
    async fn list(&self, query: Option<String>) -> Result<Vec<ArchivedTask>>;
    async fn get_archived(&self, id: String) -> Result<Option<ArchivedTask>>;
}

pub struct TokioArchiveLog {
    inner: Arc<FileArchiveLog>,
}

impl TokioArchiveLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileArchiveLog::new(dir)),
        }
    }
}

#[async_trait]
impl AsyncArchiveLog for TokioArchiveLog {
    async fn append_archive(&self, records: Vec<ArchivedTask>) -> Result<()> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.append_archive(&records))
            .await
            .map_err(|e| DexError::Internal(format!("append_archive task panicked: {e}")))?
    }

    async fn list(&self, query: Option<String>) -> Result<Vec<ArchivedTask>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.list(query.as_deref()))
            .await
            .map_err(|e| DexError::Internal(format!("list task panicked: {e}")))?
    }

    async fn get_archived(&self, id: String) -> Result<Option<ArchivedTask>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.get_archived(&id))
            .await
            .map_err(|e| DexError::Internal(format!("get_archived task panicked: {e}")))?
    }
}
