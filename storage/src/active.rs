//! The active store: `tasks.jsonl`, one [`Task`] per line, rewritten
//! wholesale on every save via a temp-file-then-rename swap so a reader
//! never observes a half-written file.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use dex_core::error::{DexError, Result};
use dex_core::model::{Task, TaskStore};
use tracing::{debug, info, warn};

use crate::common::{ensure_dir, io_error};

const ACTIVE_FILE: &str = "tasks.jsonl";
const LEGACY_FILE: &str = "tasks.json";

/// Blocking load/save of the active task set. Implementations may back onto
/// any medium; [`FileActiveStore`] is the only one the workspace ships.
pub trait ActiveStore: Send + Sync {
    fn load(&self) -> Result<TaskStore>;
    fn save(&self, store: &TaskStore) -> Result<()>;
}

/// JSONL-backed [`ActiveStore`] rooted at a single store directory
/// (resolved ahead of time by [`crate::paths::resolve_store_dir`]).
pub struct FileActiveStore {
    dir: PathBuf,
    identifier: String,
}

impl FileActiveStore {
    pub fn new(dir: impl Into<PathBuf>, identifier: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            identifier: identifier.into(),
        }
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_FILE)
    }

    fn legacy_path(&self) -> PathBuf {
        self.dir.join(LEGACY_FILE)
    }

    /// A prior single-JSON-array format (`tasks.json`) is migrated in place
    /// the first time it is found: read once, written out as JSONL, the
    /// legacy file removed. Idempotent — if `tasks.jsonl` already exists the
    /// legacy file is ignored entirely.
    fn migrate_legacy(&self) -> Result<Option<Vec<Task>>> {
        let legacy = self.legacy_path();
        if !legacy.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&legacy).map_err(|e| io_error(&legacy, e))?;
        let tasks: Vec<Task> = serde_json::from_str(&raw).map_err(|e| DexError::DataCorruption {
            file: legacy.display().to_string(),
            line: 1,
            reason: e.to_string(),
        })?;
        info!(
            store = %self.identifier,
            count = tasks.len(),
            "migrating legacy tasks.json to tasks.jsonl"
        );
        Ok(Some(tasks))
    }
}

impl ActiveStore for FileActiveStore {
    fn load(&self) -> Result<TaskStore> {
        let mut store = TaskStore::new(self.identifier.clone());

        if !self.active_path().exists() {
            if let Some(tasks) = self.migrate_legacy()? {
                for task in tasks {
                    store.tasks.insert(task.id.clone(), task);
                }
                self.save(&store)?;
                let legacy = self.legacy_path();
                if let Err(e) = fs::remove_file(&legacy) {
                    warn!(path = %legacy.display(), error = %e, "failed to remove migrated legacy file");
                }
                return Ok(store);
            }
            return Ok(store);
        }

        let path = self.active_path();
        let file = fs::File::open(&path).map_err(|e| io_error(&path, e))?;
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| io_error(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let task: Task = serde_json::from_str(&line).map_err(|e| DexError::DataCorruption {
                file: path.display().to_string(),
                line: idx + 1,
                reason: e.to_string(),
            })?;
            store.tasks.insert(task.id.clone(), task);
        }
        debug!(store = %self.identifier, count = store.tasks.len(), "loaded active store");
        Ok(store)
    }

    fn save(&self, store: &TaskStore) -> Result<()> {
        ensure_dir(&self.dir)?;
        let path = self.active_path();
        let tmp_path = self.dir.join(format!(".{ACTIVE_FILE}.tmp"));

        let mut tmp = fs::File::create(&tmp_path).map_err(|e| io_error(&tmp_path, e))?;
        let mut ids: Vec<&String> = store.tasks.keys().collect();
        ids.sort();
        for id in ids {
            let task = &store.tasks[id];
            let line = serde_json::to_string(task)
                .map_err(|e| DexError::Internal(format!("failed to encode task: {e}")))?;
            writeln!(tmp, "{line}").map_err(|e| io_error(&tmp_path, e))?;
        }
        tmp.sync_all().map_err(|e| io_error(&tmp_path, e))?;
        drop(tmp);

        fs::rename(&tmp_path, &path).map_err(|e| io_error(&path, e))?;
        debug!(store = %self.identifier, count = store.tasks.len(), "saved active store");
        Ok(())
    }
}

/// Async wrapper over [`FileActiveStore`], for callers living in an async
/// context (the sync engine, the CLI's tokio runtime). Each call hands the
/// blocking work to a dedicated thread rather than reimplementing I/O.
#[async_trait]
pub trait AsyncActiveStore: Send + Sync {
    async fn load(&self) -> Result<TaskStore>;
    async fn save(&self, store: TaskStore) -> Result<()>;
}

pub struct TokioActiveStore {
    inner: std::sync::Arc<FileActiveStore>,
}

impl TokioActiveStore {
    pub fn new(dir: impl Into<PathBuf>, identifier: impl Into<String>) -> Self {
        Self {
            inner: std::sync::Arc::new(FileActiveStore::new(dir, identifier)),
        }
    }
}

#[async_trait]
impl AsyncActiveStore for TokioActiveStore {
    async fn load(&self) -> Result<TaskStore> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.load())
            .await
            .map_err(|e| DexError::Internal(format!("load task panicked: {e}")))?
    }

    async fn save(&self, store: TaskStore) -> Result<()> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.save(&store))
            .await
            .map_err(|e| DexError::Internal(format!("save task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample(id: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            parent_id: None,
            name: "t".to_string(),
            description: String::new(),
            priority: 1,
            completed: false,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            result: None,
            metadata: None,
            blocked_by: vec![],
            blocks: vec![],
            children: vec![],
        }
    }

    #[test]
    fn load_on_missing_store_returns_empty() {
        let tmp = tempdir().unwrap();
        let store = FileActiveStore::new(tmp.path(), "proj");
        let loaded = store.load().unwrap();
        assert!(loaded.tasks.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempdir().unwrap();
        let engine = FileActiveStore::new(tmp.path(), "proj");
        let mut store = TaskStore::new("proj");
        store.tasks.insert("a0000001".to_string(), sample("a0000001"));
        store.tasks.insert("a0000002".to_string(), sample("a0000002"));
        engine.save(&store).unwrap();

        let loaded = engine.load().unwrap();
        assert_eq!(loaded.tasks.len(), 2);
        assert!(loaded.tasks.contains_key("a0000001"));
    }

    #[test]
    fn corrupt_line_reports_its_line_number() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join(ACTIVE_FILE), "{\"id\":\"a0000001\"}\nnot json\n").unwrap();
        let engine = FileActiveStore::new(tmp.path(), "proj");
        let err = engine.load().unwrap_err();
        match err {
            DexError::DataCorruption { line, .. } => assert_eq!(line, 1),
            other => panic!("expected DataCorruption, got {other:?}"),
        }
    }

    #[test]
    fn legacy_json_array_is_migrated_and_removed() {
        let tmp = tempdir().unwrap();
        let tasks = vec![sample("a0000001"), sample("a0000002")];
        fs::write(
            tmp.path().join(LEGACY_FILE),
            serde_json::to_string(&tasks).unwrap(),
        )
        .unwrap();

        let engine = FileActiveStore::new(tmp.path(), "proj");
        let loaded = engine.load().unwrap();
        assert_eq!(loaded.tasks.len(), 2);
        assert!(tmp.path().join(ACTIVE_FILE).exists());
        assert!(!tmp.path().join(LEGACY_FILE).exists());
    }

    #[tokio::test]
    async fn async_wrapper_round_trips() {
        let tmp = tempdir().unwrap();
        let engine = TokioActiveStore::new(tmp.path(), "proj");
        let mut store = TaskStore::new("proj");
        store.tasks.insert("a0000001".to_string(), sample("a0000001"));
        engine.save(store).await.unwrap();

        let loaded = engine.load().await.unwrap();
        assert_eq!(loaded.tasks.len(), 1);
    }
}
