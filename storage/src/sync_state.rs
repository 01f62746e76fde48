//! `sync-state.json`: the single-field record of when a store was last
//! synced to GitHub, read by the dispatch policy to decide staleness.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dex_core::error::{DexError, Result};
use dex_core::model::SyncState;

use crate::common::{ensure_dir, io_error};

const SYNC_STATE_FILE: &str = "sync-state.json";

pub struct FileSyncStateStore {
    dir: PathBuf,
}

impl FileSyncStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SYNC_STATE_FILE)
    }

    /// Returns the default (never-synced) state when the file does not yet
    /// exist, rather than erroring — a brand-new store has simply never
    /// synced.
    pub fn load(&self) -> Result<SyncState> {
        let path = self.path();
        if !path.exists() {
            return Ok(SyncState::default());
        }
        let raw = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        serde_json::from_str(&raw).map_err(|e| DexError::DataCorruption {
            file: path.display().to_string(),
            line: 1,
            reason: e.to_string(),
        })
    }

    pub fn save(&self, state: &SyncState) -> Result<()> {
        ensure_dir(&self.dir)?;
        let path = self.path();
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| DexError::Internal(format!("failed to encode sync state: {e}")))?;
        fs::write(&path, json).map_err(|e| io_error(&path, e))
    }
}

/// Async wrapper over [`FileSyncStateStore`], mirroring the other two
/// storage modules' tokio variants.
#[async_trait]
pub trait AsyncSyncStateStore: Send + Sync {
    async fn load(&self) -> Result<SyncState>;
    async fn save(&self, state: SyncState) -> Result<()>;
}

pub struct TokioSyncStateStore {
    inner: Arc<FileSyncStateStore>,
}

impl TokioSyncStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileSyncStateStore::new(dir)),
        }
    }
}

#[async_trait]
impl AsyncSyncStateStore for TokioSyncStateStore {
    async fn load(&self) -> Result<SyncState> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.load())
            .await
            .map_err(|e| DexError::Internal(format!("load task panicked: {e}")))?
    }

    async fn save(&self, state: SyncState) -> Result<()> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.save(&state))
            .await
            .map_err(|e| DexError::Internal(format!("save task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn load_on_missing_file_returns_default() {
        let tmp = tempdir().unwrap();
        let store = FileSyncStateStore::new(tmp.path());
        assert_eq!(store.load().unwrap(), SyncState::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempdir().unwrap();
        let store = FileSyncStateStore::new(tmp.path());
        let state = SyncState {
            last_sync: Some(Utc::now()),
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }
}
