//! Local, file-backed persistence for the task graph: the active store
//! (`tasks.jsonl`), the archive log (`archive.jsonl`), the GitHub sync
//! bookkeeping (`sync-state.json`) and the directory resolution (in-repo vs.
//! centralized) that locates all three.
//!
//! # Architecture
//!
//! - [`active`] — active store, sync and async (tokio) variants
//! - [`archive`] — append-only archive log
//! - [`sync_state`] — `sync-state.json` load/save
//! - [`paths`] — store directory resolution
//! - [`common`] — shared I/O-to-`DexError` mapping

mod common;

pub mod active;
pub mod archive;
pub mod paths;
pub mod sync_state;

pub use active::{ActiveStore, AsyncActiveStore, FileActiveStore, TokioActiveStore};
pub use archive::{ArchiveLog, AsyncArchiveLog, FileArchiveLog, TokioArchiveLog};
pub use paths::{find_git_root, project_key, resolve_store_dir};
pub use sync_state::{AsyncSyncStateStore, FileSyncStateStore, TokioSyncStateStore};
