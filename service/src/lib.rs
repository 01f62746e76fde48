//! The transactional façade over storage: task CRUD, graph queries and
//! archival, each mutation optionally followed by a [`SyncHook`] dispatch.

pub mod archival;
pub mod github_hook;
pub mod import;
pub mod task_service;

pub use archival::{can_archive, compact, Archiver, BulkCriteria};
pub use github_hook::GithubSyncHook;
pub use import::{materialize, Importer};
pub use task_service::{
    CreateInput, ListFilters, NoopSyncHook, SyncHook, TaskService, TaskView, UpdateInput,
};
