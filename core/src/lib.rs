//! Foundational domain types for the task graph: the task/archived-task
//! model, the error taxonomy, pure graph invariants, id/clock generation,
//! field validation and the shared config schema. Every other crate in the
//! workspace depends on the types defined here; this crate has no I/O of
//! its own.
//!
//! # Architecture
//!
//! - [`model`] — `Task`, `ArchivedTask`, `TaskStore`, `SyncState`
//! - [`error`] — `DexError` and `Result`
//! - [`graph`] — ancestors/descendants/cycle/readiness and edge maintenance
//! - [`ids`] — id generation and the injectable [`ids::Clock`]
//! - [`validation`] — field-level checks independent of graph state
//! - [`duration`] — duration string parsing for config and bulk archival
//! - [`config`] — the `[storage]`/`[sync]` TOML schema

pub mod config;
pub mod duration;
pub mod error;
pub mod graph;
pub mod ids;
pub mod model;
pub mod validation;

pub use error::{DexError, Result};
pub use ids::{Clock, FixedClock, SystemClock};
pub use model::{
    ArchivedChildSummary, ArchivedTask, CommitMeta, GithubMeta, SyncState, Task, TaskMetadata,
    TaskStore,
};
pub use validation::TaskValidator;

/// Current version of the core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
