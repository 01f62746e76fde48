//! The archival compactor: eligibility, compaction and the two-step
//! active-to-archive transfer (spec §4.7).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dex_core::error::{DexError, Result};
use dex_core::graph;
use dex_core::model::{ArchivedChildSummary, ArchivedTask, Task, TaskStore};
use dex_storage::{AsyncActiveStore, AsyncArchiveLog};
use tracing::info;

const DEFAULT_MIN_AGE_DAYS: i64 = 90;
const DEFAULT_KEEP_RECENT_COUNT: usize = 50;

/// A root task is archivable iff it and every descendant are completed and
/// no ancestor is incomplete — its lineage forms a closed sub-forest.
pub fn can_archive(store: &TaskStore, id: &str) -> bool {
    let Some(task) = store.get(id) else {
        return false;
    };
    if !task.completed {
        return false;
    }
    if graph::descendants(store, id)
        .iter()
        .any(|d| !store.get(d).map(|t| t.completed).unwrap_or(false))
    {
        return false;
    }
    if graph::ancestors(store, id)
        .iter()
        .any(|a| !store.get(a).map(|t| t.completed).unwrap_or(true))
    {
        return false;
    }
    true
}

/// Additional bulk/auto eligibility on top of [`can_archive`]: old enough,
/// and outside the most recently completed `keep_recent_count` tasks.
pub struct BulkCriteria {
    pub min_age_days: i64,
    pub keep_recent_count: usize,
    pub except: Vec<String>,
    pub ignore_age: bool,
}

impl Default for BulkCriteria {
    fn default() -> Self {
        Self {
            min_age_days: DEFAULT_MIN_AGE_DAYS,
            keep_recent_count: DEFAULT_KEEP_RECENT_COUNT,
            except: Vec::new(),
            ignore_age: false,
        }
    }
}

/// Selects every root eligible for bulk/auto archival, newest-completed
/// tasks kept back per `keep_recent_count`, `except` always excluded.
/// `--older-than` tasks missing `completed_at` are skipped unless
/// `ignore_age` (`--completed`) is also set.
pub fn select_bulk_eligible(store: &TaskStore, now: DateTime<Utc>, criteria: &BulkCriteria) -> Vec<String> {
    let mut completed_roots: Vec<&Task> = store
        .tasks
        .values()
        .filter(|t| t.is_root() && t.completed)
        .collect();
    completed_roots.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let recent: std::collections::HashSet<&str> = completed_roots
        .iter()
        .take(criteria.keep_recent_count)
        .map(|t| t.id.as_str())
        .collect();

    completed_roots
        .into_iter()
        .filter(|t| !criteria.except.iter().any(|id| id == &t.id))
        .filter(|t| !recent.contains(t.id.as_str()))
        .filter(|t| can_archive(store, &t.id))
        .filter(|t| {
            if criteria.ignore_age {
                return true;
            }
            match t.completed_at {
                Some(completed_at) => (now - completed_at).num_days() >= criteria.min_age_days,
                None => false,
            }
        })
        .map(|t| t.id.clone())
        .collect()
}

fn compact_child(store: &TaskStore, id: &str) -> ArchivedChildSummary {
    let task = store.get(id);
    ArchivedChildSummary {
        id: id.to_string(),
        name: task.map(|t| t.name.clone()).unwrap_or_default(),
        description: task.map(|t| t.description.clone()).unwrap_or_default(),
        result: task.and_then(|t| t.result.clone()),
    }
}

/// Maps a root task to its compacted [`ArchivedTask`], inlining direct
/// child summaries and dropping everything else (spec §4.7 "Compaction").
pub fn compact(store: &TaskStore, root: &Task, archived_at: DateTime<Utc>) -> ArchivedTask {
    ArchivedTask {
        id: root.id.clone(),
        parent_id: root.parent_id.clone(),
        name: root.name.clone(),
        description: root.description.clone(),
        result: root.result.clone(),
        completed_at: root.completed_at.unwrap_or(archived_at),
        archived_at,
        metadata: root.metadata.clone(),
        archived_children: root
            .children
            .iter()
            .map(|c| compact_child(store, c))
            .collect(),
    }
}

pub struct Archiver {
    active: Arc<dyn AsyncActiveStore>,
    archive: Arc<dyn AsyncArchiveLog>,
}

impl Archiver {
    pub fn new(active: Arc<dyn AsyncActiveStore>, archive: Arc<dyn AsyncArchiveLog>) -> Self {
        Self { active, archive }
    }

    /// Archives a single lineage rooted at `id`: compacts the root and
    /// every descendant into `ArchivedTask` records, appends them, then
    /// rewrites the active store with the lineage removed.
    pub async fn archive_lineage(&self, id: &str, now: DateTime<Utc>) -> Result<Vec<ArchivedTask>> {
        let mut store = self.active.load().await?;
        if !can_archive(&store, id) {
            return Err(DexError::precondition_failed(format!(
                "task {id} is not archivable: it, a descendant, or an ancestor is incomplete"
            )));
        }

        let mut lineage_ids = graph::descendants(&store, id);
        lineage_ids.push(id.to_string());

        let records: Vec<ArchivedTask> = lineage_ids
            .iter()
            .filter_map(|lid| store.get(lid).map(|t| compact(&store, t, now)))
            .collect();

        // Step 1: append. A crash here is recovered idempotently by
        // latest-wins dedup on the next archival attempt.
        self.archive.append_archive(records.clone()).await?;

        // Step 2: rewrite the active store with the lineage removed.
        for lid in &lineage_ids {
            store.tasks.remove(lid);
        }
        for lid in &lineage_ids {
            graph::cleanup_task_references(&mut store, lid);
        }
        self.active.save(store).await?;

        info!(root = %id, count = records.len(), "archived lineage");
        Ok(records)
    }

    /// Archives every root selected by [`select_bulk_eligible`].
    pub async fn archive_bulk(&self, now: DateTime<Utc>, criteria: &BulkCriteria) -> Result<Vec<ArchivedTask>> {
        let store = self.active.load().await?;
        let roots = select_bulk_eligible(&store, now, criteria);
        let mut all = Vec::new();
        for root in roots {
            all.extend(self.archive_lineage(&root, now).await?);
        }
        Ok(all)
    }
}
