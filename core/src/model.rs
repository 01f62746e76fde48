use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of work in the task graph.
///
/// Tasks form a forest via `parent_id`/`children` (at most three levels deep,
/// see [`crate::graph::depth_from_parent`]) and a separate blocking DAG via
/// `blocked_by`/`blocks`. Both edge kinds are stored on both endpoints so
/// neighbor lookups stay O(1); [`crate::graph`] keeps them in sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// 8-char id from `[0-9a-z]`, unique within a store.
    pub id: String,
    /// Parent task id; `None` for a root task.
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Lower is higher priority. `[0, 100]`, default 1.
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub completed: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub metadata: Option<TaskMetadata>,
    /// Ids that must complete before this task may start.
    #[serde(default)]
    pub blocked_by: Vec<String>,
    /// Ids this task blocks (the inverse edge of `blocked_by`).
    #[serde(default)]
    pub blocks: Vec<String>,
    /// Direct child ids (the inverse edge of `parent_id`).
    #[serde(default)]
    pub children: Vec<String>,
}

fn default_priority() -> i32 {
    1
}

/// Nested, optional metadata a task may carry about its external mirrors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitMeta>,
}

impl TaskMetadata {
    pub fn is_empty(&self) -> bool {
        self.github.is_none() && self.commit.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GithubMeta {
    pub issue_number: i64,
    pub issue_url: String,
    pub repo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitMeta {
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Task {
    /// True for a task with no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// True for a task with no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The compacted, terminal form a [`Task`] takes once archived.
///
/// Only the fields worth keeping for history survive compaction; blocking
/// edges, the parent/child derived lists and all timestamps other than
/// `completed_at` are discarded (see `dex_service::archival`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivedTask {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub result: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<TaskMetadata>,
    #[serde(default)]
    pub archived_children: Vec<ArchivedChildSummary>,
}

/// Rolled-up summary of a direct child, inlined on its archived parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivedChildSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub result: Option<String>,
}

/// The active set: an in-memory view of everything in `tasks.jsonl`,
/// keyed by id, tagged with the canonical store identifier it came from.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    pub identifier: String,
    pub tasks: HashMap<String, Task>,
}

impl TaskStore {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            tasks: HashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.tasks.keys()
    }
}

/// Per-store GitHub sync bookkeeping, persisted as `sync-state.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncState {
    pub last_sync: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(id: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            parent_id: None,
            name: "Sample".to_string(),
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
    fn root_and_leaf_predicates() {
        let mut t = sample_task("a0000001");
        assert!(t.is_root());
        assert!(t.is_leaf());

        t.parent_id = Some("p0000001".to_string());
        t.children.push("c0000001".to_string());
        assert!(!t.is_root());
        assert!(!t.is_leaf());
    }

    #[test]
    fn task_round_trips_through_json() {
        let t = sample_task("a0000001");
        let json = serde_json::to_string(&t).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn default_priority_applies_when_field_missing() {
        let json = serde_json::json!({
            "id": "a0000001",
            "parent_id": null,
            "name": "Sample",
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
            "started_at": null,
            "completed_at": null,
        });
        let t: Task = serde_json::from_value(json).unwrap();
        assert_eq!(t.priority, 1);
        assert!(!t.completed);
    }
}
