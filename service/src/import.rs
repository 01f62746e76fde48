//! Import (spec §4.6's reverse direction): given an issue reference,
//! fetches the issue, parses its body and materializes a root task plus
//! subtasks in the active store, remapping ids so `parent` references
//! resolve to freshly created local ids.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dex_core::error::Result;
use dex_core::ids::{self, is_valid_id, Clock};
use dex_core::model::{GithubMeta, Task, TaskMetadata, TaskStore};
use dex_storage::AsyncActiveStore;
use dex_sync::{
    parse_issue_body, parse_metadata_bool, parse_metadata_timestamp, GithubClient, Issue, IssueRef, ParsedIssue,
    RepoRef,
};

/// Materializes a parsed issue into `store`: inserts the root task (reusing
/// its embedded id when valid and either absent or `update` is set) and
/// every subtask, remapping ids so `parent` comments resolve to the ids
/// actually assigned, falling back to the root for an unresolvable parent.
/// Returns the materialized root.
pub fn materialize(
    store: &mut TaskStore,
    parsed: &ParsedIssue,
    issue: &Issue,
    repo: &RepoRef,
    update: bool,
    now: DateTime<Utc>,
) -> Task {
    let mut remap: HashMap<String, String> = HashMap::new();
    let existing_ids = |store: &TaskStore| -> HashSet<String> { store.tasks.keys().cloned().collect() };

    let embedded_root_id = parsed.root_metadata.get("id").filter(|id| is_valid_id(id));
    let root_id = match embedded_root_id {
        Some(id) if update || !store.contains(id) => id.clone(),
        _ => ids::generate_id(&existing_ids(store)),
    };
    if let Some(old) = embedded_root_id {
        remap.insert(old.clone(), root_id.clone());
    }

    let priority = parsed
        .root_metadata
        .get("priority")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let completed = parse_metadata_bool(&parsed.root_metadata, "completed");
    let created_at = parse_metadata_timestamp(&parsed.root_metadata, "created_at").unwrap_or(now);
    let existing_children = store.get(&root_id).map(|t| t.children.clone()).unwrap_or_default();

    let root = Task {
        id: root_id.clone(),
        parent_id: None,
        name: issue.title.clone(),
        description: parsed.prose.clone(),
        priority,
        completed,
        started_at: parse_metadata_timestamp(&parsed.root_metadata, "started_at"),
        completed_at: parse_metadata_timestamp(&parsed.root_metadata, "completed_at"),
        created_at,
        updated_at: parse_metadata_timestamp(&parsed.root_metadata, "updated_at").unwrap_or(now),
        result: None,
        metadata: Some(TaskMetadata {
            github: Some(GithubMeta {
                issue_number: issue.number,
                issue_url: issue.html_url.clone(),
                repo: repo.to_string(),
            }),
            commit: None,
        }),
        blocked_by: vec![],
        blocks: vec![],
        children: existing_children,
    };
    store.tasks.insert(root_id.clone(), root);

    for sub in &parsed.subtasks {
        if remap.contains_key(&sub.id) {
            continue;
        }
        let new_id = if is_valid_id(&sub.id) && (update || !store.contains(&sub.id)) {
            sub.id.clone()
        } else {
            ids::generate_id(&existing_ids(store))
        };
        remap.insert(sub.id.clone(), new_id);
    }

    for sub in &parsed.subtasks {
        let new_id = remap.get(&sub.id).expect("every subtask id was remapped above").clone();
        let parent_id = sub
            .parent_id
            .as_ref()
            .and_then(|old| remap.get(old).cloned())
            .unwrap_or_else(|| root_id.clone());

        let task = Task {
            id: new_id.clone(),
            parent_id: Some(parent_id.clone()),
            name: sub.name.clone(),
            description: sub.description.clone(),
            priority: sub.priority.unwrap_or(1),
            completed: sub.completed,
            started_at: sub.started_at,
            completed_at: sub.completed_at,
            created_at: sub.created_at.unwrap_or(now),
            updated_at: sub.updated_at.unwrap_or(now),
            result: sub.result.clone(),
            metadata: None,
            blocked_by: vec![],
            blocks: vec![],
            children: vec![],
        };
        store.tasks.insert(new_id.clone(), task);
        if let Some(parent) = store.tasks.get_mut(&parent_id) {
            if !parent.children.contains(&new_id) {
                parent.children.push(new_id.clone());
            }
        }
    }

    store.get(&root_id).cloned().expect("root was just inserted")
}

pub struct Importer {
    default_repo: RepoRef,
    token: String,
    active: Arc<dyn AsyncActiveStore>,
    clock: Arc<dyn Clock>,
}

impl Importer {
    pub fn new(default_repo: RepoRef, token: String, active: Arc<dyn AsyncActiveStore>, clock: Arc<dyn Clock>) -> Self {
        Self { default_repo, token, active, clock }
    }

    /// Fetches the issue named by `issue_ref` and materializes it. In
    /// `update` mode, an embedded root id that already exists locally is
    /// refreshed in place rather than rejected as a duplicate.
    pub async fn import(&self, issue_ref: IssueRef, update: bool) -> Result<Task> {
        let repo = issue_ref.repo.unwrap_or_else(|| self.default_repo.clone());
        let client = GithubClient::new(self.token.clone(), repo.clone());
        let issue = client.get_issue(issue_ref.number).await?;
        let body = issue.body.clone().unwrap_or_default();
        let parsed = parse_issue_body(&body);

        let mut store = self.active.load().await?;
        let root = materialize(&mut store, &parsed, &issue, &repo, update, self.clock.now());
        self.active.save(store).await?;
        Ok(root)
    }
}
