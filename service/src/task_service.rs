//! The transactional façade over storage (spec §4.5). Every mutating
//! operation follows read store → validate → mutate in memory → write
//! store → post-commit side effects, exactly the sequencing spec §5
//! requires.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dex_core::error::{DexError, Result};
use dex_core::graph;
use dex_core::ids::{self, Clock};
use dex_core::model::{Task, TaskMetadata, TaskStore};
use dex_core::validation::TaskValidator;
use dex_storage::{AsyncActiveStore, AsyncArchiveLog};
use tracing::warn;

const MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct CreateInput {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub priority: Option<i32>,
    pub blocked_by: Option<Vec<String>>,
}

/// Partial update. Every field is `Option`-wrapped so an absent field
/// leaves the existing value untouched; `parent_id: Some(None)` clears the
/// parent, distinct from `parent_id: None` (unchanged).
#[derive(Debug, Clone, Default)]
pub struct UpdateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub parent_id: Option<Option<String>>,
    pub metadata: Option<TaskMetadata>,
    pub completed: Option<bool>,
    pub result: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub add_blocked_by: Option<Vec<String>>,
    pub remove_blocked_by: Option<Vec<String>>,
    /// CLI-level convenience: routes to [`TaskService::delete`] instead.
    pub delete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub all: bool,
    pub completed: Option<bool>,
    pub query: Option<String>,
    pub blocked: Option<bool>,
    pub ready: Option<bool>,
    pub in_progress: Option<bool>,
}

/// Either a live task or its compacted archived form, as returned by
/// [`TaskService::get_with_archive`]. Tagged by presence of `archived_at`,
/// per spec §9's "polymorphic task view".
#[derive(Debug, Clone, PartialEq)]
pub enum TaskView {
    Active(Task),
    Archived(dex_core::model::ArchivedTask),
}

/// Post-commit side effect hook, invoked after every successful mutation
/// with the fresh store and the id of the mutation's root lineage. GitHub
/// sync is the only implementation the workspace ships
/// ([`crate::github_hook::GithubSyncHook`]); failures are logged as
/// warnings and never propagate (spec §7: "do not propagate to the caller
/// of the mutating operation").
#[async_trait]
pub trait SyncHook: Send + Sync {
    async fn after_mutation(&self, store: &TaskStore, root_id: &str) -> Result<()>;
}

pub struct NoopSyncHook;

#[async_trait]
impl SyncHook for NoopSyncHook {
    async fn after_mutation(&self, _store: &TaskStore, _root_id: &str) -> Result<()> {
        Ok(())
    }
}

pub struct TaskService {
    active: Arc<dyn AsyncActiveStore>,
    archive: Arc<dyn AsyncArchiveLog>,
    clock: Arc<dyn Clock>,
    sync_hook: Arc<dyn SyncHook>,
}

impl TaskService {
    pub fn new(
        active: Arc<dyn AsyncActiveStore>,
        archive: Arc<dyn AsyncArchiveLog>,
        clock: Arc<dyn Clock>,
        sync_hook: Arc<dyn SyncHook>,
    ) -> Self {
        Self {
            active,
            archive,
            clock,
            sync_hook,
        }
    }

    fn root_of(store: &TaskStore, id: &str) -> String {
        graph::ancestors(store, id).into_iter().next().unwrap_or_else(|| id.to_string())
    }

    async fn commit(&self, store: TaskStore, affected_root: &str) -> Result<()> {
        let root = affected_root.to_string();
        let hook = self.sync_hook.clone();
        self.active.save(store.clone()).await?;
        if let Err(e) = hook.after_mutation(&store, &root).await {
            warn!(task = %root, error = %e, "post-commit GitHub sync failed");
        }
        Ok(())
    }

    pub async fn create(&self, input: CreateInput) -> Result<Task> {
        let mut store = self.active.load().await?;

        TaskValidator::validate_name(&input.name)?;
        let description = input.description.unwrap_or_default();
        TaskValidator::validate_description(&description)?;
        let priority = input.priority.unwrap_or(1);
        TaskValidator::validate_priority(priority)?;

        let id = match input.id {
            Some(id) => {
                TaskValidator::validate_id_format(&id)?;
                if store.contains(&id) {
                    return Err(DexError::already_exists(id));
                }
                id
            }
            None => {
                let existing = store.tasks.keys().cloned().collect();
                ids::generate_id(&existing)
            }
        };

        if let Some(parent_id) = &input.parent_id {
            if !store.contains(parent_id) {
                return Err(DexError::reference_missing(parent_id.clone()));
            }
            if graph::depth_from_parent(&store, parent_id) + 1 > MAX_DEPTH {
                return Err(DexError::DepthExceeded);
            }
        }

        if let Some(blockers) = &input.blocked_by {
            for blocker in blockers {
                if !store.contains(blocker) {
                    return Err(DexError::reference_missing(blocker.clone()));
                }
            }
        }

        let now = self.clock.now();
        let task = Task {
            id: id.clone(),
            parent_id: input.parent_id.clone(),
            name: input.name,
            description,
            priority,
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
        };
        store.tasks.insert(id.clone(), task);

        if let Some(parent_id) = &input.parent_id {
            graph::sync_parent_child(&mut store, &id, None, Some(parent_id))?;
        }
        if let Some(blockers) = input.blocked_by {
            for blocker in blockers {
                graph::sync_add_blocker(&mut store, &blocker, &id)?;
            }
        }

        let root = Self::root_of(&store, &id);
        self.commit(store.clone(), &root).await?;
        Ok(store.get(&id).unwrap().clone())
    }

    pub async fn update(&self, id: &str, input: UpdateInput) -> Result<Task> {
        if input.delete {
            return self.delete(id).await;
        }

        let mut store = self.active.load().await?;
        if !store.contains(id) {
            return Err(DexError::not_found(id));
        }

        if let Some(name) = &input.name {
            TaskValidator::validate_name(name)?;
        }
        if let Some(description) = &input.description {
            TaskValidator::validate_description(description)?;
        }
        if let Some(priority) = input.priority {
            TaskValidator::validate_priority(priority)?;
        }

        if let Some(new_parent) = &input.parent_id {
            match new_parent {
                Some(new_parent_id) => {
                    if new_parent_id == id || graph::is_descendant(&store, new_parent_id, id) {
                        return Err(DexError::cycle_would_form(format!(
                            "{id} cannot become a descendant of its own descendant {new_parent_id}"
                        )));
                    }
                    let new_depth = graph::depth_from_parent(&store, new_parent_id);
                    let subtree_height = graph::max_descendant_depth(&store, id);
                    if new_depth + subtree_height > MAX_DEPTH {
                        return Err(DexError::DepthExceeded);
                    }
                }
                None => {}
            }
        }

        if let Some(blockers) = &input.add_blocked_by {
            for blocker in blockers {
                if !store.contains(blocker) {
                    return Err(DexError::reference_missing(blocker.clone()));
                }
            }
        }

        let now = self.clock.now();
        {
            let task = store.tasks.get_mut(id).unwrap();
            if let Some(name) = input.name {
                task.name = name;
            }
            if let Some(description) = input.description {
                task.description = description;
            }
            if let Some(priority) = input.priority {
                task.priority = priority;
            }
            if let Some(metadata) = input.metadata {
                task.metadata = Some(metadata);
            }
            if let Some(result) = input.result {
                task.result = Some(result);
            }
            if let Some(started_at) = input.started_at {
                task.started_at = Some(started_at);
            }
            if let Some(completed) = input.completed {
                let was_completed = task.completed;
                task.completed = completed;
                if completed && !was_completed {
                    task.completed_at = Some(now);
                } else if !completed && was_completed {
                    task.completed_at = None;
                }
            }
            task.updated_at = now;
        }

        if let Some(new_parent) = input.parent_id {
            let old_parent = store.get(id).unwrap().parent_id.clone();
            graph::sync_parent_child(&mut store, id, old_parent.as_deref(), new_parent.as_deref())?;
        }
        if let Some(blockers) = input.add_blocked_by {
            for blocker in blockers {
                graph::sync_add_blocker(&mut store, &blocker, id)?;
            }
        }
        if let Some(blockers) = input.remove_blocked_by {
            for blocker in blockers {
                graph::sync_remove_blocker(&mut store, &blocker, id);
            }
        }

        let root = Self::root_of(&store, id);
        self.commit(store.clone(), &root).await?;
        Ok(store.get(id).unwrap().clone())
    }

    /// Cascades to every descendant; returns the deleted root task.
    pub async fn delete(&self, id: &str) -> Result<Task> {
        let mut store = self.active.load().await?;
        let removed = store
            .get(id)
            .cloned()
            .ok_or_else(|| DexError::not_found(id))?;

        let mut to_remove = graph::descendants(&store, id);
        to_remove.push(id.to_string());

        for removed_id in &to_remove {
            store.tasks.remove(removed_id);
        }
        for removed_id in &to_remove {
            graph::cleanup_task_references(&mut store, removed_id);
        }

        let root = removed
            .parent_id
            .clone()
            .unwrap_or_else(|| removed.id.clone());
        self.commit(store, &root).await?;
        Ok(removed)
    }

    pub async fn complete(&self, id: &str, result: String, metadata: Option<TaskMetadata>) -> Result<Task> {
        let store = self.active.load().await?;
        let task = store.get(id).ok_or_else(|| DexError::not_found(id))?;
        if graph::has_incomplete_children(&store, task) {
            return Err(DexError::precondition_failed(format!(
                "task {id} has incomplete descendants"
            )));
        }
        let started_at = if task.started_at.is_none() {
            Some(self.clock.now())
        } else {
            None
        };

        let mut input = UpdateInput {
            completed: Some(true),
            result: Some(result),
            metadata,
            ..Default::default()
        };
        input.started_at = started_at;
        self.update(id, input).await
    }

    pub async fn start(&self, id: &str, force: bool) -> Result<Task> {
        let store = self.active.load().await?;
        let task = store.get(id).ok_or_else(|| DexError::not_found(id))?;
        if task.completed {
            return Err(DexError::precondition_failed(format!(
                "task {id} is already completed"
            )));
        }
        if task.started_at.is_some() && !force {
            return Err(DexError::AlreadyStarted(id.to_string()));
        }

        self.update(
            id,
            UpdateInput {
                started_at: Some(self.clock.now()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn list(&self, filters: ListFilters) -> Result<Vec<Task>> {
        let store = self.active.load().await?;
        let mut tasks: Vec<Task> = store
            .tasks
            .values()
            .filter(|t| {
                if !filters.all {
                    let want_completed = filters.completed.unwrap_or(false);
                    if t.completed != want_completed {
                        return false;
                    }
                } else if let Some(want_completed) = filters.completed {
                    if t.completed != want_completed {
                        return false;
                    }
                }
                if let Some(query) = &filters.query {
                    let needle = query.to_lowercase();
                    let haystack = format!("{} {}", t.name, t.description).to_lowercase();
                    if !haystack.contains(&needle) {
                        return false;
                    }
                }
                if let Some(want_blocked) = filters.blocked {
                    if graph::is_blocked(&store, t) != want_blocked {
                        return false;
                    }
                }
                if let Some(want_ready) = filters.ready {
                    if graph::is_ready(&store, t) != want_ready {
                        return false;
                    }
                }
                if let Some(want_in_progress) = filters.in_progress {
                    let in_progress = t.started_at.is_some() && !t.completed;
                    if in_progress != want_in_progress {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        tasks.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(tasks)
    }

    pub async fn search(&self, query: &str, include_archive: bool) -> Result<Vec<TaskView>> {
        let mut results: Vec<TaskView> = self
            .list(ListFilters {
                all: true,
                query: Some(query.to_string()),
                ..Default::default()
            })
            .await?
            .into_iter()
            .map(TaskView::Active)
            .collect();

        if include_archive {
            let archived = self.archive.list(Some(query.to_string())).await?;
            results.extend(archived.into_iter().map(TaskView::Archived));
        }
        Ok(results)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Task>> {
        let store = self.active.load().await?;
        Ok(store.get(id).cloned())
    }

    pub async fn get_with_archive(&self, id: &str) -> Result<Option<TaskView>> {
        if let Some(task) = self.get(id).await? {
            return Ok(Some(TaskView::Active(task)));
        }
        Ok(self
            .archive
            .get_archived(id.to_string())
            .await?
            .map(TaskView::Archived))
    }

    pub async fn get_children(&self, id: &str) -> Result<Vec<Task>> {
        let store = self.active.load().await?;
        let Some(task) = store.get(id) else {
            return Err(DexError::not_found(id));
        };
        Ok(task
            .children
            .iter()
            .filter_map(|c| store.get(c).cloned())
            .collect())
    }

    pub async fn get_ancestors(&self, id: &str) -> Result<Vec<Task>> {
        let store = self.active.load().await?;
        if !store.contains(id) {
            return Err(DexError::not_found(id));
        }
        Ok(graph::ancestors(&store, id)
            .into_iter()
            .filter_map(|a| store.get(&a).cloned())
            .collect())
    }

    pub async fn get_incomplete_blockers(&self, id: &str) -> Result<Vec<Task>> {
        let store = self.active.load().await?;
        let task = store.get(id).ok_or_else(|| DexError::not_found(id))?;
        Ok(graph::incomplete_blockers(&store, task)
            .into_iter()
            .filter_map(|b| store.get(&b).cloned())
            .collect())
    }

    pub async fn get_blocked_tasks(&self, id: &str) -> Result<Vec<Task>> {
        let store = self.active.load().await?;
        let task = store.get(id).ok_or_else(|| DexError::not_found(id))?;
        Ok(task
            .blocks
            .iter()
            .filter_map(|b| store.get(b).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_core::ids::FixedClock;
    use dex_storage::{TokioActiveStore, TokioArchiveLog};
    use tempfile::tempdir;

    fn service(dir: &std::path::Path) -> TaskService {
        TaskService::new(
            Arc::new(TokioActiveStore::new(dir, "test")),
            Arc::new(TokioArchiveLog::new(dir)),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(NoopSyncHook),
        )
    }

    #[tokio::test]
    async fn s1_create_list_complete() {
        let tmp = tempdir().unwrap();
        let svc = service(tmp.path());

        let a = svc
            .create(CreateInput {
                name: "A".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let b = svc
            .create(CreateInput {
                name: "B".to_string(),
                parent_id: Some(a.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = svc.complete(&a.id, "done".to_string(), None).await.unwrap_err();
        assert!(matches!(err, DexError::PreconditionFailed(_)));

        svc.complete(&b.id, "ok".to_string(), None).await.unwrap();
        svc.complete(&a.id, "done".to_string(), None).await.unwrap();

        let all = svc.list(ListFilters { all: true, ..Default::default() }).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|t| t.completed));

        let pending = svc.list(ListFilters::default()).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn s2_blocking_round_trip() {
        let tmp = tempdir().unwrap();
        let svc = service(tmp.path());

        let a = svc.create(CreateInput { name: "A".to_string(), ..Default::default() }).await.unwrap();
        let b = svc.create(CreateInput { name: "B".to_string(), ..Default::default() }).await.unwrap();

        svc.update(
            &b.id,
            UpdateInput {
                add_blocked_by: Some(vec![a.id.clone()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let a_after = svc.get(&a.id).await.unwrap().unwrap();
        let b_after = svc.get(&b.id).await.unwrap().unwrap();
        assert_eq!(a_after.blocks, vec![b.id.clone()]);
        assert_eq!(b_after.blocked_by, vec![a.id.clone()]);

        let store = svc.active.load().await.unwrap();
        assert!(!graph::is_ready(&store, &b_after));
        assert!(graph::is_ready(&store, &a_after));

        svc.complete(&a.id, "done".to_string(), None).await.unwrap();
        let store = svc.active.load().await.unwrap();
        let b_after = svc.get(&b.id).await.unwrap().unwrap();
        assert!(graph::is_ready(&store, &b_after));
    }

    #[tokio::test]
    async fn s3_depth_cap() {
        let tmp = tempdir().unwrap();
        let svc = service(tmp.path());

        let e = svc.create(CreateInput { name: "E".to_string(), ..Default::default() }).await.unwrap();
        let t = svc
            .create(CreateInput { name: "T".to_string(), parent_id: Some(e.id.clone()), ..Default::default() })
            .await
            .unwrap();
        let s = svc
            .create(CreateInput { name: "S".to_string(), parent_id: Some(t.id.clone()), ..Default::default() })
            .await
            .unwrap();

        let err = svc
            .create(CreateInput { name: "too deep".to_string(), parent_id: Some(s.id.clone()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::DepthExceeded));
    }

    #[tokio::test]
    async fn s4_cycle_rejection() {
        let tmp = tempdir().unwrap();
        let svc = service(tmp.path());

        let a = svc.create(CreateInput { name: "A".to_string(), ..Default::default() }).await.unwrap();
        let b = svc.create(CreateInput { name: "B".to_string(), ..Default::default() }).await.unwrap();
        let c = svc.create(CreateInput { name: "C".to_string(), ..Default::default() }).await.unwrap();

        svc.update(&b.id, UpdateInput { add_blocked_by: Some(vec![a.id.clone()]), ..Default::default() })
            .await
            .unwrap();
        svc.update(&c.id, UpdateInput { add_blocked_by: Some(vec![b.id.clone()]), ..Default::default() })
            .await
            .unwrap();

        let err = svc
            .update(&a.id, UpdateInput { add_blocked_by: Some(vec![c.id.clone()]), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::CycleWouldForm(_)));
    }

    #[tokio::test]
    async fn s5_cascade_delete() {
        let tmp = tempdir().unwrap();
        let svc = service(tmp.path());

        let p = svc.create(CreateInput { name: "P".to_string(), ..Default::default() }).await.unwrap();
        let q = svc
            .create(CreateInput { name: "Q".to_string(), parent_id: Some(p.id.clone()), ..Default::default() })
            .await
            .unwrap();
        let r = svc
            .create(CreateInput { name: "R".to_string(), parent_id: Some(q.id.clone()), ..Default::default() })
            .await
            .unwrap();
        let x = svc.create(CreateInput { name: "X".to_string(), ..Default::default() }).await.unwrap();
        svc.update(&x.id, UpdateInput { add_blocked_by: Some(vec![r.id.clone()]), ..Default::default() })
            .await
            .unwrap();

        svc.delete(&p.id).await.unwrap();

        let all = svc.list(ListFilters { all: true, ..Default::default() }).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, x.id);
        assert!(all[0].blocked_by.is_empty());
    }

    #[tokio::test]
    async fn update_rejects_reparenting_into_own_descendant() {
        let tmp = tempdir().unwrap();
        let svc = service(tmp.path());
        let p = svc.create(CreateInput { name: "P".to_string(), ..Default::default() }).await.unwrap();
        let c = svc
            .create(CreateInput { name: "C".to_string(), parent_id: Some(p.id.clone()), ..Default::default() })
            .await
            .unwrap();

        let err = svc
            .update(&p.id, UpdateInput { parent_id: Some(Some(c.id.clone())), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::CycleWouldForm(_)));
    }

    #[tokio::test]
    async fn start_twice_without_force_fails() {
        let tmp = tempdir().unwrap();
        let svc = service(tmp.path());
        let a = svc.create(CreateInput { name: "A".to_string(), ..Default::default() }).await.unwrap();
        svc.start(&a.id, false).await.unwrap();
        let err = svc.start(&a.id, false).await.unwrap_err();
        assert!(matches!(err, DexError::AlreadyStarted(_)));
        svc.start(&a.id, true).await.unwrap();
    }
}
