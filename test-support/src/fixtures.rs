//! Standard test fixtures: a handful of common task shapes, and a helper
//! for turning a batch of tasks into a populated [`TaskStore`].

use chrono::Utc;
use dex_core::model::{Task, TaskStore};

use crate::builders::TaskBuilder;

/// A single root task with no children or blockers.
pub fn create_task(id: &str, name: &str) -> Task {
    TaskBuilder::new().with_id(id).with_name(name).build()
}

/// A child of `parent_id`.
pub fn create_subtask(id: &str, parent_id: &str, name: &str) -> Task {
    TaskBuilder::new().with_id(id).with_parent(parent_id).with_name(name).build()
}

/// A task completed at `Utc::now()`.
pub fn create_completed_task(id: &str, name: &str) -> Task {
    TaskBuilder::new().with_id(id).with_name(name).completed(Utc::now()).build()
}

/// A linear parent chain `root -> child -> grandchild -> ...` of `depth`
/// tasks, ids `c0000001`, `c0000002`, etc.
pub fn create_task_chain(depth: usize) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(depth);
    let mut parent: Option<String> = None;
    for i in 1..=depth {
        let id = format!("c{i:07}");
        let mut builder = TaskBuilder::new().with_id(id.clone()).with_name(format!("chain task {i}"));
        if let Some(p) = &parent {
            builder = builder.with_parent(p.clone());
        }
        tasks.push(builder.build());
        parent = Some(id);
    }
    wire_children(&mut tasks);
    tasks
}

/// Fixes up `children` from `parent_id` across a batch built independently
/// (the builders only set the parent side of the edge).
pub fn wire_children(tasks: &mut [Task]) {
    let parents: Vec<(usize, String)> = tasks
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.parent_id.clone().map(|p| (i, p)))
        .collect();
    for (child_idx, parent_id) in parents {
        let child_id = tasks[child_idx].id.clone();
        if let Some(parent) = tasks.iter_mut().find(|t| t.id == parent_id) {
            parent.children.push(child_id);
        }
    }
}

/// A populated `TaskStore` over `tasks`, keyed by id.
pub fn task_store_with(identifier: &str, tasks: Vec<Task>) -> TaskStore {
    let mut store = TaskStore::new(identifier);
    for task in tasks {
        store.tasks.insert(task.id.clone(), task);
    }
    store
}
