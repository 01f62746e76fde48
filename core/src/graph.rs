//! Pure functions and edge-maintenance operations over an in-memory task set.
//!
//! Reads are full scans: stores are small (spec assumes well under 10^4
//! tasks), so there is no indexing, matching the teacher's preference for
//! plain-struct validation over a query layer.

use std::collections::HashSet;

use crate::error::{DexError, Result};
use crate::model::{Task, TaskStore};

/// Ordered list from root to the immediate parent of `id`. Empty if `id` is
/// a root or unknown.
pub fn ancestors(store: &TaskStore, id: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = store.get(id).and_then(|t| t.parent_id.clone());
    while let Some(parent_id) = current {
        let Some(parent) = store.get(&parent_id) else {
            break;
        };
        chain.push(parent_id.clone());
        current = parent.parent_id.clone();
    }
    chain.reverse();
    chain
}

/// Depth-first walk of every descendant of `id` (children, grandchildren,
/// ...). Does not include `id` itself.
pub fn descendants(store: &TaskStore, id: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack: Vec<String> = store
        .get(id)
        .map(|t| t.children.clone())
        .unwrap_or_default();
    // Preserve declaration order via a stack reversed at push time.
    stack.reverse();
    while let Some(next) = stack.pop() {
        out.push(next.clone());
        if let Some(task) = store.get(&next) {
            for child in task.children.iter().rev() {
                stack.push(child.clone());
            }
        }
    }
    out
}

/// The depth a new child of `parent_id` would occupy: the length of the
/// ancestor chain above `parent_id`, plus one for `parent_id` itself.
pub fn depth_from_parent(store: &TaskStore, parent_id: &str) -> usize {
    ancestors(store, parent_id).len() + 1
}

/// The longest chain of descendants below `id` (0 if `id` is a leaf).
pub fn max_descendant_depth(store: &TaskStore, id: &str) -> usize {
    let Some(task) = store.get(id) else {
        return 0;
    };
    task.children
        .iter()
        .map(|child| 1 + max_descendant_depth(store, child))
        .max()
        .unwrap_or(0)
}

/// True iff `a` is somewhere below `b` in the parent forest.
pub fn is_descendant(store: &TaskStore, a: &str, b: &str) -> bool {
    descendants(store, b).iter().any(|id| id == a)
}

/// Reachability check across both `blocked_by` and `blocks` edges: would
/// adding `blocked_id.blocked_by += blocker_id` close a cycle?
pub fn would_create_blocking_cycle(store: &TaskStore, blocker_id: &str, blocked_id: &str) -> bool {
    if blocker_id == blocked_id {
        return true;
    }
    // A cycle forms iff blocker_id is reachable *from* blocked_id already,
    // i.e. blocked_id (transitively) blocks blocker_id.
    let mut seen: HashSet<String> = HashSet::new();
    let mut stack = vec![blocked_id.to_string()];
    while let Some(current) = stack.pop() {
        if current == blocker_id {
            return true;
        }
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(task) = store.get(&current) {
            for next in task.blocks.iter().chain(task.blocked_by.iter()) {
                if !seen.contains(next) {
                    stack.push(next.clone());
                }
            }
        }
    }
    false
}

/// Members of `task.blocked_by` whose referent is not completed. Referents
/// that no longer exist are treated as not-blocking (dangling edges are
/// cleaned up by [`cleanup_task_references`], never silently trusted here).
pub fn incomplete_blockers(store: &TaskStore, task: &Task) -> Vec<String> {
    task.blocked_by
        .iter()
        .filter(|id| store.get(id).map(|t| !t.completed).unwrap_or(false))
        .cloned()
        .collect()
}

/// True iff any direct child of `task` is not completed.
pub fn has_incomplete_children(store: &TaskStore, task: &Task) -> bool {
    task.children
        .iter()
        .any(|id| store.get(id).map(|t| !t.completed).unwrap_or(false))
}

pub fn is_blocked(store: &TaskStore, task: &Task) -> bool {
    !incomplete_blockers(store, task).is_empty()
}

/// Pending, unblocked, with no incomplete children.
pub fn is_ready(store: &TaskStore, task: &Task) -> bool {
    !task.completed && !is_blocked(store, task) && !has_incomplete_children(store, task)
}

/// Moves `child_id` from `old_parent_id`'s `children` to `new_parent_id`'s,
/// updating `child.parent_id`. Either side may be `None` (root). Fails with
/// [`DexError::ReferenceMissing`] if `new_parent_id` does not exist.
pub fn sync_parent_child(
    store: &mut TaskStore,
    child_id: &str,
    old_parent_id: Option<&str>,
    new_parent_id: Option<&str>,
) -> Result<()> {
    if let Some(new_id) = new_parent_id {
        if !store.contains(new_id) {
            return Err(DexError::reference_missing(new_id));
        }
    }
    if let Some(old_id) = old_parent_id {
        if let Some(old) = store.tasks.get_mut(old_id) {
            old.children.retain(|id| id != child_id);
        }
    }
    if let Some(new_id) = new_parent_id {
        if let Some(new) = store.tasks.get_mut(new_id) {
            if !new.children.iter().any(|id| id == child_id) {
                new.children.push(child_id.to_string());
            }
        }
    }
    if let Some(child) = store.tasks.get_mut(child_id) {
        child.parent_id = new_parent_id.map(|s| s.to_string());
    }
    Ok(())
}

/// Adds the blocking edge `blocked_id.blocked_by += blocker_id` and its
/// inverse `blocker_id.blocks += blocked_id`. Fails with
/// [`DexError::ReferenceMissing`] if either task is absent, with
/// [`DexError::CycleWouldForm`] if the edge would close a cycle, and is a
/// no-op if the edge already exists.
pub fn sync_add_blocker(store: &mut TaskStore, blocker_id: &str, blocked_id: &str) -> Result<()> {
    if blocker_id == blocked_id {
        return Err(DexError::cycle_would_form(format!(
            "task {blocker_id} cannot block itself"
        )));
    }
    if !store.contains(blocker_id) {
        return Err(DexError::reference_missing(blocker_id));
    }
    if !store.contains(blocked_id) {
        return Err(DexError::reference_missing(blocked_id));
    }
    let already_present = store
        .get(blocked_id)
        .map(|t| t.blocked_by.iter().any(|id| id == blocker_id))
        .unwrap_or(false);
    if already_present {
        return Ok(());
    }
    if would_create_blocking_cycle(store, blocker_id, blocked_id) {
        return Err(DexError::cycle_would_form(format!(
            "{blocker_id} -> {blocked_id} would close a blocking cycle"
        )));
    }
    if let Some(blocked) = store.tasks.get_mut(blocked_id) {
        blocked.blocked_by.push(blocker_id.to_string());
    }
    if let Some(blocker) = store.tasks.get_mut(blocker_id) {
        blocker.blocks.push(blocked_id.to_string());
    }
    Ok(())
}

/// Removes the blocking edge in both directions. Idempotent: removing an
/// edge that is not present is a no-op.
pub fn sync_remove_blocker(store: &mut TaskStore, blocker_id: &str, blocked_id: &str) {
    if let Some(blocked) = store.tasks.get_mut(blocked_id) {
        blocked.blocked_by.retain(|id| id != blocker_id);
    }
    if let Some(blocker) = store.tasks.get_mut(blocker_id) {
        blocker.blocks.retain(|id| id != blocked_id);
    }
}

/// Scrubs every `children`/`blocked_by`/`blocks` reference to `id` from the
/// remaining tasks in the store. Used after deletion/archival.
pub fn cleanup_task_references(store: &mut TaskStore, id: &str) {
    for task in store.tasks.values_mut() {
        task.children.retain(|c| c != id);
        task.blocked_by.retain(|b| b != id);
        task.blocks.retain(|b| b != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: &str, parent: Option<&str>) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            parent_id: parent.map(|s| s.to_string()),
            name: id.to_string(),
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

    fn chain_store() -> TaskStore {
        // root -> mid -> leaf
        let mut store = TaskStore::new("test");
        let mut root = task("root0001", None);
        let mut mid = task("mid00001", Some("root0001"));
        let leaf = task("leaf0001", Some("mid00001"));
        root.children.push("mid00001".to_string());
        mid.children.push("leaf0001".to_string());
        store.tasks.insert(root.id.clone(), root);
        store.tasks.insert(mid.id.clone(), mid);
        store.tasks.insert(leaf.id.clone(), leaf);
        store
    }

    #[test]
    fn ancestors_root_to_parent() {
        let store = chain_store();
        assert_eq!(ancestors(&store, "leaf0001"), vec!["root0001", "mid00001"]);
        assert!(ancestors(&store, "root0001").is_empty());
    }

    #[test]
    fn descendants_depth_first() {
        let store = chain_store();
        assert_eq!(descendants(&store, "root0001"), vec!["mid00001", "leaf0001"]);
        assert!(descendants(&store, "leaf0001").is_empty());
    }

    #[test]
    fn depth_from_parent_matches_chain_length() {
        let store = chain_store();
        assert_eq!(depth_from_parent(&store, "root0001"), 1);
        assert_eq!(depth_from_parent(&store, "mid00001"), 2);
    }

    #[test]
    fn max_descendant_depth_counts_longest_chain() {
        let store = chain_store();
        assert_eq!(max_descendant_depth(&store, "root0001"), 2);
        assert_eq!(max_descendant_depth(&store, "mid00001"), 1);
        assert_eq!(max_descendant_depth(&store, "leaf0001"), 0);
    }

    #[test]
    fn is_descendant_checks_forest_membership() {
        let store = chain_store();
        assert!(is_descendant(&store, "leaf0001", "root0001"));
        assert!(!is_descendant(&store, "root0001", "leaf0001"));
    }

    #[test]
    fn blocking_cycle_detection_crosses_both_edges() {
        let mut store = TaskStore::new("test");
        store.tasks.insert("a0000001".into(), task("a0000001", None));
        store.tasks.insert("b0000001".into(), task("b0000001", None));
        store.tasks.insert("c0000001".into(), task("c0000001", None));

        sync_add_blocker(&mut store, "a0000001", "b0000001").unwrap();
        sync_add_blocker(&mut store, "b0000001", "c0000001").unwrap();

        assert!(would_create_blocking_cycle(&store, "c0000001", "a0000001"));
        let err = sync_add_blocker(&mut store, "c0000001", "a0000001").unwrap_err();
        assert!(matches!(err, DexError::CycleWouldForm(_)));
    }

    #[test]
    fn self_blocking_is_rejected() {
        let mut store = TaskStore::new("test");
        store.tasks.insert("a0000001".into(), task("a0000001", None));
        let err = sync_add_blocker(&mut store, "a0000001", "a0000001").unwrap_err();
        assert!(matches!(err, DexError::CycleWouldForm(_)));
    }

    #[test]
    fn add_remove_blocker_is_idempotent() {
        let mut store = TaskStore::new("test");
        store.tasks.insert("a0000001".into(), task("a0000001", None));
        store.tasks.insert("b0000001".into(), task("b0000001", None));

        sync_add_blocker(&mut store, "a0000001", "b0000001").unwrap();
        assert_eq!(store.get("b0000001").unwrap().blocked_by, vec!["a0000001"]);
        assert_eq!(store.get("a0000001").unwrap().blocks, vec!["b0000001"]);

        sync_remove_blocker(&mut store, "a0000001", "b0000001");
        assert!(store.get("b0000001").unwrap().blocked_by.is_empty());
        assert!(store.get("a0000001").unwrap().blocks.is_empty());

        // Removing again is a no-op, not an error.
        sync_remove_blocker(&mut store, "a0000001", "b0000001");
    }

    #[test]
    fn readiness_reflects_blockers_and_children() {
        let mut store = TaskStore::new("test");
        let mut a = task("a0000001", None);
        let mut b = task("b0000001", None);
        a.blocks.push("b0000001".to_string());
        b.blocked_by.push("a0000001".to_string());
        store.tasks.insert(a.id.clone(), a);
        store.tasks.insert(b.id.clone(), b);

        let b_task = store.get("b0000001").unwrap().clone();
        assert!(is_blocked(&store, &b_task));
        assert!(!is_ready(&store, &b_task));

        let a_task = store.get("a0000001").unwrap().clone();
        assert!(is_ready(&store, &a_task));

        // Completing A makes B ready.
        store.tasks.get_mut("a0000001").unwrap().completed = true;
        let b_task = store.get("b0000001").unwrap().clone();
        assert!(!is_blocked(&store, &b_task));
        assert!(is_ready(&store, &b_task));
    }

    #[test]
    fn sync_parent_child_rejects_missing_new_parent() {
        let mut store = TaskStore::new("test");
        store.tasks.insert("a0000001".into(), task("a0000001", None));
        let err = sync_parent_child(&mut store, "a0000001", None, Some("missing0")).unwrap_err();
        assert!(matches!(err, DexError::ReferenceMissing(_)));
    }

    #[test]
    fn sync_parent_child_moves_child_between_parents() {
        let mut store = TaskStore::new("test");
        store.tasks.insert("p1000001".into(), task("p1000001", None));
        store.tasks.insert("p2000001".into(), task("p2000001", None));
        store.tasks.insert("c0000001".into(), task("c0000001", Some("p1000001")));
        store.tasks.get_mut("p1000001").unwrap().children.push("c0000001".into());

        sync_parent_child(&mut store, "c0000001", Some("p1000001"), Some("p2000001")).unwrap();

        assert!(store.get("p1000001").unwrap().children.is_empty());
        assert_eq!(store.get("p2000001").unwrap().children, vec!["c0000001"]);
        assert_eq!(store.get("c0000001").unwrap().parent_id.as_deref(), Some("p2000001"));
    }

    #[test]
    fn cleanup_task_references_scrubs_all_edges() {
        let mut store = chain_store();
        sync_add_blocker(&mut store, "leaf0001", "mid00001").unwrap();
        cleanup_task_references(&mut store, "leaf0001");

        assert!(!store.get("mid00001").unwrap().children.contains(&"leaf0001".to_string()));
        assert!(!store.get("mid00001").unwrap().blocked_by.contains(&"leaf0001".to_string()));
    }
}
