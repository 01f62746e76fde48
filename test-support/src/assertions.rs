//! Custom assertion helpers for task-graph tests.

use dex_core::model::Task;

/// Asserts two tasks are equal ignoring their timestamp fields, useful when
/// comparing a freshly-loaded task against one built with a fixed clock.
pub fn assert_task_equals_ignoring_timestamps(actual: &Task, expected: &Task) {
    assert_eq!(actual.id, expected.id, "task ids don't match");
    assert_eq!(actual.parent_id, expected.parent_id, "parent ids don't match");
    assert_eq!(actual.name, expected.name, "names don't match");
    assert_eq!(actual.description, expected.description, "descriptions don't match");
    assert_eq!(actual.priority, expected.priority, "priorities don't match");
    assert_eq!(actual.completed, expected.completed, "completed flags don't match");
    assert_eq!(actual.blocked_by, expected.blocked_by, "blocked_by edges don't match");
    assert_eq!(actual.blocks, expected.blocks, "blocks edges don't match");
    assert_eq!(actual.children, expected.children, "children don't match");
}

/// Asserts that every parent/child and blocking edge in `tasks` is mirrored
/// on both endpoints, the invariant [`dex_core::graph`]'s sync helpers
/// maintain.
pub fn assert_graph_consistent(tasks: &[Task]) {
    let by_id: std::collections::HashMap<&str, &Task> =
        tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    for task in tasks {
        if let Some(parent_id) = &task.parent_id {
            let parent = by_id.get(parent_id.as_str()).unwrap_or_else(|| {
                panic!("task {} references missing parent {parent_id}", task.id)
            });
            assert!(
                parent.children.contains(&task.id),
                "parent {} is missing child {} in its children list",
                parent_id,
                task.id
            );
        }
        for blocker_id in &task.blocked_by {
            let blocker = by_id
                .get(blocker_id.as_str())
                .unwrap_or_else(|| panic!("task {} references missing blocker {blocker_id}", task.id));
            assert!(
                blocker.blocks.contains(&task.id),
                "blocker {} is missing the inverse edge to {}",
                blocker_id,
                task.id
            );
        }
    }
}
