//! Fluent builders for constructing [`Task`] values in tests.

use chrono::{DateTime, Utc};
use dex_core::model::{Task, TaskMetadata};

/// Builder for constructing `Task` instances with sensible defaults.
pub struct TaskBuilder {
    task: Task,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            task: Task {
                id: "a0000001".to_string(),
                parent_id: None,
                name: "Test task".to_string(),
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
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.task.id = id.into();
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.task.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.task.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.task.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_metadata(mut self, metadata: TaskMetadata) -> Self {
        self.task.metadata = Some(metadata);
        self
    }

    pub fn with_blocked_by(mut self, blockers: Vec<String>) -> Self {
        self.task.blocked_by = blockers;
        self
    }

    /// Marks the task completed, setting `completed_at` if not already set.
    pub fn completed(mut self, at: DateTime<Utc>) -> Self {
        self.task.completed = true;
        self.task.started_at.get_or_insert(at);
        self.task.completed_at = Some(at);
        self
    }

    pub fn started(mut self, at: DateTime<Utc>) -> Self {
        self.task.started_at = Some(at);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
