//! Workspace and task records as read from the state store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::status::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A branch plus worktree that tasks run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub branch: String,
    #[serde(default)]
    pub worktree_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// One multi-step unit of work executed inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub workspace: String,
    /// Template the task was created from (bugfix, feature, ...).
    pub template: String,
    pub status: TaskStatus,
    /// Zero-based index into `steps`.
    #[serde(default)]
    pub current_step: usize,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Explicit next action chosen by the task engine, if any.
    #[serde(default)]
    pub action: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step_name(&self) -> Option<&str> {
        self.steps
            .get(self.current_step)
            .map(|step| step.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_task(json: &str) -> Task {
        serde_json::from_str(json).expect("decode task")
    }

    #[test]
    fn task_decodes_with_optional_fields_missing() {
        let task = mk_task(
            r#"{
                "id": "task-1",
                "workspace": "auth",
                "template": "feature",
                "status": "running",
                "created_at": "2026-01-02T03:04:05Z"
            }"#,
        );
        assert_eq!(task.id, TaskId::new("task-1"));
        assert_eq!(task.current_step, 0);
        assert_eq!(task.total_steps(), 0);
        assert!(task.action.is_none());
        assert!(task.current_step_name().is_none());
    }

    #[test]
    fn current_step_name_indexes_steps() {
        let task = mk_task(
            r#"{
                "id": "task-2",
                "workspace": "api",
                "template": "bugfix",
                "status": "validating",
                "current_step": 1,
                "steps": [
                    {"name": "implement", "status": "completed"},
                    {"name": "validate", "status": "running"},
                    {"name": "commit"}
                ],
                "created_at": "2026-01-02T03:04:05Z"
            }"#,
        );
        assert_eq!(task.total_steps(), 3);
        assert_eq!(task.current_step_name(), Some("validate"));
        assert_eq!(task.steps[2].status, StepStatus::Pending);
    }

    #[test]
    fn task_id_serializes_transparently() {
        let json = serde_json::to_string(&TaskId::new("t-9")).expect("serialize");
        assert_eq!(json, "\"t-9\"");
    }
}
