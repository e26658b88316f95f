use atlas_core::status::TaskStatus;
use atlas_core::types::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::RefreshError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub template: String,
    pub status: TaskStatus,
    /// One-based, for display.
    pub current_step: usize,
    pub total_steps: usize,
    pub step_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub name: String,
    pub branch: String,
    /// Status of the newest task, `Pending` when there is none.
    pub status: TaskStatus,
    /// Newest first.
    pub tasks: Vec<TaskSnapshot>,
    pub task_count: usize,
    pub current_step: usize,
    pub total_steps: usize,
    pub action: Option<String>,
    /// Task listing failed; status carried over from the last refresh.
    pub stale: bool,
}

impl WorkspaceSnapshot {
    pub fn to_row(&self) -> StatusRow {
        StatusRow {
            workspace: self.name.clone(),
            branch: self.branch.clone(),
            status: self.status,
            current_step: self.current_step,
            total_steps: self.total_steps,
            action: self.action.clone(),
            stale: self.stale,
        }
    }
}

/// Flattened, owned projection of a workspace used for display and alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub workspace: String,
    pub branch: String,
    pub status: TaskStatus,
    pub current_step: usize,
    pub total_steps: usize,
    pub action: Option<String>,
    /// Tasks could not be listed on the last refresh.
    #[serde(default)]
    pub stale: bool,
}

impl StatusRow {
    pub fn needs_attention(&self) -> bool {
        self.status.needs_attention()
    }
}

/// Everything the watch screen knows after one successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub workspaces: Vec<WorkspaceSnapshot>,
    pub rows: Vec<StatusRow>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Rows keyed by workspace, used as fallback for the next refresh.
    pub fn last_known(&self) -> LastKnown {
        self.rows
            .iter()
            .map(|row| (row.workspace.clone(), row.clone()))
            .collect()
    }
}

pub type LastKnown = HashMap<String, StatusRow>;

/// Outcome of one fetch cycle, tagged with the sequence it was dispatched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshResult {
    pub seq: u64,
    pub outcome: Result<Snapshot, RefreshError>,
}
