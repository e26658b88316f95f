//! Task lifecycle states and their watch-relevant classification.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a task, as recorded by the task engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but no step has started yet
    #[default]
    Pending,
    /// A step is executing
    Running,
    /// Validation commands are executing
    Validating,
    /// Validation finished with failures
    ValidationFailed,
    /// Every step finished, a human must approve or reject
    AwaitingApproval,
    Completed,
    Rejected,
    Abandoned,
    /// Push or PR creation against GitHub failed
    GhFailed,
    CiFailed,
    CiTimeout,
}

/// All statuses, in lifecycle order.
pub const ALL_STATUSES: [TaskStatus; 11] = [
    TaskStatus::Pending,
    TaskStatus::Running,
    TaskStatus::Validating,
    TaskStatus::ValidationFailed,
    TaskStatus::AwaitingApproval,
    TaskStatus::Completed,
    TaskStatus::Rejected,
    TaskStatus::Abandoned,
    TaskStatus::GhFailed,
    TaskStatus::CiFailed,
    TaskStatus::CiTimeout,
];

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Validating => "validating",
            TaskStatus::ValidationFailed => "validation_failed",
            TaskStatus::AwaitingApproval => "awaiting_approval",
            TaskStatus::Completed => "completed",
            TaskStatus::Rejected => "rejected",
            TaskStatus::Abandoned => "abandoned",
            TaskStatus::GhFailed => "gh_failed",
            TaskStatus::CiFailed => "ci_failed",
            TaskStatus::CiTimeout => "ci_timeout",
        }
    }

    /// Returns true if the status requires a human to act.
    ///
    /// The set is closed: validation failures, pending approval, and the
    /// three GitHub/CI failure states.
    pub fn needs_attention(self) -> bool {
        matches!(
            self,
            TaskStatus::ValidationFailed
                | TaskStatus::AwaitingApproval
                | TaskStatus::GhFailed
                | TaskStatus::CiFailed
                | TaskStatus::CiTimeout
        )
    }

    /// Returns true if the task engine is currently working on the task.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Running | TaskStatus::Validating)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Rejected | TaskStatus::Abandoned
        )
    }

    /// Display priority: attention (2) above active (1) above everything else (0).
    pub fn priority(self) -> u8 {
        if self.needs_attention() {
            2
        } else if self.is_active() {
            1
        } else {
            0
        }
    }

    /// The command a human should run next for an attention status.
    pub fn suggested_command(self, workspace: &str) -> Option<String> {
        match self {
            TaskStatus::AwaitingApproval => Some(format!("atlas approve {workspace}")),
            status if status.needs_attention() => Some(format!("atlas resume {workspace}")),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("invalid task status '{value}'"))
    }
}
