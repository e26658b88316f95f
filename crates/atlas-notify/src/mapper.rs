//! Map attention transitions to notices.

use atlas_core::status::TaskStatus;
use chrono::Utc;

use crate::types::AttentionNotice;

fn status_headline(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::ValidationFailed => "validation failed",
        TaskStatus::AwaitingApproval => "ready for approval",
        TaskStatus::GhFailed => "GitHub operation failed",
        TaskStatus::CiFailed => "CI failed",
        TaskStatus::CiTimeout => "CI timed out",
        _ => "status changed",
    }
}

/// Build the notice for a workspace that entered `status`.
pub fn notice_for_entry(workspace: &str, status: TaskStatus) -> AttentionNotice {
    let suggested_command = status.suggested_command(workspace);
    let body = match &suggested_command {
        Some(command) => format!("{workspace} is {status}. Run: {command}"),
        None => format!("{workspace} is {status}."),
    };
    AttentionNotice {
        at: Utc::now(),
        workspace: workspace.to_string(),
        status,
        title: format!("{workspace}: {}", status_headline(status)),
        body,
        suggested_command,
    }
}
