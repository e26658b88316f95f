//! Turn raw workspace and task listings into a prioritized snapshot.

use atlas_core::source::{SourceError, StateSource};
use atlas_core::status::TaskStatus;
use atlas_core::types::{Task, Workspace};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

use crate::error::RefreshError;
use crate::model::{LastKnown, Snapshot, TaskSnapshot, WorkspaceSnapshot};

pub fn task_snapshot(task: &Task) -> TaskSnapshot {
    TaskSnapshot {
        task_id: task.id.clone(),
        template: task.template.clone(),
        status: task.status,
        current_step: task.current_step.saturating_add(1),
        total_steps: task.total_steps(),
        step_name: task.current_step_name().map(str::to_string),
    }
}

/// Summarize a workspace from its tasks, newest first.
pub fn summarize_workspace(workspace: &Workspace, tasks: &[Task]) -> WorkspaceSnapshot {
    let task_snapshots: Vec<TaskSnapshot> = tasks.iter().map(task_snapshot).collect();
    let (status, current_step, total_steps, action) = match (task_snapshots.first(), tasks.first())
    {
        (Some(latest), Some(task)) => (
            latest.status,
            latest.current_step,
            latest.total_steps,
            task.action.clone(),
        ),
        _ => (TaskStatus::Pending, 0, 0, None),
    };

    WorkspaceSnapshot {
        name: workspace.name.clone(),
        branch: workspace.branch.clone(),
        status,
        task_count: task_snapshots.len(),
        tasks: task_snapshots,
        current_step,
        total_steps,
        action,
        stale: false,
    }
}

/// Summary used when a workspace's tasks could not be listed.
fn fallback_workspace(workspace: &Workspace, last_known: &LastKnown) -> WorkspaceSnapshot {
    let mut snapshot = summarize_workspace(workspace, &[]);
    if let Some(row) = last_known.get(&workspace.name) {
        snapshot.status = row.status;
        snapshot.current_step = row.current_step;
        snapshot.total_steps = row.total_steps;
        snapshot.action = row.action.clone();
    }
    snapshot.stale = true;
    snapshot
}

/// Stable sort: attention first, then active, then the rest, fetch order kept
/// within each group.
pub fn sort_by_priority(workspaces: &mut [WorkspaceSnapshot]) {
    workspaces.sort_by_key(|ws| Reverse(ws.status.priority()));
}

/// Build a snapshot, listing tasks per workspace through `list_tasks`.
///
/// A task-listing failure degrades that one workspace to its last known row,
/// or to pending with zero steps.
pub fn build_snapshot<F>(
    workspaces: &[Workspace],
    mut list_tasks: F,
    last_known: &LastKnown,
    fetched_at: DateTime<Utc>,
) -> Snapshot
where
    F: FnMut(&str) -> Result<Vec<Task>, SourceError>,
{
    let mut summaries: Vec<WorkspaceSnapshot> = workspaces
        .iter()
        .map(|workspace| match list_tasks(&workspace.name) {
            Ok(tasks) => summarize_workspace(workspace, &tasks),
            Err(err) => {
                tracing::warn!(
                    workspace = %workspace.name,
                    error = %err,
                    "task listing failed, using last known status"
                );
                fallback_workspace(workspace, last_known)
            }
        })
        .collect();
    sort_by_priority(&mut summaries);

    let rows = summaries.iter().map(WorkspaceSnapshot::to_row).collect();
    Snapshot {
        workspaces: summaries,
        rows,
        fetched_at,
    }
}

/// One complete fetch against `source`. Fails only if workspaces cannot be listed.
pub fn fetch_snapshot(
    source: &dyn StateSource,
    last_known: &LastKnown,
) -> Result<Snapshot, RefreshError> {
    let workspaces = source
        .list_workspaces()
        .map_err(|err| RefreshError::new(err.to_string()))?;
    Ok(build_snapshot(
        &workspaces,
        |name| source.list_tasks(name),
        last_known,
        Utc::now(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusRow;
    use atlas_core::types::{Step, StepStatus, TaskId};
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn mk_workspace(name: &str) -> Workspace {
        Workspace {
            name: name.to_string(),
            branch: format!("feat/{name}"),
            worktree_path: None,
            created_at: ts(),
            updated_at: None,
        }
    }

    fn mk_task(workspace: &str, id: &str, status: TaskStatus, step: usize, steps: usize) -> Task {
        Task {
            id: TaskId::new(id),
            workspace: workspace.to_string(),
            template: "feature".to_string(),
            status,
            current_step: step,
            steps: (0..steps)
                .map(|idx| Step {
                    name: format!("step-{idx}"),
                    status: StepStatus::Pending,
                })
                .collect(),
            action: None,
            created_at: ts(),
            updated_at: None,
        }
    }

    struct FakeSource {
        workspaces: Result<Vec<Workspace>, String>,
        tasks: HashMap<String, Result<Vec<Task>, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl StateSource for FakeSource {
        fn list_workspaces(&self) -> Result<Vec<Workspace>, SourceError> {
            self.workspaces.clone().map_err(|message| SourceError::Io {
                path: ".atlas/workspaces".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, message),
            })
        }

        fn list_tasks(&self, workspace: &str) -> Result<Vec<Task>, SourceError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(workspace.to_string());
            match self.tasks.get(workspace) {
                Some(Ok(tasks)) => Ok(tasks.clone()),
                Some(Err(_)) | None => Err(SourceError::WorkspaceNotFound {
                    name: workspace.to_string(),
                }),
            }
        }
    }

    #[test]
    fn workspace_without_tasks_is_pending_with_zero_steps() {
        let snapshot = summarize_workspace(&mk_workspace("auth"), &[]);
        assert_eq!(snapshot.status, TaskStatus::Pending);
        assert_eq!((snapshot.current_step, snapshot.total_steps), (0, 0));
        assert_eq!(snapshot.task_count, 0);
    }

    #[test]
    fn newest_task_drives_workspace_status_and_steps_are_one_based() {
        let tasks = vec![
            mk_task("auth", "t-2", TaskStatus::Running, 0, 7),
            mk_task("auth", "t-1", TaskStatus::Completed, 6, 7),
        ];
        let snapshot = summarize_workspace(&mk_workspace("auth"), &tasks);
        assert_eq!(snapshot.status, TaskStatus::Running);
        assert_eq!((snapshot.current_step, snapshot.total_steps), (1, 7));
        assert_eq!(snapshot.task_count, 2);
        assert_eq!(snapshot.tasks[0].task_id, TaskId::new("t-2"));
        assert_eq!(snapshot.tasks[1].current_step, 7);
        assert_eq!(snapshot.tasks[0].step_name.as_deref(), Some("step-0"));
    }

    #[test]
    fn corrupt_step_index_does_not_overflow() {
        let task = mk_task("auth", "t-1", TaskStatus::Running, usize::MAX, 3);
        assert_eq!(task_snapshot(&task).current_step, usize::MAX);
    }

    #[test]
    fn task_action_override_reaches_the_row() {
        let mut task = mk_task("docs", "t-1", TaskStatus::Completed, 2, 3);
        task.action = Some("atlas merge docs".to_string());
        let snapshot = summarize_workspace(&mk_workspace("docs"), &[task]);
        assert_eq!(snapshot.to_row().action.as_deref(), Some("atlas merge docs"));
    }

    #[test]
    fn priority_sort_is_stable() {
        let statuses = [
            ("a", TaskStatus::Completed),
            ("b", TaskStatus::Running),
            ("c", TaskStatus::CiFailed),
            ("d", TaskStatus::Pending),
            ("e", TaskStatus::AwaitingApproval),
            ("f", TaskStatus::Validating),
        ];
        let workspaces: Vec<Workspace> = statuses.iter().map(|(n, _)| mk_workspace(n)).collect();
        let lookup: HashMap<&str, TaskStatus> = statuses.iter().copied().collect();

        let order = |snapshot: &Snapshot| -> Vec<String> {
            snapshot.rows.iter().map(|r| r.workspace.clone()).collect()
        };
        let build = || {
            build_snapshot(
                &workspaces,
                |name| Ok(vec![mk_task(name, "t", lookup[name], 0, 1)]),
                &HashMap::new(),
                ts(),
            )
        };

        let first = build();
        assert_eq!(order(&first), vec!["c", "e", "b", "f", "a", "d"]);
        for _ in 0..5 {
            assert_eq!(order(&build()), order(&first));
        }
    }

    #[test]
    fn task_listing_failure_falls_back_to_last_known_row() {
        let workspaces = vec![mk_workspace("auth"), mk_workspace("api")];
        let mut last_known = HashMap::new();
        last_known.insert(
            "auth".to_string(),
            StatusRow {
                workspace: "auth".to_string(),
                branch: "feat/auth".to_string(),
                status: TaskStatus::AwaitingApproval,
                current_step: 4,
                total_steps: 6,
                action: None,
                stale: false,
            },
        );

        let snapshot = build_snapshot(
            &workspaces,
            |_| {
                Err(SourceError::WorkspaceNotFound {
                    name: "x".to_string(),
                })
            },
            &last_known,
            ts(),
        );

        assert_eq!(snapshot.rows.len(), 2);
        let auth = &snapshot.workspaces[0];
        assert_eq!(auth.name, "auth");
        assert!(auth.stale);
        assert!(snapshot.rows[0].stale);
        assert_eq!(auth.status, TaskStatus::AwaitingApproval);
        assert_eq!((auth.current_step, auth.total_steps), (4, 6));

        let api = &snapshot.workspaces[1];
        assert_eq!(api.status, TaskStatus::Pending);
        assert_eq!((api.current_step, api.total_steps), (0, 0));
    }

    #[test]
    fn fetch_snapshot_tolerates_partial_failures() {
        let mut tasks = HashMap::new();
        tasks.insert(
            "auth".to_string(),
            Ok(vec![mk_task("auth", "t-1", TaskStatus::Running, 1, 4)]),
        );
        tasks.insert("api".to_string(), Err("boom".to_string()));
        let source = FakeSource {
            workspaces: Ok(vec![mk_workspace("api"), mk_workspace("auth")]),
            tasks,
            calls: Mutex::new(Vec::new()),
        };

        let snapshot = fetch_snapshot(&source, &HashMap::new()).expect("partial failure ok");
        assert_eq!(snapshot.rows[0].workspace, "auth");
        assert_eq!(snapshot.rows[1].workspace, "api");
        assert_eq!(snapshot.rows[1].status, TaskStatus::Pending);
        assert_eq!(
            *source.calls.lock().expect("calls lock"),
            vec!["api".to_string(), "auth".to_string()]
        );
    }

    #[test]
    fn fetch_snapshot_fails_when_workspaces_cannot_be_listed() {
        let source = FakeSource {
            workspaces: Err("permission denied".to_string()),
            tasks: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        };
        let err = fetch_snapshot(&source, &HashMap::new()).expect_err("listing failure");
        assert!(err.message.contains("permission denied"));
        assert!(source.calls.lock().expect("calls lock").is_empty());
    }
}
