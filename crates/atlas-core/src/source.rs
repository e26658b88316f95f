//! Read-only access to workspace and task state.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::types::{Task, Workspace};

pub const WORKSPACES_DIR: &str = "workspaces";
pub const WORKSPACE_FILE: &str = "workspace.json";
pub const TASKS_DIR: &str = "tasks";
pub const TASK_FILE: &str = "task.json";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("workspace not found: {name}")]
    WorkspaceNotFound { name: String },
}

/// Listing capabilities the watch monitor consumes.
///
/// Implementations must be safe to call repeatedly and from several threads
/// at once; the watch loop may run a slow fetch alongside the next one.
pub trait StateSource: Send + Sync {
    fn list_workspaces(&self) -> Result<Vec<Workspace>, SourceError>;

    /// Tasks of one workspace, newest first.
    fn list_tasks(&self, workspace: &str) -> Result<Vec<Task>, SourceError>;
}

/// State source backed by the JSON files the task engine writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsStateSource {
    pub root: PathBuf,
}

impl FsStateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.root.join(WORKSPACES_DIR)
    }

    pub fn workspace_dir(&self, name: &str) -> PathBuf {
        self.workspaces_dir().join(name)
    }
}

/// A workspace name is exactly one path component under `workspaces/`.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl StateSource for FsStateSource {
    /// The directory name is the workspace identity; a differing `name` in
    /// `workspace.json` is replaced so `list_tasks` can find it again.
    fn list_workspaces(&self) -> Result<Vec<Workspace>, SourceError> {
        let dir = self.workspaces_dir();
        let mut workspaces = Vec::new();
        for entry_dir in child_dirs(&dir)? {
            let Some(dir_name) = entry_dir.file_name().and_then(|name| name.to_str()) else {
                tracing::debug!(
                    path = %entry_dir.display(),
                    "skipping non-utf8 workspace directory"
                );
                continue;
            };
            let file = entry_dir.join(WORKSPACE_FILE);
            if !file.is_file() {
                tracing::debug!(
                    path = %entry_dir.display(),
                    "skipping directory without workspace file"
                );
                continue;
            }
            let mut workspace = read_json::<Workspace>(&file)?;
            if workspace.name != dir_name {
                tracing::warn!(
                    path = %file.display(),
                    declared = %workspace.name,
                    "workspace name differs from its directory, using the directory name"
                );
                workspace.name = dir_name.to_string();
            }
            workspaces.push(workspace);
        }
        workspaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workspaces)
    }

    fn list_tasks(&self, workspace: &str) -> Result<Vec<Task>, SourceError> {
        let ws_dir = self.workspace_dir(workspace);
        if !is_plain_name(workspace) || !ws_dir.join(WORKSPACE_FILE).is_file() {
            return Err(SourceError::WorkspaceNotFound {
                name: workspace.to_string(),
            });
        }

        let mut tasks = Vec::new();
        for task_dir in child_dirs(&ws_dir.join(TASKS_DIR))? {
            let file = task_dir.join(TASK_FILE);
            if file.is_file() {
                tasks.push(read_json::<Task>(&file)?);
            }
        }
        tasks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(tasks)
    }
}

/// Subdirectories of `dir`; a missing directory has none.
fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SourceError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SourceError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let body = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| SourceError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
