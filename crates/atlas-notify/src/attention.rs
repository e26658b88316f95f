//! Detect workspaces entering the attention subset.

use atlas_core::status::TaskStatus;
use std::collections::{HashMap, HashSet};

use crate::mapper::notice_for_entry;
use crate::types::AttentionNotice;

/// Last observed status per workspace.
///
/// A workspace produces a notice when it enters an attention status from a
/// non-attention status or from absence. Staying in attention is silent;
/// leaving and re-entering fires again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttentionMemory {
    last_seen: HashMap<String, TaskStatus>,
}

impl AttentionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one refresh worth of `(workspace, status)` pairs, given in
    /// display order.
    ///
    /// Memory is always updated and workspaces missing from `current` are
    /// forgotten. Notices are only produced when `alerts_enabled` is set.
    pub fn observe<'a, I>(&mut self, current: I, alerts_enabled: bool) -> Vec<AttentionNotice>
    where
        I: IntoIterator<Item = (&'a str, TaskStatus)>,
    {
        let mut notices = Vec::new();
        let mut seen: HashSet<&'a str> = HashSet::new();

        for (workspace, status) in current {
            let first_this_tick = seen.insert(workspace);
            let previous = self.last_seen.insert(workspace.to_string(), status);
            if !first_this_tick || !status.needs_attention() {
                continue;
            }

            let entered = previous.map_or(true, |prev| !prev.needs_attention());
            if entered && alerts_enabled {
                tracing::debug!(workspace, %status, "workspace entered attention");
                notices.push(notice_for_entry(workspace, status));
            }
        }

        self.last_seen
            .retain(|workspace, _| seen.contains(workspace.as_str()));
        notices
    }

    pub fn last_status(&self, workspace: &str) -> Option<TaskStatus> {
        self.last_seen.get(workspace).copied()
    }

    pub fn contains(&self, workspace: &str) -> bool {
        self.last_seen.contains_key(workspace)
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}
