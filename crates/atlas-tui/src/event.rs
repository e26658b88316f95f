use atlas_notify::{AttentionNotice, DispatchReport};
use crossterm::event::KeyEvent;
use std::time::Duration;

use crate::model::{LastKnown, RefreshResult};

/// Inputs to the watch loop. Every state change goes through one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchMessage {
    Tick,
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Refreshed(RefreshResult),
    NotificationFired(DispatchReport),
}

/// Side effects requested by the watch loop, executed outside of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Fetch { seq: u64, last_known: LastKnown },
    ArmTimer(Duration),
    Notify(Vec<AttentionNotice>),
    Quit,
}

impl WatchCommand {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}
