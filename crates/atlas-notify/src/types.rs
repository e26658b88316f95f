use atlas_core::status::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A workspace has just entered an attention status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionNotice {
    pub at: DateTime<Utc>,
    pub workspace: String,
    pub status: TaskStatus,
    pub title: String,
    pub body: String,
    pub suggested_command: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSinkKind {
    /// ASCII BEL on the terminal
    Bell,
    /// Structured log record
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPolicy {
    pub enabled_sinks: Vec<NotificationSinkKind>,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            enabled_sinks: vec![NotificationSinkKind::Bell, NotificationSinkKind::Log],
        }
    }
}

impl NotificationPolicy {
    pub fn is_enabled(&self, kind: NotificationSinkKind) -> bool {
        self.enabled_sinks.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_to_bell_and_log() {
        let policy = NotificationPolicy::default();
        assert!(policy.is_enabled(NotificationSinkKind::Bell));
        assert!(policy.is_enabled(NotificationSinkKind::Log));
    }

    #[test]
    fn sink_kind_serializes_in_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationSinkKind::Bell).expect("serialize"),
            "\"bell\""
        );
    }

    #[test]
    fn notice_roundtrip_preserves_suggested_command() {
        let notice = AttentionNotice {
            at: Utc::now(),
            workspace: "auth".to_string(),
            status: TaskStatus::AwaitingApproval,
            title: "auth needs attention".to_string(),
            body: "awaiting_approval".to_string(),
            suggested_command: Some("atlas approve auth".to_string()),
        };
        let encoded = serde_json::to_string(&notice).expect("serialize");
        let decoded: AttentionNotice = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, notice);
    }
}
