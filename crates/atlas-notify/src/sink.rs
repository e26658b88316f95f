use atlas_core::output::SharedWriter;

use crate::error::NotifyError;
use crate::types::{AttentionNotice, NotificationPolicy, NotificationSinkKind};

pub const BELL: u8 = 0x07;

pub trait NotificationSink: Send + Sync {
    fn kind(&self) -> NotificationSinkKind;
    fn send(&self, notice: &AttentionNotice) -> Result<(), NotifyError>;

    /// Deliver the notices of one refresh.
    fn send_batch(&self, notices: &[AttentionNotice]) -> Result<(), NotifyError> {
        for notice in notices {
            self.send(notice)?;
        }
        Ok(())
    }
}

/// Rings the terminal bell through the shared output writer.
#[derive(Debug, Clone)]
pub struct BellSink {
    writer: SharedWriter,
}

impl BellSink {
    pub fn new(writer: SharedWriter) -> Self {
        Self { writer }
    }

    fn ring(&self) -> Result<(), NotifyError> {
        self.writer
            .write_all(&[BELL])
            .map_err(|e| NotifyError::SinkFailed {
                message: format!("failed to write bell: {e}"),
            })
    }
}

impl NotificationSink for BellSink {
    fn kind(&self) -> NotificationSinkKind {
        NotificationSinkKind::Bell
    }

    fn send(&self, _notice: &AttentionNotice) -> Result<(), NotifyError> {
        self.ring()
    }

    /// One bell per refresh, however many workspaces entered attention.
    fn send_batch(&self, notices: &[AttentionNotice]) -> Result<(), NotifyError> {
        if notices.is_empty() {
            return Ok(());
        }
        self.ring()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn kind(&self) -> NotificationSinkKind {
        NotificationSinkKind::Log
    }

    fn send(&self, notice: &AttentionNotice) -> Result<(), NotifyError> {
        tracing::info!(
            workspace = %notice.workspace,
            status = %notice.status,
            command = notice.suggested_command.as_deref().unwrap_or("-"),
            "{}",
            notice.title
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failures: Vec<(NotificationSinkKind, String)>,
}

pub struct NotificationDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl NotificationDispatcher {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    /// Sinks enabled by `policy`, bells written to `writer`.
    pub fn from_policy(policy: &NotificationPolicy, writer: SharedWriter) -> Self {
        let mut sinks: Vec<Box<dyn NotificationSink>> = Vec::new();
        if policy.is_enabled(NotificationSinkKind::Bell) {
            sinks.push(Box::new(BellSink::new(writer)));
        }
        if policy.is_enabled(NotificationSinkKind::Log) {
            sinks.push(Box::new(LogSink));
        }
        Self::new(sinks)
    }

    pub fn sink_kinds(&self) -> Vec<NotificationSinkKind> {
        self.sinks.iter().map(|sink| sink.kind()).collect()
    }

    /// Best effort: sink failures are reported, never propagated.
    pub fn dispatch(&self, notices: &[AttentionNotice]) -> DispatchReport {
        let mut report = DispatchReport::default();
        if notices.is_empty() {
            return report;
        }
        for sink in &self.sinks {
            match sink.send_batch(notices) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::debug!(sink = ?sink.kind(), error = %err, "notification sink failed");
                    report.failures.push((sink.kind(), err.to_string()));
                }
            }
        }
        report
    }
}
