use atlas_core::config::WatchConfig;
use atlas_notify::AttentionMemory;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;

use crate::error::RefreshError;
use crate::event::{WatchCommand, WatchMessage};
use crate::model::{LastKnown, RefreshResult, Snapshot, StatusRow};
use crate::render::{FrameView, RenderOptions};
use crate::ui::draw_watch;

/// State of the watch screen. Mutated only through [`WatchApp::update`].
#[derive(Debug, Clone)]
pub struct WatchApp {
    config: WatchConfig,
    color: bool,
    snapshot: Option<Snapshot>,
    memory: AttentionMemory,
    last_error: Option<RefreshError>,
    width: u16,
    height: u16,
    quitting: bool,
    next_seq: u64,
    applied_seq: u64,
}

impl WatchApp {
    pub fn new(config: WatchConfig, color: bool, (width, height): (u16, u16)) -> Self {
        Self {
            config,
            color,
            snapshot: None,
            memory: AttentionMemory::new(),
            last_error: None,
            width,
            height,
            quitting: false,
            next_seq: 0,
            applied_seq: 0,
        }
    }

    /// Commands issued once at startup: first fetch and the refresh timer.
    pub fn init(&mut self) -> Vec<WatchCommand> {
        vec![self.fetch_command(), WatchCommand::ArmTimer(self.config.interval())]
    }

    pub fn update(&mut self, message: WatchMessage) -> Vec<WatchCommand> {
        match message {
            WatchMessage::Tick => {
                if self.quitting {
                    return Vec::new();
                }
                vec![self.fetch_command(), WatchCommand::ArmTimer(self.config.interval())]
            }
            WatchMessage::Key(key) => self.handle_key_event(key),
            WatchMessage::Resize { width, height } => {
                self.width = width;
                self.height = height;
                Vec::new()
            }
            WatchMessage::Refreshed(result) => self.apply_refresh(result),
            WatchMessage::NotificationFired(report) => {
                for (sink, error) in &report.failures {
                    tracing::debug!(?sink, %error, "attention notification not delivered");
                }
                Vec::new()
            }
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Vec<WatchCommand> {
        if key.kind != KeyEventKind::Press {
            return Vec::new();
        }
        let ctrl_c =
            key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        if ctrl_c || key.code == KeyCode::Char('q') {
            self.quitting = true;
            return vec![WatchCommand::Quit];
        }
        Vec::new()
    }

    /// Results are applied in arrival order. A slow fetch finishing after a
    /// newer one overwrites it until the next refresh.
    fn apply_refresh(&mut self, result: RefreshResult) -> Vec<WatchCommand> {
        if self.quitting {
            return Vec::new();
        }
        if result.seq < self.applied_seq {
            tracing::debug!(
                seq = result.seq,
                applied = self.applied_seq,
                "applying refresh out of dispatch order"
            );
        }
        self.applied_seq = self.applied_seq.max(result.seq);

        let mut commands = vec![WatchCommand::ArmTimer(self.config.interval())];
        match result.outcome {
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed");
                self.last_error = Some(err);
            }
            Ok(snapshot) => {
                let notices = self.memory.observe(
                    snapshot
                        .rows
                        .iter()
                        .map(|row| (row.workspace.as_str(), row.status)),
                    self.config.alerts_enabled(),
                );
                self.snapshot = Some(snapshot);
                self.last_error = None;
                if !notices.is_empty() {
                    commands.push(WatchCommand::Notify(notices));
                }
            }
        }
        commands
    }

    fn fetch_command(&mut self) -> WatchCommand {
        self.next_seq += 1;
        WatchCommand::Fetch {
            seq: self.next_seq,
            last_known: self.last_known(),
        }
    }

    fn last_known(&self) -> LastKnown {
        self.snapshot
            .as_ref()
            .map(Snapshot::last_known)
            .unwrap_or_default()
    }

    pub fn should_quit(&self) -> bool {
        self.quitting
    }

    pub fn last_error(&self) -> Option<&RefreshError> {
        self.last_error.as_ref()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Copies of the current rows; callers never see live state.
    pub fn rows(&self) -> Vec<StatusRow> {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.rows.clone())
            .unwrap_or_default()
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            width: self.width,
            height: self.height,
            color: self.color,
            quiet: self.config.quiet,
            show_progress: self.config.show_progress,
        }
    }

    pub fn frame_view(&self) -> FrameView<'_> {
        let rows = self
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.rows.as_slice())
            .unwrap_or_default();
        FrameView {
            rows,
            last_refresh: self.snapshot.as_ref().map(|snapshot| snapshot.fetched_at),
            error: self.last_error.as_ref().map(|err| err.message.as_str()),
            interval: self.config.interval(),
        }
    }

    pub fn draw(&self, frame: &mut Frame<'_>) {
        draw_watch(frame, &self.frame_view(), &self.render_options());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::status::TaskStatus;
    use atlas_notify::DispatchReport;
    use crate::ui::buffer_lines;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::time::Duration;

    /// What the terminal shows after one draw.
    fn screen(app: &WatchApp) -> String {
        let options = app.render_options();
        let height = if options.height == 0 { 30 } else { options.height };
        let mut terminal =
            Terminal::new(TestBackend::new(options.width, height)).expect("test terminal");
        terminal.draw(|frame| app.draw(frame)).expect("draw");
        buffer_lines(terminal.backend().buffer()).join("\n")
    }

    fn mk_row(workspace: &str, status: TaskStatus) -> StatusRow {
        StatusRow {
            workspace: workspace.to_string(),
            branch: format!("feat/{workspace}"),
            status,
            current_step: 1,
            total_steps: 3,
            action: None,
            stale: false,
        }
    }

    fn ok(seq: u64, rows: Vec<StatusRow>) -> WatchMessage {
        WatchMessage::Refreshed(RefreshResult {
            seq,
            outcome: Ok(Snapshot {
                workspaces: Vec::new(),
                rows,
                fetched_at: Utc::now(),
            }),
        })
    }

    fn failed(seq: u64, message: &str) -> WatchMessage {
        WatchMessage::Refreshed(RefreshResult {
            seq,
            outcome: Err(RefreshError::new(message)),
        })
    }

    fn app() -> WatchApp {
        WatchApp::new(WatchConfig::default(), false, (100, 0))
    }

    fn fetch_seq(commands: &[WatchCommand]) -> Option<u64> {
        commands.iter().find_map(|command| match command {
            WatchCommand::Fetch { seq, .. } => Some(*seq),
            _ => None,
        })
    }

    #[test]
    fn init_fetches_and_arms_timer() {
        let mut app = app();
        let commands = app.init();
        assert_eq!(fetch_seq(&commands), Some(1));
        assert!(commands.contains(&WatchCommand::ArmTimer(Duration::from_millis(2000))));
    }

    #[test]
    fn each_tick_fetches_with_a_new_sequence_and_rearms() {
        let mut app = app();
        app.init();
        let first = app.update(WatchMessage::Tick);
        let second = app.update(WatchMessage::Tick);
        assert_eq!(fetch_seq(&first), Some(2));
        assert_eq!(fetch_seq(&second), Some(3));
        assert!(second
            .iter()
            .any(|command| matches!(command, WatchCommand::ArmTimer(_))));
    }

    #[test]
    fn q_and_ctrl_c_quit_other_keys_do_not() {
        let mut app = app();
        assert!(app
            .update(WatchMessage::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)))
            .is_empty());
        assert!(app
            .update(WatchMessage::Key(KeyEvent::new_with_kind(
                KeyCode::Char('q'),
                KeyModifiers::NONE,
                KeyEventKind::Release,
            )))
            .is_empty());
        assert!(!app.should_quit());

        let commands =
            app.update(WatchMessage::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert_eq!(commands, vec![WatchCommand::Quit]);
        assert!(app.should_quit());

        let mut other = self::app();
        let commands = other.update(WatchMessage::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert_eq!(commands, vec![WatchCommand::Quit]);
    }

    fn notices(commands: &[WatchCommand]) -> usize {
        commands
            .iter()
            .map(|command| match command {
                WatchCommand::Notify(notices) => notices.len(),
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn nothing_is_applied_after_quit() {
        let mut app = app();
        app.init();
        app.update(WatchMessage::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(app.update(WatchMessage::Tick).is_empty());
        assert!(app
            .update(ok(1, vec![mk_row("auth", TaskStatus::AwaitingApproval)]))
            .is_empty());
        assert!(app.rows().is_empty());
    }

    #[test]
    fn every_refresh_rearms_the_timer() {
        let mut app = app();
        let interval = WatchCommand::ArmTimer(Duration::from_millis(2000));
        assert_eq!(
            app.update(ok(1, vec![mk_row("api", TaskStatus::Running)])),
            vec![interval.clone()]
        );
        assert_eq!(app.update(failed(2, "boom")), vec![interval]);
    }

    #[test]
    fn failed_refresh_keeps_table_and_next_success_clears_error() {
        let mut app = app();
        app.update(ok(1, vec![mk_row("api", TaskStatus::Running)]));

        app.update(failed(2, "permission denied"));
        let view = screen(&app);
        assert!(view.contains("⚠ refresh failed: permission denied"));
        assert!(view.contains("api"));
        assert_eq!(app.rows().len(), 1);

        app.update(ok(3, vec![mk_row("api", TaskStatus::Completed)]));
        assert!(app.last_error().is_none());
        assert!(!screen(&app).contains("refresh failed"));
        assert!(screen(&app).contains("✓ completed"));
    }

    #[test]
    fn late_refresh_is_applied_in_arrival_order() {
        let mut app = app();
        app.update(ok(2, vec![mk_row("new", TaskStatus::Running)]));
        app.update(ok(1, vec![mk_row("old", TaskStatus::Running)]));
        assert_eq!(app.rows()[0].workspace, "old");
    }

    #[test]
    fn entering_attention_notifies_once_per_interval() {
        let mut app = app();
        let commands = app.update(ok(1, vec![mk_row("auth", TaskStatus::Running)]));
        assert_eq!(notices(&commands), 0);

        let commands = app.update(ok(2, vec![mk_row("auth", TaskStatus::AwaitingApproval)]));
        let Some(WatchCommand::Notify(fired)) = commands.last() else {
            panic!("expected notify command, got {commands:?}");
        };
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].workspace, "auth");
        assert!(screen(&app).contains("1 workspace, 1 needs attention\nRun: atlas approve auth"));

        for seq in 3..6 {
            let commands = app.update(ok(seq, vec![mk_row("auth", TaskStatus::AwaitingApproval)]));
            assert_eq!(notices(&commands), 0);
        }
        assert_eq!(notices(&app.update(ok(6, vec![mk_row("auth", TaskStatus::Running)]))), 0);
        assert_eq!(notices(&app.update(ok(7, vec![mk_row("auth", TaskStatus::CiFailed)]))), 1);
    }

    #[test]
    fn removed_workspace_fires_again_when_name_is_reused() {
        let mut app = app();
        assert_eq!(notices(&app.update(ok(1, vec![mk_row("payment", TaskStatus::GhFailed)]))), 1);
        assert_eq!(notices(&app.update(ok(2, Vec::new()))), 0);
        assert_eq!(notices(&app.update(ok(3, vec![mk_row("payment", TaskStatus::GhFailed)]))), 1);
    }

    #[test]
    fn failed_refresh_does_not_touch_attention_memory() {
        let mut app = app();
        app.update(ok(1, vec![mk_row("auth", TaskStatus::CiFailed)]));
        app.update(failed(2, "boom"));
        assert_eq!(notices(&app.update(ok(3, vec![mk_row("auth", TaskStatus::CiFailed)]))), 0);
    }

    #[test]
    fn disabled_bell_and_quiet_mode_suppress_notifications() {
        for config in [
            WatchConfig {
                bell: false,
                ..WatchConfig::default()
            },
            WatchConfig {
                quiet: true,
                ..WatchConfig::default()
            },
        ] {
            let mut app = WatchApp::new(config, false, (100, 0));
            let commands = app.update(ok(1, vec![mk_row("auth", TaskStatus::AwaitingApproval)]));
            assert_eq!(notices(&commands), 0);
        }
    }

    #[test]
    fn fetch_carries_last_known_rows() {
        let mut app = app();
        app.update(ok(1, vec![mk_row("auth", TaskStatus::Validating)]));
        let commands = app.update(WatchMessage::Tick);
        let Some(WatchCommand::Fetch { last_known, .. }) =
            commands.iter().find(|command| command.is_fetch())
        else {
            panic!("expected fetch");
        };
        assert_eq!(last_known["auth"].status, TaskStatus::Validating);
    }

    #[test]
    fn resize_switches_to_abbreviated_headers() {
        let mut app = app();
        app.update(ok(1, vec![mk_row("api", TaskStatus::Running)]));
        assert!(screen(&app).contains("WORKSPACE"));
        assert!(app
            .update(WatchMessage::Resize {
                width: 60,
                height: 20,
            })
            .is_empty());
        assert!(!screen(&app).contains("WORKSPACE"));
        assert!(screen(&app).contains("WS"));
    }

    #[test]
    fn notification_report_is_a_no_op() {
        let mut app = app();
        let before = screen(&app);
        assert!(app
            .update(WatchMessage::NotificationFired(DispatchReport::default()))
            .is_empty());
        assert_eq!(screen(&app), before);
    }
}
