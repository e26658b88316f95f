use atlas_core::config::WatchConfig;
use atlas_core::output::SharedWriter;
use atlas_core::source::StateSource;
use atlas_notify::{AttentionNotice, NotificationDispatcher};
use crossterm::event::{Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::app::WatchApp;
use crate::error::{RefreshError, TuiError};
use crate::event::{WatchCommand, WatchMessage};
use crate::model::{LastKnown, RefreshResult};
use crate::snapshot::fetch_snapshot;

async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Runs [`WatchCommand`]s as background tasks that report back through the
/// message channel.
///
/// There is one refresh timer: arming it again replaces the pending deadline.
pub struct CommandExecutor {
    tx: mpsc::UnboundedSender<WatchMessage>,
    shutdown: watch::Receiver<bool>,
    source: Arc<dyn StateSource>,
    dispatcher: Arc<NotificationDispatcher>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl CommandExecutor {
    pub fn new(
        tx: mpsc::UnboundedSender<WatchMessage>,
        shutdown: watch::Receiver<bool>,
        source: Arc<dyn StateSource>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            tx,
            shutdown,
            source,
            dispatcher,
            timer: Mutex::new(None),
        }
    }

    pub fn execute(&self, command: WatchCommand) {
        match command {
            WatchCommand::Fetch { seq, last_known } => self.spawn_fetch(seq, last_known),
            WatchCommand::ArmTimer(delay) => self.spawn_timer(delay),
            WatchCommand::Notify(notices) => self.spawn_notify(notices),
            WatchCommand::Quit => {}
        }
    }

    fn spawn_fetch(&self, seq: u64, last_known: LastKnown) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || {
                fetch_snapshot(source.as_ref(), &last_known)
            })
            .await
            .unwrap_or_else(|err| Err(RefreshError::new(format!("refresh task failed: {err}"))));
            let _ = tx.send(WatchMessage::Refreshed(RefreshResult { seq, outcome }));
        });
    }

    fn spawn_timer(&self, delay: Duration) {
        let tx = self.tx.clone();
        let mut shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(WatchMessage::Tick);
                }
                _ = shutdown_signalled(&mut shutdown) => {}
            }
        });
        let previous = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn spawn_notify(&self, notices: Vec<AttentionNotice>) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || dispatcher.dispatch(&notices)).await {
                Ok(report) => {
                    let _ = tx.send(WatchMessage::NotificationFired(report));
                }
                Err(err) => tracing::debug!(error = %err, "notification task failed"),
            }
        });
    }
}

/// Terminal writer that holds everything queued for a frame and hands it to
/// the shared output in one write on flush, so other writers never land
/// inside a frame.
pub struct FrameWriter {
    out: SharedWriter,
    buf: Vec<u8>,
}

impl FrameWriter {
    pub fn new(out: SharedWriter) -> Self {
        Self {
            out,
            buf: Vec::new(),
        }
    }
}

impl Write for FrameWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    /// The pending bytes are dropped even if the write fails.
    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = self.out.write_all(&self.buf);
        self.buf.clear();
        result
    }
}

/// Drive `app` until it quits or every sender is gone, drawing after each
/// message. A failed draw is logged and the loop carries on.
pub async fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut WatchApp,
    executor: &CommandExecutor,
    rx: &mut mpsc::UnboundedReceiver<WatchMessage>,
) -> Result<(), TuiError> {
    for command in app.init() {
        executor.execute(command);
    }

    loop {
        if let Err(err) = terminal.draw(|frame| app.draw(frame)) {
            tracing::debug!(error = %err, "frame not drawn");
        }

        let Some(message) = rx.recv().await else {
            break;
        };
        for command in app.update(message) {
            executor.execute(command);
        }
        if app.should_quit() {
            break;
        }
    }
    Ok(())
}

fn spawn_input(
    tx: mpsc::UnboundedSender<WatchMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        loop {
            tokio::select! {
                _ = shutdown_signalled(&mut shutdown) => break,
                maybe_event = events.next() => {
                    let message = match maybe_event {
                        Some(Ok(Event::Key(key))) => WatchMessage::Key(key),
                        Some(Ok(Event::Resize(width, height))) => {
                            WatchMessage::Resize { width, height }
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "terminal input failed");
                            break;
                        }
                        None => break,
                    };
                    if tx.send(message).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<FrameWriter>>,
) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn open_terminal(out: &SharedWriter) -> Result<Terminal<CrosstermBackend<FrameWriter>>, TuiError> {
    enable_raw_mode()?;
    let mut writer = FrameWriter::new(out.clone());
    if let Err(err) = execute!(writer, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(err.into());
    }
    match Terminal::new(CrosstermBackend::new(writer)) {
        Ok(terminal) => Ok(terminal),
        Err(err) => {
            let _ = disable_raw_mode();
            let mut writer = FrameWriter::new(out.clone());
            let _ = execute!(writer, LeaveAlternateScreen);
            Err(err.into())
        }
    }
}

/// Full-screen watch on the alternate screen. The terminal is restored on
/// every exit path once raw mode has been entered.
pub async fn run_watch(
    config: WatchConfig,
    color: bool,
    source: Arc<dyn StateSource>,
    dispatcher: Arc<NotificationDispatcher>,
    out: SharedWriter,
) -> Result<(), TuiError> {
    let size = terminal::size()?;
    let mut terminal = open_terminal(&out)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let input = spawn_input(tx.clone(), shutdown_rx.clone());
    let executor = CommandExecutor::new(tx, shutdown_rx, source, dispatcher);
    let mut app = WatchApp::new(config, color, size);

    let result = run_loop(&mut terminal, &mut app, &executor, &mut rx).await;

    let _ = shutdown_tx.send(true);
    if let Err(err) = input.await {
        tracing::debug!(error = %err, "input task ended abnormally");
    }
    let restored = restore_terminal(&mut terminal);
    result.and(restored)
}
