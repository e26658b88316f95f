//! Progress spinner for one-shot commands.
//!
//! A spinner moves through `Idle -> Running -> Stopped` exactly once. The
//! transition into `Stopped` happens under the state lock, so line cleanup
//! and registry release run once no matter how many callers race to stop it
//! (explicit stop, cancellation, or drop).

use atlas_core::output::SharedWriter;
use crossterm::terminal;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::render::truncate;

pub const SPINNER_FRAMES: [&str; 10] = [
    "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
];
pub const SPINNER_INTERVAL: Duration = Duration::from_millis(100);
/// Minimum spacing between two visible message changes.
pub const MESSAGE_THROTTLE: Duration = Duration::from_millis(200);
/// Elapsed time is appended once a spinner has run this long.
pub const ELAPSED_THRESHOLD: Duration = Duration::from_secs(3);
pub const CLEAR_LINE: &str = "\r\x1b[2K";
/// Line width assumed when the terminal size cannot be read.
const FALLBACK_WIDTH: u16 = 80;

static NEXT_SPINNER_ID: AtomicU64 = AtomicU64::new(1);

/// Tracks which spinner currently owns the bottom line of a stream.
#[derive(Debug, Clone, Default)]
pub struct SpinnerRegistry {
    active: Arc<Mutex<Option<u64>>>,
}

impl SpinnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<u64>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, id: u64) {
        *self.lock() = Some(id);
    }

    fn release(&self, id: u64) {
        let mut active = self.lock();
        if *active == Some(id) {
            *active = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    pub fn clear_active_line(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.is_active() {
            out.write_all(CLEAR_LINE.as_bytes())?;
        }
        Ok(())
    }

    /// Write `buf` to `writer`, wiping a live spinner line first. The spinner
    /// redraws itself on its next tick.
    pub fn write_above(&self, writer: &SharedWriter, buf: &[u8]) -> io::Result<()> {
        writer.with_lock(|out| {
            self.clear_active_line(out)?;
            out.write_all(buf)?;
            out.flush()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageUpdate {
    Applied,
    Unchanged,
    Deferred,
}

#[derive(Debug)]
struct SpinnerState {
    phase: Phase,
    message: String,
    pending: Option<String>,
    last_message_at: Option<Instant>,
    started_at: Option<Instant>,
    frame: usize,
    shutdown: Option<watch::Sender<bool>>,
}

impl SpinnerState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            message: String::new(),
            pending: None,
            last_message_at: None,
            started_at: None,
            frame: 0,
            shutdown: None,
        }
    }

    fn throttled(&self, now: Instant) -> bool {
        self.last_message_at
            .is_some_and(|last| now.saturating_duration_since(last) < MESSAGE_THROTTLE)
    }

    fn accept_message(&mut self, message: String, now: Instant) -> MessageUpdate {
        if message == self.message {
            self.pending = None;
            return MessageUpdate::Unchanged;
        }
        if self.throttled(now) {
            self.pending = Some(message);
            return MessageUpdate::Deferred;
        }
        self.message = message;
        self.pending = None;
        self.last_message_at = Some(now);
        MessageUpdate::Applied
    }

    fn apply_pending(&mut self, now: Instant) {
        if self.pending.is_some() && !self.throttled(now) {
            if let Some(message) = self.pending.take() {
                self.message = message;
                self.last_message_at = Some(now);
            }
        }
    }

    /// One frame for a terminal `width` columns wide. The message is cut so
    /// glyph, message and elapsed suffix stay short of the last column and
    /// the line never wraps.
    fn next_line(&mut self, now: Instant, width: u16) -> String {
        let glyph = SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()];
        self.frame = self.frame.wrapping_add(1);
        let elapsed = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        let suffix = if elapsed >= ELAPSED_THRESHOLD {
            format!(" ({}s)", elapsed.as_secs())
        } else {
            String::new()
        };
        let budget = usize::from(width).saturating_sub(3 + suffix.chars().count());
        let message = truncate(&self.message, budget);
        format!("{CLEAR_LINE}{glyph} {message}{suffix}")
    }
}

#[derive(Debug)]
struct Inner {
    id: u64,
    writer: SharedWriter,
    registry: SpinnerRegistry,
    state: Mutex<SpinnerState>,
    cleanups: AtomicUsize,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SpinnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draw_frame(&self, now: Instant) -> bool {
        let width = terminal::size()
            .map(|(width, _)| width)
            .unwrap_or(FALLBACK_WIDTH);
        let mut state = self.lock_state();
        if state.phase != Phase::Running {
            return false;
        }
        state.apply_pending(now);
        let line = state.next_line(now, width);
        if let Err(err) = self.writer.write_all(line.as_bytes()) {
            drop(state);
            tracing::debug!(error = %err, "spinner frame not written");
        }
        true
    }

    fn finish(&self) -> bool {
        let mut state = self.lock_state();
        if state.phase != Phase::Running {
            return false;
        }
        state.phase = Phase::Stopped;
        if let Some(shutdown) = state.shutdown.take() {
            let _ = shutdown.send(true);
        }
        self.cleanup();
        true
    }

    fn cleanup(&self) {
        let cleared = self.writer.write_all(CLEAR_LINE.as_bytes());
        self.registry.release(self.id);
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = cleared {
            tracing::debug!(error = %err, "spinner line not cleared");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let was_running = {
            let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
            if state.phase == Phase::Running {
                state.phase = Phase::Stopped;
                if let Some(shutdown) = state.shutdown.take() {
                    let _ = shutdown.send(true);
                }
                true
            } else {
                false
            }
        };
        if was_running {
            self.cleanup();
        }
    }
}

/// Cloneable handle to one spinner line.
#[derive(Debug, Clone)]
pub struct Spinner {
    inner: Arc<Inner>,
}

impl Spinner {
    pub fn new(writer: SharedWriter, registry: SpinnerRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_SPINNER_ID.fetch_add(1, Ordering::Relaxed),
                writer,
                registry,
                state: Mutex::new(SpinnerState::new()),
                cleanups: AtomicUsize::new(0),
            }),
        }
    }

    /// Start animating. Returns true only for the idle to running transition,
    /// and after a stop it does nothing.
    ///
    /// On a running spinner the message goes through the same duplicate check
    /// and throttle as [`Spinner::update_message`]. An applied message moves
    /// the throttle timestamp; the start time behind the elapsed suffix stays.
    pub fn start(&self, message: impl Into<String>) -> bool {
        self.start_with_cancel(message, None)
    }

    /// Like [`Spinner::start`], additionally stopping once `cancel` turns true.
    pub fn start_with_cancel(
        &self,
        message: impl Into<String>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> bool {
        let mut state = self.inner.lock_state();
        let now = Instant::now();
        match state.phase {
            Phase::Idle => {}
            Phase::Running => {
                state.accept_message(message.into(), now);
                return false;
            }
            Phase::Stopped => return false,
        }
        state.phase = Phase::Running;
        state.message = message.into();
        state.started_at = Some(now);
        state.last_message_at = Some(now);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        state.shutdown = Some(shutdown_tx);
        self.inner.registry.register(self.inner.id);

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(tick_loop(Arc::downgrade(&self.inner), shutdown_rx, cancel));
            }
            Err(_) => {
                drop(state);
                tracing::debug!("no async runtime, spinner will not animate");
            }
        }
        true
    }

    /// Change the message. Identical messages are ignored and changes closer
    /// than [`MESSAGE_THROTTLE`] are held back until the next frame after the
    /// window. Returns true if the message was applied immediately.
    pub fn update_message(&self, message: impl Into<String>) -> bool {
        let mut state = self.inner.lock_state();
        if state.phase != Phase::Running {
            return false;
        }
        state.accept_message(message.into(), Instant::now()) == MessageUpdate::Applied
    }

    /// Stop and clear the line. Only the first call returns true.
    pub fn stop(&self) -> bool {
        self.inner.finish()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_state().phase == Phase::Running
    }

    pub fn message(&self) -> String {
        self.inner.lock_state().message.clone()
    }

    /// Number of times cleanup ran. Never exceeds one.
    pub fn cleanup_count(&self) -> usize {
        self.inner.cleanups.load(Ordering::SeqCst)
    }
}

async fn tick_loop(
    inner: Weak<Inner>,
    mut shutdown: watch::Receiver<bool>,
    mut cancel: Option<watch::Receiver<bool>>,
) {
    let mut ticker = tokio::time::interval(SPINNER_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = wait_for_cancel(&mut cancel) => {
                if let Some(inner) = inner.upgrade() {
                    inner.finish();
                }
                break;
            }
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if !inner.draw_frame(Instant::now()) {
                    break;
                }
            }
        }
    }
}

async fn wait_for_cancel(cancel: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = cancel else {
        return std::future::pending::<()>().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending::<()>().await;
        }
    }
}
