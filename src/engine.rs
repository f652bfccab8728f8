//! The typing engine.
//!
//! A [`TypingEngine`] owns at most one session at a time. Each session runs
//! on its own thread: it waits for the user to switch windows, remembers the
//! window that received focus, and then types one character at a time while
//! that window stays focused and the session is not paused.
//!
//! Control operations (`start`, `pause_resume`, `stop`) may be called from any
//! thread. Status changes are published on a [`tokio::sync::watch`] channel so
//! the control surface can render them on its own loop.
//!
//! A session checks its own state under the engine's emission lock right
//! before every keystroke, and `stop` takes the same lock after marking the
//! session stopped. Once `stop` (or a replacing `start`) returns, the old
//! session cannot type another character, even if its thread is still
//! winding down.

use crate::error::{Result, TyperError};
use crate::focus::{self, FocusProvider, WindowId};
use crate::key_sender::Keystrokes;
use crate::speed::Speed;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Stopped = 0,
    Typing = 1,
    Paused = 2,
}

impl From<u8> for SessionState {
    fn from(v: u8) -> Self {
        match v {
            1 => SessionState::Typing,
            2 => SessionState::Paused,
            _ => SessionState::Stopped,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Stopped => write!(f, "Stopped"),
            SessionState::Typing => write!(f, "Typing"),
            SessionState::Paused => write!(f, "Paused"),
        }
    }
}

/// What the control surface shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Stopped,
    Typing,
    Paused,
    /// Typing is suspended until the target window is focused again.
    WrongWindow,
    /// The session ended because a keystroke could not be sent.
    Failed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Stopped => write!(f, "Stopped"),
            Status::Typing => write!(f, "Typing"),
            Status::Paused => write!(f, "Paused"),
            Status::WrongWindow => write!(f, "Paused (Wrong Window)"),
            Status::Failed(reason) => write!(f, "Error: {reason}"),
        }
    }
}

/// Timing knobs for sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Delay before the target window is captured.
    pub grace_period: Duration,
    /// Re-check interval while paused, waiting for focus, or sleeping.
    pub poll_interval: Duration,
    /// Upper bound on how long `stop` waits for the session thread.
    pub stop_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_millis(500),
        }
    }
}

/// Point-in-time view of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: u64,
    pub state: SessionState,
    /// Characters typed so far; the index of the next one.
    pub typed: usize,
    pub total: usize,
    pub target: Option<WindowId>,
}

/// State shared between the engine and one session thread.
struct SessionControl {
    state: AtomicU8,
    cursor: AtomicUsize,
    total: usize,
    target: Mutex<Option<WindowId>>,
}

impl SessionControl {
    fn new(total: usize) -> Self {
        Self {
            state: AtomicU8::new(SessionState::Typing as u8),
            cursor: AtomicUsize::new(0),
            total,
            target: Mutex::new(None),
        }
    }

    fn state(&self) -> SessionState {
        SessionState::from(self.state.load(Ordering::SeqCst))
    }

    fn is_stopped(&self) -> bool {
        self.state() == SessionState::Stopped
    }

    fn stop(&self) {
        self.state.store(SessionState::Stopped as u8, Ordering::SeqCst);
    }

    /// Flips Typing and Paused; leaves Stopped alone.
    fn toggle_pause(&self) -> SessionState {
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            let next = match SessionState::from(current) {
                SessionState::Typing => SessionState::Paused,
                SessionState::Paused => SessionState::Typing,
                SessionState::Stopped => return SessionState::Stopped,
            };
            match self.state.compare_exchange(
                current,
                next as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    fn set_target(&self, target: Option<WindowId>) {
        *lock(&self.target) = target;
    }

    fn target(&self) -> Option<WindowId> {
        lock(&self.target).clone()
    }
}

/// Status channel that only accepts updates from the current session.
struct StatusBoard {
    current: AtomicU64,
    tx: watch::Sender<Status>,
}

impl StatusBoard {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(Status::Stopped);
        Self {
            current: AtomicU64::new(0),
            tx,
        }
    }

    fn begin(&self, session: u64) {
        self.tx.send_modify(|status| {
            self.current.store(session, Ordering::SeqCst);
            *status = Status::Typing;
        });
    }

    fn publish(&self, session: u64, next: Status) {
        self.tx.send_if_modified(|status| {
            if self.current.load(Ordering::SeqCst) != session || *status == next {
                return false;
            }
            *status = next;
            true
        });
    }

    /// Like `publish`, but only while the session is still typing.
    ///
    /// The check runs under the channel lock, so a pause that lands while the
    /// worker is querying focus keeps its `Paused` status.
    /// Returns whether the board now shows `next`.
    fn publish_while_typing(&self, session: u64, control: &SessionControl, next: Status) -> bool {
        let mut shown = false;
        self.tx.send_if_modified(|status| {
            if self.current.load(Ordering::SeqCst) != session
                || control.state() != SessionState::Typing
            {
                return false;
            }
            shown = true;
            if *status == next {
                return false;
            }
            *status = next;
            true
        });
        shown
    }

    /// Detaches every session from the board and shows `Stopped`.
    fn reset(&self) {
        self.tx.send_if_modified(|status| {
            self.current.store(0, Ordering::SeqCst);
            if *status == Status::Stopped {
                return false;
            }
            *status = Status::Stopped;
            true
        });
    }
}

struct ActiveSession {
    id: u64,
    control: Arc<SessionControl>,
    handle: JoinHandle<()>,
}

pub struct TypingEngine {
    keys: Arc<dyn Keystrokes>,
    focus: Arc<dyn FocusProvider>,
    options: EngineOptions,
    home_window: Option<WindowId>,
    speed: Arc<AtomicU8>,
    status: Arc<StatusBoard>,
    emit_lock: Arc<Mutex<()>>,
    session: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
}

impl TypingEngine {
    pub fn new(
        keys: Arc<dyn Keystrokes>,
        focus: Arc<dyn FocusProvider>,
        options: EngineOptions,
    ) -> Self {
        Self {
            keys,
            focus,
            options,
            home_window: None,
            speed: Arc::new(AtomicU8::new(Speed::DEFAULT.get())),
            status: Arc::new(StatusBoard::new()),
            emit_lock: Arc::new(Mutex::new(())),
            session: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// The control surface's own window.
    ///
    /// When set, sessions wait until focus has left this window before
    /// capturing their target, so text is never typed into the controls.
    pub fn with_home_window(mut self, window: Option<WindowId>) -> Self {
        self.home_window = window;
        self
    }

    pub fn with_speed(self, speed: Speed) -> Self {
        self.set_speed(speed);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.tx.subscribe()
    }

    pub fn status(&self) -> Status {
        self.status.tx.borrow().clone()
    }

    /// Takes effect from the next character of a running session.
    pub fn set_speed(&self, speed: Speed) {
        self.speed.store(speed.get(), Ordering::SeqCst);
        debug!(%speed, "typing speed changed");
    }

    pub fn speed(&self) -> Speed {
        Speed::new(self.speed.load(Ordering::SeqCst)).unwrap_or_default()
    }

    pub fn state(&self) -> SessionState {
        lock(&self.session)
            .as_ref()
            .map_or(SessionState::Stopped, |s| s.control.state())
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        lock(&self.session).as_ref().map(|s| SessionSnapshot {
            id: s.id,
            state: s.control.state(),
            typed: s.control.cursor.load(Ordering::SeqCst),
            total: s.control.total,
            target: s.control.target(),
        })
    }

    /// Starts typing `text`, replacing any session in progress.
    ///
    /// Returns the new session's id without waiting for typing to begin.
    pub fn start(&self, text: impl Into<String>) -> Result<u64> {
        let chars: Vec<char> = text.into().chars().collect();
        if chars.is_empty() {
            return Err(TyperError::EmptyInput);
        }

        let mut slot = lock(&self.session);
        if let Some(previous) = slot.take() {
            self.shut_down(previous);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let control = Arc::new(SessionControl::new(chars.len()));
        self.status.begin(id);

        let worker = SessionWorker {
            id,
            control: Arc::clone(&control),
            keys: Arc::clone(&self.keys),
            focus: Arc::clone(&self.focus),
            options: self.options,
            home_window: self.home_window.clone(),
            speed: Arc::clone(&self.speed),
            status: Arc::clone(&self.status),
            emit_lock: Arc::clone(&self.emit_lock),
        };

        let handle = thread::Builder::new()
            .name(format!("typing-session-{id}"))
            .spawn(move || worker.run(chars))
            .map_err(|e| {
                control.stop();
                self.status.reset();
                TyperError::Io(e)
            })?;

        info!(session = id, chars = control.total, "typing session started");
        *slot = Some(ActiveSession {
            id,
            control,
            handle,
        });
        Ok(id)
    }

    /// Toggles between typing and paused. Does nothing when stopped.
    pub fn pause_resume(&self) -> SessionState {
        let slot = lock(&self.session);
        let Some(session) = slot.as_ref() else {
            return SessionState::Stopped;
        };

        let state = session.control.toggle_pause();
        match state {
            SessionState::Paused => {
                info!(session = session.id, "typing paused");
                self.status.publish(session.id, Status::Paused);
            }
            SessionState::Typing => {
                info!(session = session.id, "typing resumed");
                self.status.publish(session.id, Status::Typing);
            }
            SessionState::Stopped => {}
        }
        state
    }

    /// Ends the current session, if any.
    pub fn stop(&self) {
        if let Some(session) = lock(&self.session).take() {
            self.shut_down(session);
        }
        self.status.reset();
    }

    fn shut_down(&self, session: ActiveSession) {
        session.control.stop();
        // Waits out a keystroke that is being sent right now.
        drop(lock(&self.emit_lock));

        let deadline = Instant::now() + self.options.stop_timeout;
        let step = self.options.poll_interval.min(Duration::from_millis(10));
        while !session.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(step);
        }

        if session.handle.is_finished() {
            if session.handle.join().is_err() {
                warn!(session = session.id, "typing thread panicked");
            }
            debug!(session = session.id, "typing session shut down");
        } else {
            warn!(
                session = session.id,
                timeout = ?self.options.stop_timeout,
                "typing thread did not exit in time, detaching it"
            );
        }
    }
}

impl Drop for TypingEngine {
    fn drop(&mut self) {
        if let Some(session) = lock(&self.session).as_ref() {
            session.control.stop();
        }
    }
}

/// Everything a session thread needs, detached from the engine.
struct SessionWorker {
    id: u64,
    control: Arc<SessionControl>,
    keys: Arc<dyn Keystrokes>,
    focus: Arc<dyn FocusProvider>,
    options: EngineOptions,
    home_window: Option<WindowId>,
    speed: Arc<AtomicU8>,
    status: Arc<StatusBoard>,
    emit_lock: Arc<Mutex<()>>,
}

impl SessionWorker {
    fn run(self, chars: Vec<char>) {
        let outcome = self.type_all(&chars);
        self.control.stop();

        match outcome {
            Ok(()) => {
                info!(
                    session = self.id,
                    typed = self.control.cursor.load(Ordering::SeqCst),
                    total = chars.len(),
                    "typing session ended"
                );
                self.status.publish(self.id, Status::Stopped);
            }
            Err(e) => {
                warn!(session = self.id, error = %e, "typing session failed");
                self.status.publish(self.id, Status::Failed(e.to_string()));
            }
        }
    }

    fn type_all(&self, chars: &[char]) -> Result<()> {
        let Some(target) = self.capture_target() else {
            return Ok(());
        };

        let mut cursor = 0;
        while cursor < chars.len() {
            if !self.wait_for_clearance(target.as_ref()) {
                return Ok(());
            }

            {
                let _emitting = lock(&self.emit_lock);
                match self.control.state() {
                    SessionState::Stopped => return Ok(()),
                    SessionState::Paused => continue,
                    SessionState::Typing => {}
                }
                self.keys.type_char(chars[cursor])?;
                cursor += 1;
                self.control.cursor.store(cursor, Ordering::SeqCst);
            }

            if !self.sleep(self.delay()) {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Waits for the user to pick a window and returns it.
    ///
    /// The outer `None` means the session was stopped first; an inner `None`
    /// means focus cannot be observed and typing proceeds ungated.
    fn capture_target(&self) -> Option<Option<WindowId>> {
        if !self.sleep(self.options.grace_period) {
            return None;
        }

        if let Some(home) = &self.home_window {
            debug!(session = self.id, window = %home, "waiting for focus to leave the control window");
            let left = focus::wait_until_unfocused(
                self.focus.as_ref(),
                home,
                self.options.poll_interval,
                || self.control.is_stopped(),
            );
            if !left {
                return None;
            }
        }

        let target = self.focus.current_window();
        match &target {
            Some(window) => info!(session = self.id, %window, "typing into target window"),
            None => warn!(session = self.id, "focused window unavailable, typing without focus checks"),
        }
        self.control.set_target(target.clone());
        Some(target)
    }

    /// Blocks while paused or while another window has focus.
    ///
    /// Returns `false` once the session is stopped.
    fn wait_for_clearance(&self, target: Option<&WindowId>) -> bool {
        let mut wrong_window = false;
        loop {
            match self.control.state() {
                SessionState::Stopped => return false,
                SessionState::Paused => {
                    wrong_window = false;
                    thread::sleep(self.options.poll_interval);
                    continue;
                }
                SessionState::Typing => {}
            }

            let Some(target) = target else {
                return true;
            };

            let current = self.focus.current_window();
            if current.as_ref() == Some(target) {
                if wrong_window {
                    info!(session = self.id, "target window focused again, resuming");
                    self.status
                        .publish_while_typing(self.id, &self.control, Status::Typing);
                }
                return true;
            }

            if !wrong_window {
                match &current {
                    Some(window) => info!(session = self.id, %window, "focus moved away, waiting"),
                    None => info!(session = self.id, "focus lost, waiting"),
                }
                wrong_window = self.status.publish_while_typing(
                    self.id,
                    &self.control,
                    Status::WrongWindow,
                );
            }
            thread::sleep(self.options.poll_interval);
        }
    }

    fn delay(&self) -> Duration {
        Speed::new(self.speed.load(Ordering::SeqCst))
            .unwrap_or_default()
            .delay()
    }

    /// Sleeps in poll-sized steps; `false` if stopped meanwhile.
    fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.control.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(self.options.poll_interval));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[derive(Default)]
    struct Recorder {
        typed: Mutex<String>,
    }

    impl Keystrokes for Recorder {
        fn type_char(&self, ch: char) -> Result<()> {
            self.typed.lock().unwrap().push(ch);
            Ok(())
        }
    }

    struct FailingKeys;

    impl Keystrokes for FailingKeys {
        fn type_char(&self, ch: char) -> Result<()> {
            Err(TyperError::injection(ch, "no display"))
        }
    }

    struct NoFocus;

    impl FocusProvider for NoFocus {
        fn current_window(&self) -> Option<WindowId> {
            None
        }
    }

    /// Focus that can hold the next query until the test lets it return.
    struct GatedFocus {
        window: Mutex<Option<WindowId>>,
        gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    impl GatedFocus {
        fn on(window: WindowId) -> Self {
            Self {
                window: Mutex::new(Some(window)),
                gate: Mutex::new(None),
            }
        }

        /// Returns (entered, release): the next query signals `entered` and
        /// blocks until `release` fires.
        fn arm(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = mpsc::channel();
            let (release_tx, release_rx) = mpsc::channel();
            *self.gate.lock().unwrap() = Some((entered_tx, release_rx));
            (entered_rx, release_tx)
        }

        fn focus(&self, window: WindowId) {
            *self.window.lock().unwrap() = Some(window);
        }
    }

    impl FocusProvider for GatedFocus {
        fn current_window(&self) -> Option<WindowId> {
            let gate = self.gate.lock().unwrap().take();
            if let Some((entered, release)) = gate {
                let _ = entered.send(());
                let _ = release.recv_timeout(Duration::from_secs(5));
            }
            self.window.lock().unwrap().clone()
        }
    }

    fn fast_options() -> EngineOptions {
        EngineOptions {
            grace_period: Duration::ZERO,
            poll_interval: Duration::from_millis(5),
            stop_timeout: Duration::from_millis(500),
        }
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_state_from_u8() {
        assert_eq!(SessionState::from(0), SessionState::Stopped);
        assert_eq!(SessionState::from(1), SessionState::Typing);
        assert_eq!(SessionState::from(2), SessionState::Paused);
        assert_eq!(SessionState::from(9), SessionState::Stopped);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::WrongWindow.to_string(), "Paused (Wrong Window)");
        assert_eq!(Status::Failed("boom".into()).to_string(), "Error: boom");
    }

    #[test]
    fn test_toggle_pause_ignores_stopped() {
        let control = SessionControl::new(3);
        assert_eq!(control.toggle_pause(), SessionState::Paused);
        assert_eq!(control.toggle_pause(), SessionState::Typing);
        control.stop();
        assert_eq!(control.toggle_pause(), SessionState::Stopped);
    }

    #[test]
    fn test_empty_text_rejected() {
        let engine = TypingEngine::new(Arc::new(Recorder::default()), Arc::new(NoFocus), fast_options());
        assert!(matches!(engine.start(""), Err(TyperError::EmptyInput)));
        assert_eq!(engine.state(), SessionState::Stopped);
        assert!(engine.snapshot().is_none());
    }

    #[test]
    fn test_types_without_focus_information() {
        let keys = Arc::new(Recorder::default());
        let engine = TypingEngine::new(keys.clone(), Arc::new(NoFocus), fast_options())
            .with_speed(Speed::new(30).unwrap());

        engine.start("hi").unwrap();
        assert!(wait_until(Duration::from_secs(2), || engine.state() == SessionState::Stopped));
        assert_eq!(*keys.typed.lock().unwrap(), "hi");
        assert_eq!(engine.status(), Status::Stopped);
    }

    #[test]
    fn test_injection_failure_reported() {
        let engine = TypingEngine::new(Arc::new(FailingKeys), Arc::new(NoFocus), fast_options());
        engine.start("x").unwrap();
        assert!(wait_until(Duration::from_secs(2), || matches!(
            engine.status(),
            Status::Failed(_)
        )));
        assert_eq!(engine.state(), SessionState::Stopped);
    }

    #[test]
    fn test_pause_resume_without_session() {
        let engine = TypingEngine::new(Arc::new(Recorder::default()), Arc::new(NoFocus), fast_options());
        assert_eq!(engine.pause_resume(), SessionState::Stopped);
        assert_eq!(engine.status(), Status::Stopped);
    }

    #[test]
    fn test_stale_session_cannot_publish() {
        let board = StatusBoard::new();
        board.begin(1);
        board.begin(2);
        board.publish(1, Status::Stopped);
        assert_eq!(*board.tx.borrow(), Status::Typing);
        board.publish(2, Status::Paused);
        assert_eq!(*board.tx.borrow(), Status::Paused);
    }

    #[test]
    fn test_focus_publish_skipped_unless_typing() {
        let board = StatusBoard::new();
        let control = SessionControl::new(4);
        board.begin(1);

        control.toggle_pause();
        board.publish(1, Status::Paused);
        assert!(!board.publish_while_typing(1, &control, Status::WrongWindow));
        assert_eq!(*board.tx.borrow(), Status::Paused);

        control.toggle_pause();
        assert!(board.publish_while_typing(1, &control, Status::WrongWindow));
        assert_eq!(*board.tx.borrow(), Status::WrongWindow);
        assert!(!board.publish_while_typing(2, &control, Status::Typing));
        assert_eq!(*board.tx.borrow(), Status::WrongWindow);
    }

    #[test]
    fn test_pause_during_focus_query_keeps_paused_status() {
        let keys = Arc::new(Recorder::default());
        let focus = Arc::new(GatedFocus::on(WindowId::new(0x100, "editor")));
        let engine = TypingEngine::new(keys.clone(), focus.clone(), fast_options())
            .with_speed(Speed::new(30).unwrap());

        engine.start("p".repeat(200)).unwrap();
        assert!(wait_until(Duration::from_secs(2), || keys.typed.lock().unwrap().len() >= 2));

        let (entered, release) = focus.arm();
        entered.recv_timeout(Duration::from_secs(2)).unwrap();
        focus.focus(WindowId::new(0x200, "browser"));
        assert_eq!(engine.pause_resume(), SessionState::Paused);
        release.send(()).unwrap();

        thread::sleep(Duration::from_millis(100));
        assert_eq!(engine.status(), Status::Paused);
        assert_eq!(engine.state(), SessionState::Paused);
        engine.stop();
    }
}
