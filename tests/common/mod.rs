//! In-memory stand-ins for the keyboard, window focus and hotkey platform.

#![allow(dead_code)]

use auto_typer::hotkeys::Shortcut;
use auto_typer::{EngineOptions, FocusProvider, HotkeyBackend, Keystrokes, TyperError, WindowId};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Records every typed character with the time it was sent.
#[derive(Default)]
pub struct RecordingKeys {
    strokes: Mutex<Vec<(char, Instant)>>,
}

impl RecordingKeys {
    pub fn text(&self) -> String {
        self.strokes.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    pub fn count(&self) -> usize {
        self.strokes.lock().unwrap().len()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.strokes.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

impl Keystrokes for RecordingKeys {
    fn type_char(&self, ch: char) -> auto_typer::Result<()> {
        self.strokes.lock().unwrap().push((ch, Instant::now()));
        Ok(())
    }
}

/// Focus that tests move around by hand.
pub struct FakeFocus {
    current: Mutex<Option<WindowId>>,
}

impl FakeFocus {
    pub fn on(window: Option<WindowId>) -> Self {
        Self {
            current: Mutex::new(window),
        }
    }

    pub fn focus(&self, window: Option<WindowId>) {
        *self.current.lock().unwrap() = window;
    }
}

impl FocusProvider for FakeFocus {
    fn current_window(&self) -> Option<WindowId> {
        self.current.lock().unwrap().clone()
    }
}

/// Hotkey backend that remembers registrations and can refuse one combo.
#[derive(Default)]
pub struct FakeBackend {
    pub registered: Vec<String>,
    pub refuse: Option<String>,
}

impl HotkeyBackend for FakeBackend {
    fn register(&mut self, shortcut: &Shortcut) -> auto_typer::Result<()> {
        if self.refuse.as_deref() == Some(shortcut.canonical()) {
            return Err(TyperError::hotkey_registration(
                shortcut.canonical(),
                "already registered by another application",
            ));
        }
        self.registered.push(shortcut.canonical().to_string());
        Ok(())
    }

    fn unregister(&mut self, shortcut: &Shortcut) -> auto_typer::Result<()> {
        self.registered.retain(|s| s != shortcut.canonical());
        Ok(())
    }
}

pub fn editor() -> WindowId {
    WindowId::new(0x100, "notes.txt - Editor")
}

pub fn browser() -> WindowId {
    WindowId::new(0x200, "Browser")
}

pub fn control_window() -> WindowId {
    WindowId::new(0x300, "auto-typer")
}

pub fn fast_options() -> EngineOptions {
    EngineOptions {
        grace_period: Duration::ZERO,
        poll_interval: Duration::from_millis(5),
        stop_timeout: Duration::from_millis(500),
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
