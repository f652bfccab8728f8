//! Global hotkeys.
//!
//! Shortcut strings such as `"ctrl+alt+1"` are parsed into
//! [`global_hotkey`] hotkeys, checked against a list of combinations the
//! operating system reserves, and registered as one set. Pressed hotkeys are
//! forwarded as [`Action`]s over a channel; the listener never touches typing
//! state itself.

use crate::error::{Result, TyperError};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Combinations that close, kill or copy/paste in the focused application.
const RESERVED_SHORTCUTS: &[&str] = &[
    "ctrl+alt+delete",
    "alt+f4",
    "ctrl+c",
    "ctrl+v",
    "ctrl+shift+escape",
    "super+q",
    "alt+super+escape",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Start,
    PauseResume,
    End,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Start, Action::PauseResume, Action::End];

    /// Parses the action names used by the console (`start`, `pause`, `end`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "pause" | "resume" | "pause_resume" | "pause-resume" => Some(Self::PauseResume),
            "end" | "stop" => Some(Self::End),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => write!(f, "Start"),
            Action::PauseResume => write!(f, "Pause"),
            Action::End => write!(f, "End"),
        }
    }
}

/// A validated key combination.
#[derive(Debug, Clone)]
pub struct Shortcut {
    canonical: String,
    hotkey: HotKey,
}

impl Shortcut {
    /// Normalized text, e.g. `"ctrl+alt+delete"` for `"Alt+Ctrl+Del"`.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn hotkey(&self) -> &HotKey {
        &self.hotkey
    }

    pub fn id(&self) -> u32 {
        self.hotkey.id()
    }
}

impl PartialEq for Shortcut {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Parses and validates a shortcut string.
pub fn parse_shortcut(text: &str) -> Result<Shortcut> {
    let binding = text.trim().to_lowercase();
    if binding.is_empty() {
        return Err(TyperError::invalid_shortcut(text, "empty shortcut"));
    }

    let mut modifiers = Modifiers::empty();
    let mut key = None;

    for part in binding.split('+').map(str::trim) {
        match part {
            "" => return Err(TyperError::invalid_shortcut(text, "empty key name")),
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" | "option" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            "meta" | "cmd" | "super" | "win" => modifiers |= Modifiers::SUPER,
            name => {
                if key.is_some() {
                    return Err(TyperError::invalid_shortcut(text, "multiple keys specified"));
                }
                key = Some(parse_key_code(name).ok_or_else(|| {
                    TyperError::invalid_shortcut(text, format!("unsupported key '{name}'"))
                })?);
            }
        }
    }

    let (code, key_name) = key.ok_or_else(|| TyperError::invalid_shortcut(text, "no key specified"))?;

    let mut canonical = String::new();
    for (flag, name) in [
        (Modifiers::CONTROL, "ctrl"),
        (Modifiers::ALT, "alt"),
        (Modifiers::SHIFT, "shift"),
        (Modifiers::SUPER, "super"),
    ] {
        if modifiers.contains(flag) {
            canonical.push_str(name);
            canonical.push('+');
        }
    }
    canonical.push_str(key_name);

    if RESERVED_SHORTCUTS.contains(&canonical.as_str()) {
        return Err(TyperError::reserved_shortcut(text.trim()));
    }

    let mods = if modifiers.is_empty() { None } else { Some(modifiers) };
    Ok(Shortcut {
        canonical,
        hotkey: HotKey::new(mods, code),
    })
}

fn parse_key_code(key: &str) -> Option<(Code, &'static str)> {
    let parsed = match key {
        // Letters
        "a" => (Code::KeyA, "a"),
        "b" => (Code::KeyB, "b"),
        "c" => (Code::KeyC, "c"),
        "d" => (Code::KeyD, "d"),
        "e" => (Code::KeyE, "e"),
        "f" => (Code::KeyF, "f"),
        "g" => (Code::KeyG, "g"),
        "h" => (Code::KeyH, "h"),
        "i" => (Code::KeyI, "i"),
        "j" => (Code::KeyJ, "j"),
        "k" => (Code::KeyK, "k"),
        "l" => (Code::KeyL, "l"),
        "m" => (Code::KeyM, "m"),
        "n" => (Code::KeyN, "n"),
        "o" => (Code::KeyO, "o"),
        "p" => (Code::KeyP, "p"),
        "q" => (Code::KeyQ, "q"),
        "r" => (Code::KeyR, "r"),
        "s" => (Code::KeyS, "s"),
        "t" => (Code::KeyT, "t"),
        "u" => (Code::KeyU, "u"),
        "v" => (Code::KeyV, "v"),
        "w" => (Code::KeyW, "w"),
        "x" => (Code::KeyX, "x"),
        "y" => (Code::KeyY, "y"),
        "z" => (Code::KeyZ, "z"),

        // Numbers
        "0" => (Code::Digit0, "0"),
        "1" => (Code::Digit1, "1"),
        "2" => (Code::Digit2, "2"),
        "3" => (Code::Digit3, "3"),
        "4" => (Code::Digit4, "4"),
        "5" => (Code::Digit5, "5"),
        "6" => (Code::Digit6, "6"),
        "7" => (Code::Digit7, "7"),
        "8" => (Code::Digit8, "8"),
        "9" => (Code::Digit9, "9"),

        // Function keys
        "f1" => (Code::F1, "f1"),
        "f2" => (Code::F2, "f2"),
        "f3" => (Code::F3, "f3"),
        "f4" => (Code::F4, "f4"),
        "f5" => (Code::F5, "f5"),
        "f6" => (Code::F6, "f6"),
        "f7" => (Code::F7, "f7"),
        "f8" => (Code::F8, "f8"),
        "f9" => (Code::F9, "f9"),
        "f10" => (Code::F10, "f10"),
        "f11" => (Code::F11, "f11"),
        "f12" => (Code::F12, "f12"),

        // Special keys
        "space" => (Code::Space, "space"),
        "enter" | "return" => (Code::Enter, "enter"),
        "tab" => (Code::Tab, "tab"),
        "escape" | "esc" => (Code::Escape, "escape"),
        "backspace" => (Code::Backspace, "backspace"),
        "delete" | "del" => (Code::Delete, "delete"),
        "insert" | "ins" => (Code::Insert, "insert"),
        "home" => (Code::Home, "home"),
        "end" => (Code::End, "end"),
        "pageup" => (Code::PageUp, "pageup"),
        "pagedown" => (Code::PageDown, "pagedown"),

        // Arrow keys
        "up" | "arrowup" => (Code::ArrowUp, "up"),
        "down" | "arrowdown" => (Code::ArrowDown, "down"),
        "left" | "arrowleft" => (Code::ArrowLeft, "left"),
        "right" | "arrowright" => (Code::ArrowRight, "right"),

        _ => return None,
    };

    Some(parsed)
}

/// Shortcut text for each action, as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutBindings {
    pub start: String,
    pub pause_resume: String,
    pub end: String,
}

impl Default for ShortcutBindings {
    fn default() -> Self {
        Self {
            start: "ctrl+alt+1".to_string(),
            pause_resume: "ctrl+alt+p".to_string(),
            end: "ctrl+alt+e".to_string(),
        }
    }
}

impl ShortcutBindings {
    pub fn get(&self, action: Action) -> &str {
        match action {
            Action::Start => &self.start,
            Action::PauseResume => &self.pause_resume,
            Action::End => &self.end,
        }
    }

    pub fn set(&mut self, action: Action, shortcut: impl Into<String>) {
        let shortcut = shortcut.into();
        match action {
            Action::Start => self.start = shortcut,
            Action::PauseResume => self.pause_resume = shortcut,
            Action::End => self.end = shortcut,
        }
    }

    /// Validates every binding and rejects combinations used twice.
    pub fn parse(&self) -> Result<Vec<(Action, Shortcut)>> {
        let mut parsed: Vec<(Action, Shortcut)> = Vec::with_capacity(Action::ALL.len());
        for action in Action::ALL {
            let shortcut = parse_shortcut(self.get(action))?;
            if parsed.iter().any(|(_, other)| *other == shortcut) {
                return Err(TyperError::duplicate_shortcut(shortcut.canonical()));
            }
            parsed.push((action, shortcut));
        }
        Ok(parsed)
    }
}

impl fmt::Display for ShortcutBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Start: {} | Pause: {} | End: {}",
            self.start, self.pause_resume, self.end
        )
    }
}

/// Platform hotkey registration.
pub trait HotkeyBackend {
    fn register(&mut self, shortcut: &Shortcut) -> Result<()>;
    fn unregister(&mut self, shortcut: &Shortcut) -> Result<()>;
}

impl HotkeyBackend for GlobalHotKeyManager {
    fn register(&mut self, shortcut: &Shortcut) -> Result<()> {
        GlobalHotKeyManager::register(self, *shortcut.hotkey())
            .map_err(|e| TyperError::hotkey_registration(shortcut.canonical(), e.to_string()))
    }

    fn unregister(&mut self, shortcut: &Shortcut) -> Result<()> {
        GlobalHotKeyManager::unregister(self, *shortcut.hotkey())
            .map_err(|e| TyperError::hotkey_registration(shortcut.canonical(), e.to_string()))
    }
}

/// Maps registered hotkey ids to actions; shared with the listener thread.
#[derive(Debug, Clone, Default)]
pub struct HotkeyRoutes {
    inner: Arc<RwLock<HashMap<u32, Action>>>,
}

impl HotkeyRoutes {
    pub fn resolve(&self, id: u32) -> Option<Action> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
    }

    fn replace(&self, active: &[(Action, Shortcut)]) {
        let routes = active.iter().map(|(action, s)| (s.id(), *action)).collect();
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = routes;
    }
}

/// The set of currently registered hotkeys.
pub struct HotkeyRegistry<B: HotkeyBackend> {
    backend: B,
    bindings: ShortcutBindings,
    active: Vec<(Action, Shortcut)>,
    routes: HotkeyRoutes,
}

impl<B: HotkeyBackend> HotkeyRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            bindings: ShortcutBindings::default(),
            active: Vec::new(),
            routes: HotkeyRoutes::default(),
        }
    }

    pub fn routes(&self) -> HotkeyRoutes {
        self.routes.clone()
    }

    /// Bindings that were last applied successfully.
    pub fn bindings(&self) -> &ShortcutBindings {
        &self.bindings
    }

    pub fn active(&self) -> impl Iterator<Item = (Action, &Shortcut)> {
        self.active.iter().map(|(action, shortcut)| (*action, shortcut))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Rebinds one action, keeping the other two.
    pub fn bind(&mut self, action: Action, shortcut: &str) -> Result<()> {
        let mut next = self.bindings.clone();
        next.set(action, shortcut.trim());
        self.apply_all(&next)
    }

    /// Replaces every registration with `bindings`.
    ///
    /// Nothing changes if any binding is invalid. If the platform refuses one
    /// of the new hotkeys, the previous set is registered again.
    pub fn apply_all(&mut self, bindings: &ShortcutBindings) -> Result<()> {
        let parsed = bindings.parse()?;

        let previous = std::mem::take(&mut self.active);
        self.unregister_all(&previous);

        let mut installed: Vec<(Action, Shortcut)> = Vec::with_capacity(parsed.len());
        for (action, shortcut) in parsed {
            if let Err(e) = self.backend.register(&shortcut) {
                warn!(%action, shortcut = %shortcut, error = %e, "hotkey registration failed, restoring previous bindings");
                self.unregister_all(&installed);
                self.active = self.register_all(previous);
                self.routes.replace(&self.active);
                return Err(e);
            }
            debug!(%action, shortcut = %shortcut, "registered hotkey");
            installed.push((action, shortcut));
        }

        self.active = installed;
        self.routes.replace(&self.active);
        self.bindings = bindings.clone();
        info!(bindings = %self.bindings, "hotkeys updated");
        Ok(())
    }

    /// Unregisters everything; used on shutdown.
    pub fn clear(&mut self) {
        let active = std::mem::take(&mut self.active);
        self.unregister_all(&active);
        self.routes.replace(&self.active);
    }

    fn unregister_all(&mut self, shortcuts: &[(Action, Shortcut)]) {
        for (action, shortcut) in shortcuts {
            if let Err(e) = self.backend.unregister(shortcut) {
                warn!(%action, error = %e, "failed to unregister hotkey");
            }
        }
    }

    fn register_all(&mut self, shortcuts: Vec<(Action, Shortcut)>) -> Vec<(Action, Shortcut)> {
        let mut registered = Vec::with_capacity(shortcuts.len());
        for (action, shortcut) in shortcuts {
            match self.backend.register(&shortcut) {
                Ok(()) => registered.push((action, shortcut)),
                Err(e) => warn!(%action, error = %e, "failed to restore hotkey"),
            }
        }
        registered
    }
}

/// Forwards pressed hotkeys as actions until the receiving side is dropped.
pub fn spawn_hotkey_listener(
    routes: HotkeyRoutes,
    actions: mpsc::UnboundedSender<Action>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let receiver = GlobalHotKeyEvent::receiver();
        while !actions.is_closed() {
            let Ok(event) = receiver.recv_timeout(Duration::from_millis(100)) else {
                continue;
            };
            if event.state != HotKeyState::Pressed {
                continue;
            }
            match routes.resolve(event.id) {
                Some(action) => {
                    debug!(%action, "hotkey pressed");
                    if actions.send(action).is_err() {
                        break;
                    }
                }
                None => debug!(id = event.id, "ignoring unknown hotkey"),
            }
        }
    })
}
