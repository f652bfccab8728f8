//! # Auto Typer
//!
//! Types text into whichever window has keyboard focus, one character at a
//! time, the way a person would.
//!
//! ## Features
//!
//! - Type text entered on the command line, in the console, or read from a
//!   UTF-8 text file
//! - Adjustable typing speed (1 = slow, 30 = fast), changeable while typing
//! - Global hotkeys to start, pause/resume and stop without switching windows
//! - Typing pauses automatically while a different window has focus
//! - JSON configuration file support
//!
//! ## Example
//!
//! ```no_run
//! use auto_typer::{EngineOptions, KeySender, PlatformFocus, Speed, TypingEngine};
//! use std::sync::Arc;
//!
//! let engine = TypingEngine::new(
//!     Arc::new(KeySender::new().unwrap()),
//!     Arc::new(PlatformFocus::new()),
//!     EngineOptions::default(),
//! )
//! .with_speed(Speed::new(15).unwrap());
//!
//! // Switch to the target window within two seconds.
//! engine.start("Hello from auto-typer!").unwrap();
//! ```
//!
//! ## Configuration
//!
//! ```json
//! {
//!   "speed": 12,
//!   "start_hotkey": "ctrl+alt+1",
//!   "pause_hotkey": "ctrl+alt+p",
//!   "end_hotkey": "ctrl+alt+e",
//!   "grace_period": "2s"
//! }
//! ```

pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod focus;
pub mod hotkeys;
pub mod input;
pub mod key_sender;
pub mod speed;

pub use config::Config;
pub use console::{ConsoleCommand, ControlPanel, Feedback};
pub use engine::{EngineOptions, SessionSnapshot, SessionState, Status, TypingEngine};
pub use error::{Result, TyperError};
pub use focus::{FocusProvider, PlatformFocus, WindowId};
pub use hotkeys::{Action, HotkeyBackend, HotkeyRegistry, ShortcutBindings};
pub use input::TextSource;
pub use key_sender::{KeySender, Keystrokes};
pub use speed::Speed;
