//! Custom error types for auto-typer.
//!
//! Every failure the control surface can report maps onto one variant of
//! [`TyperError`]. None of them are fatal: the typing session simply does not
//! start, or a rejected shortcut edit leaves the previous bindings active.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for auto-typer operations.
#[derive(Error, Debug)]
pub enum TyperError {
    /// Nothing to type: the text box or the selected file was empty.
    #[error("no input: there is no text to type")]
    EmptyInput,

    /// The selected text file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The selected text file is not valid UTF-8.
    #[error("could not read '{}' (encoding issue): {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// The shortcut is reserved by the operating system.
    #[error("'{shortcut}' is a reserved system shortcut")]
    ReservedShortcut { shortcut: String },

    /// The shortcut string could not be parsed.
    #[error("invalid shortcut '{shortcut}': {reason}")]
    InvalidShortcut { shortcut: String, reason: String },

    /// Two actions were bound to the same key combination.
    #[error("shortcut '{shortcut}' is bound to more than one action")]
    DuplicateShortcut { shortcut: String },

    /// The platform refused to register (or unregister) a global hotkey.
    #[error("failed to register hotkey '{shortcut}': {reason}")]
    HotkeyRegistration { shortcut: String, reason: String },

    /// Typing speed outside the supported range.
    #[error("typing speed {value} is out of range ({min}-{max})")]
    InvalidSpeed { value: i64, min: u8, max: u8 },

    /// Keystroke injection failed.
    #[error("failed to type {ch:?}: {reason}")]
    Injection { ch: char, reason: String },

    /// The keystroke backend could not be initialised.
    #[error("keyboard backend unavailable: {0}")]
    Backend(String),

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for auto-typer operations.
pub type Result<T> = std::result::Result<T, TyperError>;

impl TyperError {
    pub fn file_not_found(path: impl AsRef<Path>) -> Self {
        Self::FileNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn decode(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn reserved_shortcut(shortcut: impl Into<String>) -> Self {
        Self::ReservedShortcut {
            shortcut: shortcut.into(),
        }
    }

    pub fn invalid_shortcut(shortcut: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidShortcut {
            shortcut: shortcut.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate_shortcut(shortcut: impl Into<String>) -> Self {
        Self::DuplicateShortcut {
            shortcut: shortcut.into(),
        }
    }

    pub fn hotkey_registration(shortcut: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HotkeyRegistration {
            shortcut: shortcut.into(),
            reason: reason.into(),
        }
    }

    pub fn injection(ch: char, reason: impl Into<String>) -> Self {
        Self::Injection {
            ch,
            reason: reason.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from user input rather than the platform.
    ///
    /// The console renders these as warnings instead of errors.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::ReservedShortcut { .. }
                | Self::InvalidShortcut { .. }
                | Self::DuplicateShortcut { .. }
                | Self::InvalidSpeed { .. }
        )
    }
}
