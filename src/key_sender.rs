//! Keystroke injection.
//!
//! [`Keystrokes`] is the seam between the typing engine and the operating
//! system. [`KeySender`] implements it on top of `enigo`, which synthesizes
//! input events for whichever window has focus.

use crate::error::{Result, TyperError};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::sync::Mutex;
use tracing::trace;

/// Something that can type a single character into the focused window.
pub trait Keystrokes: Send + Sync {
    fn type_char(&self, ch: char) -> Result<()>;
}

/// How a character is delivered to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    /// Press a named key (line breaks, tabs).
    Key(NamedKey),
    /// Type the character as text.
    Text(char),
    /// Emit nothing (carriage returns of CRLF line endings).
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Return,
    Tab,
}

/// Maps a character of the input text onto the stroke that types it.
pub fn stroke_for(ch: char) -> Stroke {
    match ch {
        '\r' => Stroke::Skip,
        '\n' => Stroke::Key(NamedKey::Return),
        '\t' => Stroke::Key(NamedKey::Tab),
        other => Stroke::Text(other),
    }
}

pub struct KeySender {
    enigo: Mutex<Enigo>,
}

impl KeySender {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| TyperError::backend(format!("failed to create Enigo: {e}")))?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }
}

impl Keystrokes for KeySender {
    fn type_char(&self, ch: char) -> Result<()> {
        let mut enigo = self
            .enigo
            .lock()
            .map_err(|_| TyperError::injection(ch, "keyboard backend lock poisoned"))?;

        trace!(?ch, "typing character");
        let result = match stroke_for(ch) {
            Stroke::Skip => return Ok(()),
            Stroke::Key(NamedKey::Return) => enigo.key(Key::Return, Direction::Click),
            Stroke::Key(NamedKey::Tab) => enigo.key(Key::Tab, Direction::Click),
            Stroke::Text(c) => {
                let mut buf = [0u8; 4];
                enigo.text(c.encode_utf8(&mut buf))
            }
        };

        result.map_err(|e| TyperError::injection(ch, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strokes() {
        assert_eq!(stroke_for('a'), Stroke::Text('a'));
        assert_eq!(stroke_for('ü'), Stroke::Text('ü'));
        assert_eq!(stroke_for('\n'), Stroke::Key(NamedKey::Return));
        assert_eq!(stroke_for('\t'), Stroke::Key(NamedKey::Tab));
        assert_eq!(stroke_for('\r'), Stroke::Skip);
    }
}
