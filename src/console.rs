//! Terminal control panel.
//!
//! Stands in for the buttons, slider and text box of a desktop control panel:
//! each console line is parsed into a [`ConsoleCommand`] and, like hotkey
//! [`Action`]s, dispatched through [`ControlPanel`]. Errors are returned to
//! the caller for display and never end the program.

use crate::engine::{SessionState, TypingEngine};
use crate::error::{Result, TyperError};
use crate::hotkeys::{Action, HotkeyBackend, HotkeyRegistry};
use crate::input::{self, TextSource};
use crate::speed::Speed;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub const HELP: &str = "\
commands:
  start                 start typing the current text
  pause | resume        pause or resume typing
  stop | end            stop typing
  text <text>           set the text to type
  file <path>           type the contents of a UTF-8 text file
  speed <1-30>          set typing speed
  bind <action> <keys>  rebind start, pause or end (e.g. bind pause ctrl+alt+9)
  status                show current status and bindings
  help                  show this help
  quit                  exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    PauseResume,
    Stop,
    SetText(String),
    TypeFile(PathBuf),
    Speed(Speed),
    Bind(Action, String),
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim_start();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match word.to_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "pause" | "resume" | "p" => Ok(Self::PauseResume),
            "stop" | "end" => Ok(Self::Stop),
            "text" => Ok(Self::SetText(rest.to_string())),
            "file" if !rest.is_empty() => Ok(Self::TypeFile(PathBuf::from(rest))),
            "file" => Err("usage: file <path>".to_string()),
            "speed" => Speed::parse(rest).map(Self::Speed).map_err(|e| e.to_string()),
            "bind" => {
                let (name, keys) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: bind <start|pause|end> <keys>".to_string())?;
                let action = Action::from_name(name)
                    .ok_or_else(|| format!("unknown action '{name}' (start, pause, end)"))?;
                Ok(Self::Bind(action, keys.trim().to_string()))
            }
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command '{other}', type 'help'")),
        }
    }
}

/// Result of handling one command, for the caller to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Nothing to print; the status line will update on its own.
    Silent,
    Message(String),
    Quit,
}

pub struct ControlPanel<B: HotkeyBackend> {
    engine: Arc<TypingEngine>,
    hotkeys: HotkeyRegistry<B>,
    source: Option<TextSource>,
    trim_input: bool,
}

impl<B: HotkeyBackend> ControlPanel<B> {
    pub fn new(engine: Arc<TypingEngine>, hotkeys: HotkeyRegistry<B>, trim_input: bool) -> Self {
        Self {
            engine,
            hotkeys,
            source: None,
            trim_input,
        }
    }

    pub fn with_source(mut self, source: Option<TextSource>) -> Self {
        self.source = source;
        self
    }

    pub fn engine(&self) -> &TypingEngine {
        &self.engine
    }

    pub fn hotkeys(&self) -> &HotkeyRegistry<B> {
        &self.hotkeys
    }

    pub fn source(&self) -> Option<&TextSource> {
        self.source.as_ref()
    }

    /// Handles a global hotkey.
    pub fn handle_action(&mut self, action: Action) -> Result<Feedback> {
        match action {
            Action::Start => self.start(),
            Action::PauseResume => {
                self.engine.pause_resume();
                Ok(Feedback::Silent)
            }
            Action::End => {
                self.engine.stop();
                Ok(Feedback::Silent)
            }
        }
    }

    pub fn handle_command(&mut self, command: ConsoleCommand) -> Result<Feedback> {
        match command {
            ConsoleCommand::Start => self.start(),
            ConsoleCommand::PauseResume => self.handle_action(Action::PauseResume),
            ConsoleCommand::Stop => self.handle_action(Action::End),
            ConsoleCommand::SetText(text) => {
                let source = TextSource::Inline(text);
                // Validate now so an empty text box is reported right away.
                input::load_text(&source, self.trim_input)?;
                let message = format!("text set ({})", source.describe());
                self.source = Some(source);
                Ok(Feedback::Message(message))
            }
            ConsoleCommand::TypeFile(path) => {
                let source = TextSource::File(path);
                let text = input::load_text(&source, self.trim_input)?;
                self.engine.start(text)?;
                info!(source = %source.describe(), "typing from file");
                self.source = Some(source);
                Ok(Feedback::Silent)
            }
            ConsoleCommand::Speed(speed) => {
                self.engine.set_speed(speed);
                Ok(Feedback::Message(format!("speed set to {speed}")))
            }
            ConsoleCommand::Bind(action, keys) => {
                self.hotkeys.bind(action, &keys)?;
                Ok(Feedback::Message(format!(
                    "shortcuts updated: {}",
                    self.hotkeys.bindings()
                )))
            }
            ConsoleCommand::Status => Ok(Feedback::Message(self.describe())),
            ConsoleCommand::Help => Ok(Feedback::Message(HELP.to_string())),
            ConsoleCommand::Quit => {
                self.shutdown();
                Ok(Feedback::Quit)
            }
        }
    }

    /// Stops typing and releases every hotkey.
    pub fn shutdown(&mut self) {
        self.engine.stop();
        self.hotkeys.clear();
    }

    fn start(&mut self) -> Result<Feedback> {
        let source = self.source.as_ref().ok_or(TyperError::EmptyInput)?;
        let text = input::load_text(source, self.trim_input)?;
        self.engine.start(text)?;
        Ok(Feedback::Silent)
    }

    fn describe(&self) -> String {
        let mut lines = vec![format!("Status: {}", self.engine.status())];
        if let Some(snapshot) = self.engine.snapshot() {
            if snapshot.state != SessionState::Stopped || snapshot.typed > 0 {
                lines.push(format!("Progress: {}/{}", snapshot.typed, snapshot.total));
            }
            if let Some(target) = snapshot.target {
                lines.push(format!("Target: {target}"));
            }
        }
        lines.push(format!("Speed: {}", self.engine.speed()));
        lines.push(format!("Active: {}", self.hotkeys.bindings()));
        if let Some(source) = &self.source {
            lines.push(format!("Input: {}", source.describe()));
        }
        lines.join("\n")
    }
}
