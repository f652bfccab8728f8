//! Configuration file support.
//!
//! Settings are read from a JSON file and may be overridden from the command
//! line. Durations are written as strings such as `"100ms"`, `"2s"` or
//! `"1m"`; a bare number is taken as milliseconds.

use crate::engine::EngineOptions;
use crate::error::{Result, TyperError};
use crate::hotkeys::ShortcutBindings;
use crate::speed::Speed;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub speed: Speed,

    #[serde(default = "default_start_hotkey")]
    pub start_hotkey: String,

    #[serde(default = "default_pause_hotkey")]
    pub pause_hotkey: String,

    #[serde(default = "default_end_hotkey")]
    pub end_hotkey: String,

    /// Time given to the user to switch to the target window.
    #[serde(default = "default_grace_period", with = "duration_str")]
    pub grace_period: Duration,

    /// How often paused or wrong-window sessions re-check their state.
    #[serde(default = "default_poll_interval", with = "duration_str")]
    pub poll_interval: Duration,

    /// How long `stop` waits for the typing thread before detaching it.
    #[serde(default = "default_stop_timeout", with = "duration_str")]
    pub stop_timeout: Duration,

    /// Strip surrounding whitespace from text entered directly.
    #[serde(default = "default_true")]
    pub trim_input: bool,

    #[serde(default)]
    pub verbose: bool,
}

fn default_start_hotkey() -> String {
    "ctrl+alt+1".to_string()
}

fn default_pause_hotkey() -> String {
    "ctrl+alt+p".to_string()
}

fn default_end_hotkey() -> String {
    "ctrl+alt+e".to_string()
}

fn default_grace_period() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_stop_timeout() -> Duration {
    Duration::from_millis(500)
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            speed: Speed::default(),
            start_hotkey: default_start_hotkey(),
            pause_hotkey: default_pause_hotkey(),
            end_hotkey: default_end_hotkey(),
            grace_period: default_grace_period(),
            poll_interval: default_poll_interval(),
            stop_timeout: default_stop_timeout(),
            trim_input: true,
            verbose: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| TyperError::config_load(path, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| TyperError::config_load(path, e.to_string()))
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| TyperError::config_save(path, e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(TyperError::config_validation(
                "poll_interval must be greater than zero",
            ));
        }
        if self.stop_timeout.is_zero() {
            return Err(TyperError::config_validation(
                "stop_timeout must be greater than zero",
            ));
        }
        self.bindings().parse()?;
        Ok(())
    }

    pub fn bindings(&self) -> ShortcutBindings {
        ShortcutBindings {
            start: self.start_hotkey.clone(),
            pause_resume: self.pause_hotkey.clone(),
            end: self.end_hotkey.clone(),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            grace_period: self.grace_period,
            poll_interval: self.poll_interval,
            stop_timeout: self.stop_timeout,
        }
    }
}

/// Parses `"250ms"`, `"2s"`, `"1m"` or a bare millisecond count.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(TyperError::invalid_duration(value, "empty duration"));
    }

    let (number, unit) = if let Some(n) = normalized.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = normalized.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = normalized.strip_suffix('m') {
        (n, "m")
    } else {
        (normalized.as_str(), "ms")
    };

    let amount: u64 = number
        .trim()
        .parse()
        .map_err(|_| TyperError::invalid_duration(value, "expected a non-negative integer"))?;

    let scale: u64 = match unit {
        "s" => 1_000,
        "m" => 60_000,
        _ => 1,
    };
    // Kept in whole milliseconds so the value survives a save and reload.
    let millis = amount
        .checked_mul(scale)
        .ok_or_else(|| TyperError::invalid_duration(value, "duration too large"))?;
    Ok(Duration::from_millis(millis))
}

mod duration_str {
    use super::parse_duration;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", value.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_duration(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("750").unwrap(), Duration::from_millis(750));
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert!(matches!(
            parse_duration("999999999999999999m"),
            Err(TyperError::InvalidDuration { .. })
        ));
        assert!(parse_duration("18446744073709552s").is_err());
        assert_eq!(
            parse_duration("18446744073709551s").unwrap(),
            Duration::from_millis(18_446_744_073_709_551_000)
        );
    }

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.speed.get(), 10);
        assert_eq!(config.grace_period, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = Config {
            poll_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TyperError::ConfigValidation(_))
        ));
    }

    #[test]
    fn test_reserved_hotkey_rejected() {
        let config = Config {
            end_hotkey: "alt+f4".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TyperError::ReservedShortcut { .. })
        ));
    }
}
