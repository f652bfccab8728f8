//! Typing cadence.
//!
//! Speed is an integer control value in `1..=30`. Higher speed means a shorter
//! pause between characters, never shorter than [`MIN_DELAY`].

use crate::error::{Result, TyperError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Shortest pause between two characters.
pub const MIN_DELAY: Duration = Duration::from_millis(30);

/// Pause at speed 1; every other speed divides it.
const BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Speed(u8);

impl Speed {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 30;
    pub const DEFAULT: Speed = Speed(10);

    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TyperError::InvalidSpeed {
                value: value.into(),
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    /// Parses console input such as `"12"`.
    pub fn parse(text: &str) -> Result<Self> {
        let value: i64 = text.trim().parse().map_err(|_| TyperError::InvalidSpeed {
            value: -1,
            min: Self::MIN,
            max: Self::MAX,
        })?;
        u8::try_from(value)
            .map_err(|_| TyperError::InvalidSpeed {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
            .and_then(Self::new)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Pause after each typed character.
    pub fn delay(self) -> Duration {
        (BASE_DELAY / u32::from(self.0)).max(MIN_DELAY)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Speed {
    type Error = TyperError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Speed> for u8 {
    fn from(speed: Speed) -> Self {
        speed.0
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_is_positive_and_non_increasing() {
        let mut previous = Duration::MAX;
        for value in Speed::MIN..=Speed::MAX {
            let delay = Speed::new(value).unwrap().delay();
            assert!(delay > Duration::ZERO, "speed {value} has zero delay");
            assert!(delay >= MIN_DELAY);
            assert!(delay <= previous, "delay increased at speed {value}");
            previous = delay;
        }
    }

    #[test]
    fn test_known_delays() {
        assert_eq!(Speed::new(1).unwrap().delay(), Duration::from_millis(500));
        assert_eq!(Speed::new(10).unwrap().delay(), Duration::from_millis(50));
        assert_eq!(Speed::new(30).unwrap().delay(), MIN_DELAY);
    }

    #[test]
    fn test_out_of_range() {
        assert!(Speed::new(0).is_err());
        assert!(Speed::new(31).is_err());
        assert!(Speed::parse("-3").is_err());
        assert!(Speed::parse("300").is_err());
        assert!(Speed::parse("fast").is_err());
        assert_eq!(Speed::parse(" 7 ").unwrap().get(), 7);
    }

    #[test]
    fn test_serde() {
        let speed: Speed = serde_json::from_str("12").unwrap();
        assert_eq!(speed.get(), 12);
        assert!(serde_json::from_str::<Speed>("0").is_err());
        assert_eq!(serde_json::to_string(&speed).unwrap(), "12");
    }
}
