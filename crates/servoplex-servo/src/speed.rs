use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ServoError;
use crate::link::ActionCode;

/// Coarse speed target reached by repeated relative nudges.
///
/// The remote only exposes "faster" and "slower", so a level is an
/// open-loop approximation: the resulting absolute speed depends on where
/// the actuator started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedLevel {
    Slow = 1,
    Medium = 2,
    Fast = 3,
    Max = 4,
}

impl SpeedLevel {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Level for a wire code; 0 means "keep the current speed".
    pub fn from_code(code: u8) -> Result<Option<Self>, ServoError> {
        match code {
            0 => Ok(None),
            1 => Ok(Some(Self::Slow)),
            2 => Ok(Some(Self::Medium)),
            3 => Ok(Some(Self::Fast)),
            4 => Ok(Some(Self::Max)),
            other => Err(ServoError::InvalidArgument(format!(
                "speed level {other} outside 0..=4"
            ))),
        }
    }

    /// Map a 0–255 slider reading onto a level (`value / 64 + 1`).
    pub fn from_slider(value: u8) -> Self {
        match value / 64 {
            0 => Self::Slow,
            1 => Self::Medium,
            2 => Self::Fast,
            _ => Self::Max,
        }
    }

    /// Nudge command and repetition count that approximate this level.
    pub fn nudge_plan(self) -> (ActionCode, usize) {
        match self {
            Self::Slow => (ActionCode::SpeedDown, 10),
            Self::Medium => (ActionCode::SpeedDown, 5),
            Self::Fast => (ActionCode::SpeedUp, 5),
            Self::Max => (ActionCode::SpeedUp, 10),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Medium => "medium",
            Self::Fast => "fast",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpeedLevel {
    type Err = ServoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_speed(s)? {
            Some(level) => Ok(level),
            None => Err(ServoError::InvalidArgument(
                "speed 0 (keep current) is not a level".to_string(),
            )),
        }
    }
}

/// Parse `0..=4` or a level name. `0` and `keep` yield `None`.
pub fn parse_speed(s: &str) -> Result<Option<SpeedLevel>, ServoError> {
    let s = s.trim();
    if let Ok(code) = s.parse::<u8>() {
        return SpeedLevel::from_code(code);
    }
    match s.to_ascii_lowercase().as_str() {
        "keep" => Ok(None),
        "slow" => Ok(Some(SpeedLevel::Slow)),
        "medium" => Ok(Some(SpeedLevel::Medium)),
        "fast" => Ok(Some(SpeedLevel::Fast)),
        "max" => Ok(Some(SpeedLevel::Max)),
        _ => Err(ServoError::InvalidArgument(format!(
            "unknown speed {s:?} (expected 0-4, slow, medium, fast, max)"
        ))),
    }
}
