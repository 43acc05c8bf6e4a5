use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::as_millis_u64;

/// Identifier of a timer. Assigned by the daemon starting at 1 and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(u64);

impl TimerId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TimerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Running,
    Paused,
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Running => "Running",
            TimerState::Paused => "Paused",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remaining time as sent over the wire, `{"millis": N}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remaining {
    pub millis: u64,
}

impl Remaining {
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }
}

impl From<Duration> for Remaining {
    fn from(duration: Duration) -> Self {
        Self {
            millis: as_millis_u64(duration),
        }
    }
}

/// Snapshot of one timer as reported by `list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerInfo {
    pub id: TimerId,
    pub message: Option<String>,
    pub state: TimerState,
    pub remaining: Remaining,
}
