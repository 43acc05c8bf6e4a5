//! Timer events

use chrono::{DateTime, Utc};
use sand_core::timer::TimerId;
use serde::{Deserialize, Serialize};

/// Event emitted by the timer system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerEvent {
    pub event_type: TimerEventType,
    pub timer_id: TimerId,
    pub timestamp: DateTime<Utc>,
}

/// Types of timer events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEventType {
    /// Timer started (also emitted for `again`)
    Started {
        duration_millis: u64,
        message: Option<String>,
    },
    /// Timer paused
    Paused { remaining_millis: u64 },
    /// Timer resumed
    Resumed { remaining_millis: u64 },
    /// Timer cancelled by a client
    Cancelled,
    /// Timer ran out and was removed
    Expired,
}

impl TimerEvent {
    /// Create a new timer event
    pub fn new(event_type: TimerEventType, timer_id: TimerId) -> Self {
        Self {
            event_type,
            timer_id,
            timestamp: Utc::now(),
        }
    }

    pub fn started(timer_id: TimerId, duration_millis: u64, message: Option<String>) -> Self {
        Self::new(
            TimerEventType::Started {
                duration_millis,
                message,
            },
            timer_id,
        )
    }

    pub fn paused(timer_id: TimerId, remaining_millis: u64) -> Self {
        Self::new(TimerEventType::Paused { remaining_millis }, timer_id)
    }

    pub fn resumed(timer_id: TimerId, remaining_millis: u64) -> Self {
        Self::new(TimerEventType::Resumed { remaining_millis }, timer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_event_creation() {
        let event = TimerEvent::started(TimerId::new(3), 60_000, Some("tea".to_string()));

        assert_eq!(event.timer_id, TimerId::new(3));
        match event.event_type {
            TimerEventType::Started {
                duration_millis,
                message,
            } => {
                assert_eq!(duration_millis, 60_000);
                assert_eq!(message.as_deref(), Some("tea"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_timer_event_serialization() {
        let event = TimerEvent::new(TimerEventType::Expired, TimerId::new(1));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"]["type"], "expired");
        assert_eq!(json["timer_id"], 1);
    }
}
