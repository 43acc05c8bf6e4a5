use std::time::Duration;

use sand_core::timer::{TimerId, TimerInfo, TimerState};
use tokio::time::Instant;

use super::registry::{Result, TimerError};

/// One countdown. Remaining time is derived on demand from the accumulated
/// running time, so reading it never mutates the timer.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    id: TimerId,
    duration: Duration,
    message: Option<String>,
    state: TimerState,
    /// Start of the current running interval. Only meaningful while running.
    started_at: Instant,
    /// Running time consumed by earlier intervals, folded in on pause.
    accumulated: Duration,
}

impl Timer {
    pub fn new(id: TimerId, duration: Duration, message: Option<String>, now: Instant) -> Self {
        Self {
            id,
            duration,
            message,
            state: TimerState::Running,
            started_at: now,
            accumulated: Duration::ZERO,
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.state {
            TimerState::Running => self
                .accumulated
                .saturating_add(now.saturating_duration_since(self.started_at)),
            TimerState::Paused => self.accumulated,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration.saturating_sub(self.elapsed(now))
    }

    /// Instant at which a running timer reaches zero. `None` while paused, or
    /// if the deadline is too far out to represent.
    pub fn deadline(&self) -> Option<Instant> {
        if !self.is_running() {
            return None;
        }
        self.started_at
            .checked_add(self.duration.saturating_sub(self.accumulated))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.is_running() && self.remaining(now).is_zero()
    }

    pub fn pause(&mut self, now: Instant) -> Result<()> {
        if self.state != TimerState::Running {
            return Err(TimerError::AlreadyPaused(self.id));
        }

        self.accumulated = self.elapsed(now);
        self.state = TimerState::Paused;
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> Result<()> {
        if self.state != TimerState::Paused {
            return Err(TimerError::AlreadyRunning(self.id));
        }

        self.started_at = now;
        self.state = TimerState::Running;
        Ok(())
    }

    pub fn info(&self, now: Instant) -> TimerInfo {
        TimerInfo {
            id: self.id,
            message: self.message.clone(),
            state: self.state,
            remaining: self.remaining(now).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_new_timer_is_running() {
        let now = Instant::now();
        let timer = Timer::new(TimerId::new(1), secs(600), None, now);

        assert!(timer.is_running());
        assert_eq!(timer.remaining(now), secs(600));
        assert_eq!(timer.deadline(), Some(now + secs(600)));
    }

    #[test]
    fn test_remaining_counts_down_and_floors_at_zero() {
        let now = Instant::now();
        let timer = Timer::new(TimerId::new(1), secs(10), None, now);

        assert_eq!(timer.remaining(now + secs(4)), secs(6));
        assert_eq!(timer.remaining(now + secs(10)), Duration::ZERO);
        assert_eq!(timer.remaining(now + secs(60)), Duration::ZERO);
        assert!(timer.is_expired(now + secs(10)));
        assert!(!timer.is_expired(now + secs(9)));
    }

    #[test]
    fn test_pause_freezes_remaining() {
        let now = Instant::now();
        let mut timer = Timer::new(TimerId::new(1), secs(10), None, now);

        timer.pause(now + secs(3)).unwrap();
        assert!(timer.is_paused());
        assert_eq!(timer.remaining(now + secs(3)), secs(7));
        assert_eq!(timer.remaining(now + secs(300)), secs(7));
        assert_eq!(timer.deadline(), None);
        assert!(!timer.is_expired(now + secs(300)));
    }

    #[test]
    fn test_resume_reschedules_deadline() {
        let now = Instant::now();
        let mut timer = Timer::new(TimerId::new(1), secs(10), None, now);

        timer.pause(now + secs(3)).unwrap();
        timer.resume(now + secs(20)).unwrap();

        assert!(timer.is_running());
        assert_eq!(timer.remaining(now + secs(20)), secs(7));
        assert_eq!(timer.remaining(now + secs(25)), secs(2));
        assert_eq!(timer.deadline(), Some(now + secs(27)));
    }

    #[test]
    fn test_invalid_transitions() {
        let now = Instant::now();
        let mut timer = Timer::new(TimerId::new(4), secs(10), None, now);

        assert!(matches!(
            timer.resume(now),
            Err(TimerError::AlreadyRunning(id)) if id == TimerId::new(4)
        ));

        timer.pause(now).unwrap();
        assert!(matches!(
            timer.pause(now),
            Err(TimerError::AlreadyPaused(id)) if id == TimerId::new(4)
        ));
        // Failed transitions leave the timer untouched.
        assert!(timer.is_paused());
        assert_eq!(timer.remaining(now), secs(10));
    }

    #[test]
    fn test_info_snapshot() {
        let now = Instant::now();
        let timer = Timer::new(
            TimerId::new(2),
            secs(5),
            Some("Hello, world!".to_string()),
            now,
        );

        let info = timer.info(now + Duration::from_millis(1500));
        assert_eq!(info.id, TimerId::new(2));
        assert_eq!(info.message.as_deref(), Some("Hello, world!"));
        assert_eq!(info.state, TimerState::Running);
        assert_eq!(info.remaining.millis, 3500);
    }
}
