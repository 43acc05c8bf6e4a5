//! Timer registry - owns every live timer and hands out ids

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use sand_core::protocol::ErrorKind;
use sand_core::timer::{TimerId, TimerInfo};
use tokio::time::Instant;

use super::countdown::Timer;

/// Timer registry error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    #[error("Timer not found: {0}")]
    NotFound(TimerId),

    #[error("Timer {0} is already paused")]
    AlreadyPaused(TimerId),

    #[error("Timer {0} is already running")]
    AlreadyRunning(TimerId),

    #[error("No timer has been started yet")]
    NonePreviouslyStarted,
}

impl From<TimerError> for ErrorKind {
    fn from(error: TimerError) -> Self {
        match error {
            TimerError::NotFound(_) => ErrorKind::TimerNotFound,
            TimerError::AlreadyPaused(_) => ErrorKind::AlreadyPaused,
            TimerError::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            TimerError::NonePreviouslyStarted => ErrorKind::NonePreviouslyStarted,
        }
    }
}

pub type Result<T> = std::result::Result<T, TimerError>;

/// A timer that ran out, as handed to the expiry hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredTimer {
    pub id: TimerId,
    pub duration: Duration,
    pub message: Option<String>,
}

/// Compact the deadline heap once it holds this many entries and more than
/// twice the number of live timers.
const HEAP_COMPACT_THRESHOLD: usize = 64;

#[derive(Debug)]
pub struct Registry {
    timers: HashMap<TimerId, Timer>,
    next_id: TimerId,
    last_started: Option<Duration>,
    /// Min-heap of running deadlines. Entries go stale on pause, cancel and
    /// resume; they are checked against the timer before being trusted.
    deadlines: BinaryHeap<Reverse<(Instant, TimerId)>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
            next_id: TimerId::default(),
            last_started: None,
            deadlines: BinaryHeap::new(),
        }
    }

    pub fn start(&mut self, now: Instant, duration: Duration, message: Option<String>) -> TimerId {
        let id = self.next_id;
        self.next_id = id.next();
        self.last_started = Some(duration);

        let timer = Timer::new(id, duration, message, now);
        self.schedule(&timer);
        let previous = self.timers.insert(id, timer);
        debug_assert!(previous.is_none(), "timer id {id} reused");
        id
    }

    pub fn list(&self, now: Instant) -> Vec<TimerInfo> {
        self.timers.values().map(|timer| timer.info(now)).collect()
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.timers.get(&id)
    }

    /// A running timer that has already reached zero is treated as gone: it
    /// stays scheduled so the monitor still reports it.
    pub fn pause(&mut self, id: TimerId, now: Instant) -> Result<()> {
        let timer = self.timers.get_mut(&id).ok_or(TimerError::NotFound(id))?;
        if timer.is_expired(now) {
            return Err(TimerError::NotFound(id));
        }
        timer.pause(now)
    }

    pub fn resume(&mut self, id: TimerId, now: Instant) -> Result<()> {
        let timer = self.timers.get_mut(&id).ok_or(TimerError::NotFound(id))?;
        timer.resume(now)?;
        let timer = timer.clone();
        self.schedule(&timer);
        Ok(())
    }

    pub fn cancel(&mut self, id: TimerId) -> Result<Timer> {
        self.timers.remove(&id).ok_or(TimerError::NotFound(id))
    }

    /// Start a new message-less timer with the most recently started duration.
    pub fn again(&mut self, now: Instant) -> Result<(TimerId, Duration)> {
        let duration = self.last_started.ok_or(TimerError::NonePreviouslyStarted)?;
        let id = self.start(now, duration, None);
        Ok((id, duration))
    }

    pub fn last_started(&self) -> Option<Duration> {
        self.last_started
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Earliest deadline among running timers. Drops stale heap entries on
    /// the way.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse((deadline, id))) = self.deadlines.peek().copied() {
            if self.is_current(deadline, id) {
                return Some(deadline);
            }
            self.deadlines.pop();
        }
        None
    }

    /// Remove and return every running timer whose remaining time is zero.
    pub fn take_expired(&mut self, now: Instant) -> Vec<ExpiredTimer> {
        let mut expired = Vec::new();

        while let Some(Reverse((deadline, id))) = self.deadlines.peek().copied() {
            if deadline > now {
                break;
            }
            self.deadlines.pop();

            if !self.is_current(deadline, id) {
                continue;
            }
            let Some(timer) = self.timers.get(&id) else {
                continue;
            };
            if !timer.is_expired(now) {
                continue;
            }
            if let Some(timer) = self.timers.remove(&id) {
                expired.push(ExpiredTimer {
                    id,
                    duration: timer.duration(),
                    message: timer.message().map(str::to_string),
                });
            }
        }

        expired
    }

    fn is_current(&self, deadline: Instant, id: TimerId) -> bool {
        self.timers
            .get(&id)
            .and_then(Timer::deadline)
            .is_some_and(|current| current == deadline)
    }

    /// Push the timer's deadline. `timer` may not be in the map yet (start),
    /// so its entry is matched against `scheduled` rather than looked up.
    fn schedule(&mut self, timer: &Timer) {
        let Some(scheduled) = timer.deadline() else {
            return;
        };
        let scheduled_id = timer.id();
        self.deadlines.push(Reverse((scheduled, scheduled_id)));

        let live = self.timers.len() + 1;
        if self.deadlines.len() > HEAP_COMPACT_THRESHOLD && self.deadlines.len() > 2 * live {
            let timers = &self.timers;
            self.deadlines.retain(|Reverse((deadline, id))| {
                if *id == scheduled_id {
                    return *deadline == scheduled;
                }
                timers
                    .get(id)
                    .and_then(Timer::deadline)
                    .is_some_and(|current| current == *deadline)
            });
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sand_core::timer::TimerState;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let now = Instant::now();
        let mut registry = Registry::new();

        let ids: Vec<_> = (0..5).map(|_| registry.start(now, secs(60), None)).collect();
        let raw: Vec<u64> = ids.iter().map(|id| id.get()).collect();
        assert_eq!(raw, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_ids_not_reused_after_cancel() {
        let now = Instant::now();
        let mut registry = Registry::new();

        let first = registry.start(now, secs(60), None);
        registry.cancel(first).unwrap();
        let second = registry.start(now, secs(60), None);

        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn test_list_reports_message_and_state() {
        let now = Instant::now();
        let mut registry = Registry::new();

        let id = registry.start(now, secs(600), Some("Hello, world!".to_string()));
        let timers = registry.list(now);

        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].id, id);
        assert_eq!(timers[0].message.as_deref(), Some("Hello, world!"));
        assert_eq!(timers[0].state, TimerState::Running);
        assert_eq!(timers[0].remaining.millis, 600_000);
    }

    #[test]
    fn test_pause_resume_unknown_id() {
        let now = Instant::now();
        let mut registry = Registry::new();
        let missing = TimerId::new(9);

        assert_eq!(registry.pause(missing, now), Err(TimerError::NotFound(missing)));
        assert_eq!(registry.resume(missing, now), Err(TimerError::NotFound(missing)));
        assert_eq!(registry.cancel(missing), Err(TimerError::NotFound(missing)));
    }

    #[test]
    fn test_cancel_paused_timer() {
        let now = Instant::now();
        let mut registry = Registry::new();

        let id = registry.start(now, secs(600), None);
        registry.pause(id, now + secs(1)).unwrap();
        registry.cancel(id).unwrap();

        assert!(registry.list(now).is_empty());
        assert_eq!(registry.next_deadline(), None);
    }

    #[test]
    fn test_again_without_history() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.again(Instant::now()),
            Err(TimerError::NonePreviouslyStarted)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_again_repeats_last_duration() {
        let now = Instant::now();
        let mut registry = Registry::new();

        registry.start(now, secs(1), Some("tea".to_string()));
        let (id, duration) = registry.again(now).unwrap();

        assert_eq!(id.get(), 2);
        assert_eq!(duration, secs(1));
        assert_eq!(registry.get(id).unwrap().message(), None);
        assert_eq!(registry.last_started(), Some(secs(1)));
    }

    #[test]
    fn test_next_deadline_skips_stale_entries() {
        let now = Instant::now();
        let mut registry = Registry::new();

        let short = registry.start(now, secs(5), None);
        let long = registry.start(now, secs(50), None);
        assert_eq!(registry.next_deadline(), Some(now + secs(5)));

        registry.pause(short, now + secs(1)).unwrap();
        assert_eq!(registry.next_deadline(), Some(now + secs(50)));

        registry.resume(short, now + secs(10)).unwrap();
        assert_eq!(registry.next_deadline(), Some(now + secs(14)));

        registry.cancel(short).unwrap();
        registry.cancel(long).unwrap();
        assert_eq!(registry.next_deadline(), None);
    }

    #[test]
    fn test_take_expired_removes_only_due_timers() {
        let now = Instant::now();
        let mut registry = Registry::new();

        let due = registry.start(now, secs(1), Some("done".to_string()));
        let later = registry.start(now, secs(100), None);
        let paused = registry.start(now, secs(1), None);
        registry.pause(paused, now).unwrap();

        assert!(registry.take_expired(now).is_empty());

        let expired = registry.take_expired(now + secs(2));
        assert_eq!(
            expired,
            vec![ExpiredTimer {
                id: due,
                duration: secs(1),
                message: Some("done".to_string()),
            }]
        );
        assert!(registry.get(due).is_none());
        assert!(registry.get(later).is_some());
        assert!(registry.get(paused).is_some());
        assert!(registry.take_expired(now + secs(2)).is_empty());
    }

    #[test]
    fn test_zero_duration_expires_immediately() {
        let now = Instant::now();
        let mut registry = Registry::new();

        let id = registry.start(now, Duration::ZERO, None);
        let expired = registry.take_expired(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, id);
    }

    #[test]
    fn test_heap_compaction_keeps_live_deadlines() {
        let now = Instant::now();
        let mut registry = Registry::new();
        let id = registry.start(now, secs(1000), None);

        for i in 0..200 {
            let at = now + Duration::from_millis(2 * i);
            registry.pause(id, at).unwrap();
            registry.resume(id, at + Duration::from_millis(1)).unwrap();
        }

        assert!(registry.deadlines.len() <= HEAP_COMPACT_THRESHOLD + 1);
        assert_eq!(registry.next_deadline(), registry.get(id).unwrap().deadline());
    }

    #[test]
    fn test_heap_stays_bounded_with_earlier_live_timer() {
        let now = Instant::now();
        let mut registry = Registry::new();
        let early = registry.start(now, secs(3600), None);
        let toggled = registry.start(now, secs(7200), None);

        for i in 0..10_000u64 {
            let at = now + Duration::from_millis(2 * i);
            registry.pause(toggled, at).unwrap();
            registry.resume(toggled, at + Duration::from_millis(1)).unwrap();
            assert_eq!(registry.next_deadline(), Some(now + secs(3600)));
        }

        assert_eq!(registry.len(), 2);
        assert!(registry.deadlines.len() <= HEAP_COMPACT_THRESHOLD + 1);

        registry.cancel(early).unwrap();
        assert_eq!(registry.next_deadline(), registry.get(toggled).unwrap().deadline());
    }

    #[test]
    fn test_pause_after_deadline_still_expires() {
        let now = Instant::now();
        let mut registry = Registry::new();
        let id = registry.start(now, secs(1), Some("late".to_string()));

        assert_eq!(
            registry.pause(id, now + secs(2)),
            Err(TimerError::NotFound(id))
        );
        assert_eq!(registry.get(id).unwrap().state(), TimerState::Running);

        let expired = registry.take_expired(now + secs(100));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, id);
        assert!(registry.is_empty());
    }
}
