//! Timer manager - shared, cloneable handle to the timer registry

use std::sync::Arc;
use std::time::Duration;

use sand_core::duration::as_millis_u64;
use sand_core::timer::{TimerId, TimerInfo};
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::time::Instant;

use super::events::{TimerEvent, TimerEventType};
use super::registry::{ExpiredTimer, Registry, Result};

/// Every registry operation goes through this handle. The registry lock is
/// only held for in-memory work; events are sent after it is released.
#[derive(Clone)]
pub struct TimerManager {
    registry: Arc<Mutex<Registry>>,
    /// Event broadcast channel
    event_tx: broadcast::Sender<TimerEvent>,
    /// Wakes the expiry monitor when a new deadline may be earlier than the
    /// one it is sleeping on.
    schedule_changed: Arc<Notify>,
}

impl TimerManager {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1000);

        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
            event_tx,
            schedule_changed: Arc::new(Notify::new()),
        }
    }

    /// Subscribe to timer events
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.event_tx.subscribe()
    }

    pub async fn start(&self, duration: Duration, message: Option<String>) -> TimerId {
        let id = {
            let mut registry = self.registry.lock().await;
            registry.start(Instant::now(), duration, message.clone())
        };
        tracing::debug!("Started timer {} for {:?}", id, duration);

        self.schedule_changed.notify_one();
        self.emit(TimerEvent::started(id, as_millis_u64(duration), message));
        id
    }

    /// Snapshot of all timers, ordered by id.
    pub async fn list(&self) -> Vec<TimerInfo> {
        let mut timers = {
            let registry = self.registry.lock().await;
            registry.list(Instant::now())
        };
        timers.sort_by_key(|timer| timer.id);
        timers
    }

    pub async fn pause(&self, id: TimerId) -> Result<()> {
        let remaining = {
            let mut registry = self.registry.lock().await;
            let now = Instant::now();
            registry.pause(id, now)?;
            remaining_millis(&registry, id, now)
        };
        tracing::debug!("Paused timer {} with {}ms left", id, remaining);

        self.emit(TimerEvent::paused(id, remaining));
        Ok(())
    }

    pub async fn resume(&self, id: TimerId) -> Result<()> {
        let remaining = {
            let mut registry = self.registry.lock().await;
            let now = Instant::now();
            registry.resume(id, now)?;
            remaining_millis(&registry, id, now)
        };
        tracing::debug!("Resumed timer {} with {}ms left", id, remaining);

        self.schedule_changed.notify_one();
        self.emit(TimerEvent::resumed(id, remaining));
        Ok(())
    }

    pub async fn cancel(&self, id: TimerId) -> Result<()> {
        {
            let mut registry = self.registry.lock().await;
            registry.cancel(id)?;
        }
        tracing::debug!("Cancelled timer {}", id);

        self.emit(TimerEvent::new(TimerEventType::Cancelled, id));
        Ok(())
    }

    /// Start a new timer with the most recently started duration.
    pub async fn again(&self) -> Result<(TimerId, Duration)> {
        let (id, duration) = {
            let mut registry = self.registry.lock().await;
            registry.again(Instant::now())?
        };
        tracing::debug!("Started timer {} again for {:?}", id, duration);

        self.schedule_changed.notify_one();
        self.emit(TimerEvent::started(id, as_millis_u64(duration), None));
        Ok((id, duration))
    }

    /// Get count of live timers
    pub async fn active_timer_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub(crate) async fn next_deadline(&self) -> Option<Instant> {
        self.registry.lock().await.next_deadline()
    }

    pub(crate) async fn take_expired(&self) -> Vec<ExpiredTimer> {
        let mut registry = self.registry.lock().await;
        registry.take_expired(Instant::now())
    }

    /// Resolves once a start or resume happened since the last call.
    pub(crate) async fn schedule_changed(&self) {
        self.schedule_changed.notified().await;
    }

    pub(crate) fn emit(&self, event: TimerEvent) {
        // No subscribers is the normal case.
        let _ = self.event_tx.send(event);
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

fn remaining_millis(registry: &Registry, id: TimerId, now: Instant) -> u64 {
    registry
        .get(id)
        .map(|timer| as_millis_u64(timer.remaining(now)))
        .unwrap_or_default()
}
