//! Expiry monitor
//!
//! Sleeps until the earliest running deadline, then removes every timer that
//! has run out and reports it to the configured [`ExpiryHook`].

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::events::{TimerEvent, TimerEventType};
use super::manager::TimerManager;
use super::registry::ExpiredTimer;

/// Called once for every timer that runs out. Runs on the monitor task, so
/// slow work (sounds, desktop notifications) should be spawned elsewhere.
pub trait ExpiryHook: Send + Sync {
    fn timer_expired(&self, timer: &ExpiredTimer);
}

/// Default hook: just logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHook;

impl ExpiryHook for LogHook {
    fn timer_expired(&self, timer: &ExpiredTimer) {
        match &timer.message {
            Some(message) => tracing::info!("Timer {} has elapsed: {}", timer.id, message),
            None => tracing::info!("Timer {} has elapsed", timer.id),
        }
    }
}

pub struct ExpiryMonitor {
    timer_manager: TimerManager,
    hook: Arc<dyn ExpiryHook>,
}

impl ExpiryMonitor {
    pub fn new(timer_manager: TimerManager, hook: Arc<dyn ExpiryHook>) -> Self {
        Self {
            timer_manager,
            hook,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::debug!("Expiry monitor started");

        loop {
            let next = self.timer_manager.next_deadline().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.timer_manager.schedule_changed() => {}
                _ = sleep_until_deadline(next) => {}
            }

            self.fire_expired().await;
        }

        tracing::debug!("Expiry monitor stopped");
    }

    /// Remove expired timers, then call the hook outside the registry lock.
    async fn fire_expired(&self) {
        let expired = self.timer_manager.take_expired().await;

        for timer in expired {
            tracing::debug!("Timer {} expired after {:?}", timer.id, timer.duration);
            self.hook.timer_expired(&timer);
            self.timer_manager
                .emit(TimerEvent::new(TimerEventType::Expired, timer.id));
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
