//! Timer API methods

use std::time::Duration;

use sand_core::duration::as_millis_u64;
use sand_core::protocol::Payload;
use sand_core::timer::TimerId;

use super::Result;
use crate::timer::TimerManager;

/// List all timers
pub async fn list(manager: &TimerManager) -> Result<Payload> {
    Ok(Payload::List {
        timers: manager.list().await,
    })
}

/// Start a timer
pub async fn start(
    manager: &TimerManager,
    duration: Duration,
    message: Option<String>,
) -> Result<Payload> {
    let id = manager.start(duration, message).await;
    Ok(Payload::Started { id })
}

/// Pause a timer
pub async fn pause(manager: &TimerManager, id: TimerId) -> Result<Payload> {
    manager.pause(id).await?;
    Ok(Payload::Empty {})
}

/// Resume a timer
pub async fn resume(manager: &TimerManager, id: TimerId) -> Result<Payload> {
    manager.resume(id).await?;
    Ok(Payload::Empty {})
}

/// Cancel a timer, whatever its state
pub async fn cancel(manager: &TimerManager, id: TimerId) -> Result<Payload> {
    manager.cancel(id).await?;
    Ok(Payload::Empty {})
}

/// Restart the most recently started duration
pub async fn again(manager: &TimerManager) -> Result<Payload> {
    let (id, duration) = manager.again().await?;
    Ok(Payload::Again {
        id,
        duration: as_millis_u64(duration),
    })
}
