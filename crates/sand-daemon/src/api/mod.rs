//! API handlers

pub mod timer;

use sand_core::protocol::{Command, ErrorKind, Payload, Response};

use crate::timer::TimerManager;

pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Executes one decoded command against the timer registry. Performs no I/O.
#[derive(Clone)]
pub struct ApiHandler {
    timer_manager: TimerManager,
}

impl ApiHandler {
    pub fn new(timer_manager: TimerManager) -> Self {
        Self { timer_manager }
    }

    pub fn timer_manager(&self) -> &TimerManager {
        &self.timer_manager
    }

    pub async fn handle(&self, command: Command) -> Response {
        let name = command.name();
        let result = self.dispatch(command).await;
        if let Err(kind) = &result {
            tracing::debug!("{} failed: {}", name, kind);
        }
        result.into()
    }

    async fn dispatch(&self, command: Command) -> Result<Payload> {
        let manager = &self.timer_manager;
        match command {
            Command::List => timer::list(manager).await,
            Command::StartTimer { duration, message } => {
                timer::start(manager, duration, message).await
            }
            Command::Pause(id) => timer::pause(manager, id).await,
            Command::Resume(id) => timer::resume(manager, id).await,
            Command::Cancel(id) => timer::cancel(manager, id).await,
            Command::Again => timer::again(manager).await,
        }
    }
}
