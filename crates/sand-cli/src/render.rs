//! Human-readable output for the `sand` command.

use std::fmt::Write;
use std::time::Duration;

use sand_client::ClientError;
use sand_core::duration::format_duration;
use sand_core::protocol::ErrorKind;
use sand_core::timer::{TimerId, TimerInfo, TimerState};

const GAP: &str = "  ";

pub fn created(id: TimerId, duration: Duration) -> String {
    format!("Timer #{} created for {}.", id, format_duration(duration))
}

/// Message for a per-timer command that the daemon rejected.
pub fn timer_error(id: TimerId, error: &ClientError) -> String {
    match error {
        ClientError::Daemon(ErrorKind::TimerNotFound) => format!("Timer {} not found.", id),
        ClientError::Daemon(ErrorKind::AlreadyPaused) => format!("Timer {} is already paused.", id),
        ClientError::Daemon(ErrorKind::AlreadyRunning) => {
            format!("Timer {} is already running.", id)
        }
        other => other.to_string(),
    }
}

/// Running timers first, soonest due at the top, then paused ones.
pub fn timer_table(timers: &[TimerInfo]) -> String {
    if timers.is_empty() {
        return "There are currently no timers.\n".to_string();
    }

    let mut sorted: Vec<&TimerInfo> = timers.iter().collect();
    sorted.sort_by_key(|t| (t.remaining.millis, t.id));
    let (running, paused): (Vec<&TimerInfo>, Vec<&TimerInfo>) = sorted
        .into_iter()
        .partition(|t| t.state == TimerState::Running);

    let id_width = timers
        .iter()
        .map(|t| t.id.to_string().len() + 1)
        .max()
        .unwrap_or(0);
    let remaining_width = timers
        .iter()
        .map(|t| format_duration(t.remaining.as_duration()).len())
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    for (i, group) in [running, paused].iter().filter(|g| !g.is_empty()).enumerate() {
        if i > 0 {
            output.push('\n');
        }
        for timer in group {
            let id = format!("#{}", timer.id);
            let remaining = format_duration(timer.remaining.as_duration());
            let line = format!(
                "{id:>id_width$}{GAP}{state:<7}{GAP}{remaining:>remaining_width$}{GAP}{message}",
                state = timer.state.as_str(),
                message = timer.message.as_deref().unwrap_or(""),
            );
            let _ = writeln!(output, "{}", line.trim_end());
        }
    }
    output
}
