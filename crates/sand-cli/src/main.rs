//! `sand` - command line countdown timers that don't take up a terminal.

mod render;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sand_client::{ClientError, SandClient};
use sand_core::config::DaemonConfig;
use sand_core::duration::parse_duration_component;
use sand_core::protocol::ErrorKind;
use sand_core::timer::TimerId;
use sand_daemon::LogHook;

#[derive(Parser, Debug)]
#[command(name = "sand")]
#[command(about = "Command line countdown timers that don't take up a terminal.", version)]
#[command(infer_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Start a new timer; several durations are added together
    Start {
        #[arg(value_name = "DURATION", value_parser = parse_duration_component, num_args = 1..)]
        durations: Vec<Duration>,

        /// Message shown when the timer elapses
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List active timers
    #[command(alias = "list")]
    Ls,
    /// Pause the timers with the given IDs
    Pause {
        #[arg(required = true)]
        timer_ids: Vec<TimerId>,
    },
    /// Resume the timers with the given IDs
    Resume {
        #[arg(required = true)]
        timer_ids: Vec<TimerId>,
    },
    /// Cancel the timers with the given IDs
    Cancel {
        #[arg(required = true)]
        timer_ids: Vec<TimerId>,
    },
    /// Start another timer with the last duration used
    Again,
    /// Launch the daemon
    Daemon {
        /// Log level (overridden by RUST_LOG)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },
}

#[derive(Debug, Clone, Copy)]
enum TimerAction {
    Pause,
    Resume,
    Cancel,
}

impl TimerAction {
    fn done(self) -> &'static str {
        match self {
            TimerAction::Pause => "Paused",
            TimerAction::Resume => "Resumed",
            TimerAction::Cancel => "Cancelled",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` means every error was already reported.
async fn run(command: CliCommand) -> Result<bool> {
    if let CliCommand::Daemon { log_level } = command {
        let config = DaemonConfig::from_env(log_level)?;
        sand_daemon::init_logging(&config.log_level);
        tracing::info!("Socket: {}", config.socket);
        sand_daemon::run(config, Arc::new(LogHook)).await?;
        return Ok(true);
    }

    let client = SandClient::from_env()?;
    match command {
        CliCommand::Start { durations, message } => {
            let duration: Duration = durations.iter().sum();
            let id = client.start(duration, message).await.context(connect_hint(&client))?;
            println!("{}", render::created(id, duration));
        }
        CliCommand::Ls => {
            let timers = client.list().await.context(connect_hint(&client))?;
            print!("{}", render::timer_table(&timers));
        }
        CliCommand::Pause { timer_ids } => {
            return for_each_timer(&client, TimerAction::Pause, timer_ids).await
        }
        CliCommand::Resume { timer_ids } => {
            return for_each_timer(&client, TimerAction::Resume, timer_ids).await
        }
        CliCommand::Cancel { timer_ids } => {
            return for_each_timer(&client, TimerAction::Cancel, timer_ids).await
        }
        CliCommand::Again => match client.again().await {
            Ok((id, duration)) => println!("{}", render::created(id, duration)),
            Err(ClientError::Daemon(ErrorKind::NonePreviouslyStarted)) => {
                eprintln!("No timer has been started yet.");
                return Ok(false);
            }
            Err(e) => return Err(e).context(connect_hint(&client)),
        },
        CliCommand::Daemon { .. } => unreachable!("handled above"),
    }
    Ok(true)
}

/// Apply `action` to each id in turn, reporting every outcome. Stops early
/// only if the daemon cannot be reached.
async fn for_each_timer(client: &SandClient, action: TimerAction, ids: Vec<TimerId>) -> Result<bool> {
    let mut all_ok = true;
    for id in ids {
        let result = match action {
            TimerAction::Pause => client.pause(id).await,
            TimerAction::Resume => client.resume(id).await,
            TimerAction::Cancel => client.cancel(id).await,
        };

        match result {
            Ok(()) => println!("{} timer {}.", action.done(), id),
            Err(e @ ClientError::Daemon(_)) => {
                eprintln!("{}", render::timer_error(id, &e));
                all_ok = false;
            }
            Err(e) => return Err(e).context(connect_hint(client)),
        }
    }
    Ok(all_ok)
}

fn connect_hint(client: &SandClient) -> String {
    format!(
        "Talking to the daemon at {} (is `sand daemon` running?)",
        client.socket_path().display()
    )
}
