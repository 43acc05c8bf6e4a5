//! Sand Client Library
//!
//! Provides a client for talking to the sand daemon over its Unix socket.
//! Every call opens a fresh connection, sends one request and reads one
//! response.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sand_core::config::client_sock_path;
use sand_core::protocol::{Command, ErrorKind, Payload, Response};
use sand_core::timer::{TimerId, TimerInfo};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot connect to the daemon at {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from daemon: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Daemon(#[from] ErrorKind),

    #[error("Unexpected response to {command}: {payload:?}")]
    UnexpectedResponse {
        command: &'static str,
        payload: Payload,
    },

    #[error("No socket path: set SAND_SOCK_PATH or XDG_RUNTIME_DIR")]
    NoSocketPath,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Sand daemon client
#[derive(Debug, Clone)]
pub struct SandClient {
    socket_path: PathBuf,
}

impl SandClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Connect to `SAND_SOCK_PATH`, falling back to the default runtime path.
    pub fn from_env() -> Result<Self> {
        client_sock_path()
            .map(Self::new)
            .ok_or(ClientError::NoSocketPath)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one command and return the daemon's raw response.
    pub async fn call(&self, command: &Command) -> Result<Response> {
        let mut stream = self.connect().await?;

        let mut request = serde_json::to_vec(command)?;
        request.push(b'\n');
        stream.write_all(&request).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await?;

        Ok(serde_json::from_str(line.trim())?)
    }

    pub async fn list(&self) -> Result<Vec<TimerInfo>> {
        match self.request(Command::List).await? {
            Payload::List { timers } => Ok(timers),
            payload => Err(unexpected("list", payload)),
        }
    }

    pub async fn start(&self, duration: Duration, message: Option<String>) -> Result<TimerId> {
        match self.request(Command::StartTimer { duration, message }).await? {
            Payload::Started { id } => Ok(id),
            payload => Err(unexpected("starttimer", payload)),
        }
    }

    pub async fn pause(&self, id: TimerId) -> Result<()> {
        self.expect_empty(Command::Pause(id)).await
    }

    pub async fn resume(&self, id: TimerId) -> Result<()> {
        self.expect_empty(Command::Resume(id)).await
    }

    pub async fn cancel(&self, id: TimerId) -> Result<()> {
        self.expect_empty(Command::Cancel(id)).await
    }

    /// Restart the last duration; returns the new id and the duration.
    pub async fn again(&self) -> Result<(TimerId, Duration)> {
        match self.request(Command::Again).await? {
            Payload::Again { id, duration } => Ok((id, Duration::from_millis(duration))),
            payload => Err(unexpected("again", payload)),
        }
    }

    async fn request(&self, command: Command) -> Result<Payload> {
        Ok(self.call(&command).await?.into_result()?)
    }

    async fn expect_empty(&self, command: Command) -> Result<()> {
        let name = command.name();
        match self.request(command).await? {
            Payload::Empty {} => Ok(()),
            payload => Err(unexpected(name, payload)),
        }
    }

    async fn connect(&self) -> Result<UnixStream> {
        UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| ClientError::Connect {
                path: self.socket_path.clone(),
                source,
            })
    }
}

fn unexpected(command: &'static str, payload: Payload) -> ClientError {
    ClientError::UnexpectedResponse { command, payload }
}
