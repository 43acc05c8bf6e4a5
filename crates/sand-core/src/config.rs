//! Daemon configuration and socket discovery.

use std::fmt;
use std::os::fd::RawFd;
use std::path::PathBuf;

use crate::{Error, Result};

pub const SOCK_PATH_VAR: &str = "SAND_SOCK_PATH";
pub const SOCK_FD_VAR: &str = "SAND_SOCKFD";
pub const LISTEN_PID_VAR: &str = "LISTEN_PID";
pub const LISTEN_FDS_VAR: &str = "LISTEN_FDS";

/// First descriptor handed over by systemd socket activation.
pub const SYSTEMD_FIRST_FD: RawFd = 3;

const SOCKET_FILENAME: &str = "sand.sock";
const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

pub fn env_sock_path() -> Option<PathBuf> {
    std::env::var_os(SOCK_PATH_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub fn default_sock_path() -> Option<PathBuf> {
    dirs::runtime_dir().map(|dir| dir.join(SOCKET_FILENAME))
}

/// Path a client should connect to.
pub fn client_sock_path() -> Option<PathBuf> {
    env_sock_path().or_else(default_sock_path)
}

/// Where the daemon gets its listening socket from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketSource {
    /// Bind a new socket at this path.
    Path(PathBuf),
    /// Adopt a listening socket the parent process already bound (`SAND_SOCKFD`).
    InheritedFd(RawFd),
    /// Adopt the socket passed by systemd (`LISTEN_PID`/`LISTEN_FDS`).
    SystemdActivation(RawFd),
}

impl SocketSource {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(
            |name| std::env::var(name).ok(),
            std::process::id(),
            default_sock_path(),
        )
    }

    /// Resolution order: `SAND_SOCK_PATH`, `SAND_SOCKFD`, systemd activation,
    /// then the default runtime-dir path.
    pub fn resolve<F>(lookup: F, our_pid: u32, default_path: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(SOCK_PATH_VAR).filter(|p| !p.is_empty()) {
            return Ok(SocketSource::Path(PathBuf::from(path)));
        }

        if let Some(raw) = lookup(SOCK_FD_VAR) {
            let fd = raw.trim().parse::<RawFd>().map_err(|_| {
                Error::Validation(format!("{} is not a file descriptor: {:?}", SOCK_FD_VAR, raw))
            })?;
            return Ok(SocketSource::InheritedFd(fd));
        }

        if let Some(fd) = systemd_fd(&lookup, our_pid)? {
            return Ok(SocketSource::SystemdActivation(fd));
        }

        default_path.map(SocketSource::Path).ok_or_else(|| {
            Error::Validation(format!(
                "no socket configured: set {} or {}, or run under systemd socket activation",
                SOCK_PATH_VAR, SOCK_FD_VAR
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SocketSource::Path(path) if path.as_os_str().is_empty() => {
                Err(Error::Validation("Socket path cannot be empty".to_string()))
            }
            SocketSource::InheritedFd(fd) | SocketSource::SystemdActivation(fd) if *fd < 0 => {
                Err(Error::Validation(format!("Invalid socket descriptor {}", fd)))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SocketSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketSource::Path(path) => write!(f, "{}", path.display()),
            SocketSource::InheritedFd(fd) => write!(f, "inherited fd {}", fd),
            SocketSource::SystemdActivation(fd) => write!(f, "systemd fd {}", fd),
        }
    }
}

fn systemd_fd<F>(lookup: &F, our_pid: u32) -> Result<Option<RawFd>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(listen_pid) = lookup(LISTEN_PID_VAR) else {
        return Ok(None);
    };
    let listen_pid: u32 = listen_pid.trim().parse().map_err(|_| {
        Error::Validation(format!("{} is not a pid: {:?}", LISTEN_PID_VAR, listen_pid))
    })?;
    if listen_pid != our_pid {
        return Ok(None);
    }

    let listen_fds: u32 = match lookup(LISTEN_FDS_VAR) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::Validation(format!("{} is not a number: {:?}", LISTEN_FDS_VAR, raw))
        })?,
        None => return Ok(None),
    };
    if listen_fds == 0 {
        return Ok(None);
    }

    Ok(Some(SYSTEMD_FIRST_FD))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub socket: SocketSource,
    pub log_level: String,
}

impl DaemonConfig {
    pub fn from_env(log_level: impl Into<String>) -> Result<Self> {
        let config = Self {
            socket: SocketSource::from_env()?,
            log_level: log_level.into(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.socket.validate()?;

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}
