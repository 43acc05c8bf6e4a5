//! Obtaining the listening socket: bind a path or adopt an inherited fd.

use std::io;
use std::os::fd::{FromRawFd, RawFd};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use sand_core::config::SocketSource;
use tokio::net::UnixListener;

#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0} exists and is not a socket")]
    NotASocket(PathBuf),

    #[error("Another daemon is already listening on {0}")]
    AlreadyRunning(PathBuf),

    #[error("Cannot use descriptor {fd} as a listening socket: {source}")]
    BadDescriptor { fd: RawFd, source: io::Error },
}

pub type Result<T> = std::result::Result<T, SocketError>;

/// Removes the socket file when dropped.
#[derive(Debug)]
pub struct SocketGuard {
    path: PathBuf,
}

impl SocketGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed socket {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove socket {}: {}", self.path.display(), e),
        }
    }
}

/// Listening socket plus, when we created the file ourselves, its cleanup guard.
pub fn bind(source: &SocketSource) -> Result<(UnixListener, Option<SocketGuard>)> {
    match source {
        SocketSource::Path(path) => {
            let listener = bind_path(path)?;
            Ok((
                listener,
                Some(SocketGuard {
                    path: path.clone(),
                }),
            ))
        }
        SocketSource::InheritedFd(fd) | SocketSource::SystemdActivation(fd) => {
            Ok((adopt_fd(*fd)?, None))
        }
    }
}

fn bind_path(path: &Path) -> Result<UnixListener> {
    remove_stale_socket(path)?;
    Ok(UnixListener::bind(path)?)
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if !metadata.file_type().is_socket() {
        return Err(SocketError::NotASocket(path.to_path_buf()));
    }
    let attempt = std::os::unix::net::UnixStream::connect(path).map(drop);
    check_stale(path, attempt)?;

    tracing::info!("Removing stale socket {}", path.display());
    std::fs::remove_file(path)?;
    Ok(())
}

/// Only a refused connection proves nobody is listening. Any other failure
/// (permissions, for one) leaves the file alone.
fn check_stale(path: &Path, connect: io::Result<()>) -> Result<()> {
    match connect {
        Ok(()) => Err(SocketError::AlreadyRunning(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn adopt_fd(fd: RawFd) -> Result<UnixListener> {
    // SAFETY: the descriptor was passed to this process for us to own; nothing
    // else in the daemon refers to it.
    let listener = unsafe { std::os::unix::net::UnixListener::from_raw_fd(fd) };
    listener
        .set_nonblocking(true)
        .map_err(|source| SocketError::BadDescriptor { fd, source })?;
    UnixListener::from_std(listener).map_err(|source| SocketError::BadDescriptor { fd, source })
}
