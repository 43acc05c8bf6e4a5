use std::sync::Arc;

use sand_core::config::SocketSource;
use sand_core::protocol::{ErrorKind, Response};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use super::connection::{Connection, ConnectionError};
use super::listener::{self, SocketError, SocketGuard};
use crate::api::ApiHandler;

#[derive(Debug, thiserror::Error)]
pub enum IpcServerError {
    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}

pub type Result<T> = std::result::Result<T, IpcServerError>;

pub struct IpcServer {
    listener: UnixListener,
    guard: Option<SocketGuard>,
    source: SocketSource,
    api_handler: Arc<ApiHandler>,
}

impl IpcServer {
    /// Bind (or adopt) the listening socket. Fails before any connection is
    /// accepted if the socket cannot be obtained.
    pub fn bind(source: &SocketSource, api_handler: Arc<ApiHandler>) -> Result<Self> {
        let (listener, guard) = listener::bind(source)?;
        Ok(Self {
            listener,
            guard,
            source: source.clone(),
            api_handler,
        })
    }

    pub fn source(&self) -> &SocketSource {
        &self.source
    }

    /// Accept connections until `cancel` fires. Each connection is served on
    /// its own task; tasks still running at shutdown are left to finish or be
    /// dropped with the runtime.
    pub async fn serve(self, cancel: CancellationToken) {
        tracing::info!("IPC server listening on {}", self.source);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let api_handler = self.api_handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &api_handler).await {
                                tracing::error!("Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                    }
                }
            }
        }

        drop(self.listener);
        drop(self.guard);
        tracing::info!("IPC server stopped");
    }
}

async fn handle_connection(stream: UnixStream, api_handler: &ApiHandler) -> Result<()> {
    tracing::debug!("New client connected");
    let mut connection = Connection::new(stream);

    let response = match connection.read_request().await {
        Ok(Some(command)) => {
            tracing::debug!("Received request: {}", command.name());
            api_handler.handle(command).await
        }
        Ok(None) => {
            tracing::debug!("Client disconnected without a request");
            return Ok(());
        }
        Err(ConnectionError::Codec(e)) if e.is_malformed() => {
            tracing::warn!("Rejecting request: {}", e);
            Response::err(ErrorKind::Malformed)
        }
        Err(e) => return Err(e.into()),
    };

    connection.write_response(response).await?;
    Ok(())
}
