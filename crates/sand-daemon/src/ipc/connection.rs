use futures::{SinkExt, StreamExt};
use sand_core::protocol::{Command, Response};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use super::codec::{CodecError, ServerCodec};

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

/// One client connection: a single request in, a single response out.
pub struct Connection {
    framed: Framed<UnixStream, ServerCodec>,
}

impl Connection {
    pub fn new(stream: UnixStream) -> Self {
        Self {
            framed: Framed::new(stream, ServerCodec::new()),
        }
    }

    /// `Ok(None)` means the peer closed without sending anything.
    pub async fn read_request(&mut self) -> Result<Option<Command>> {
        match self.framed.next().await {
            Some(request) => Ok(Some(request?)),
            None => Ok(None),
        }
    }

    /// Write the response and close our side of the stream.
    pub async fn write_response(&mut self, response: Response) -> Result<()> {
        self.framed.send(response).await?;
        self.framed.get_mut().shutdown().await?;
        Ok(())
    }
}
