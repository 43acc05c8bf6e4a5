//! Request/response framing for the daemon socket.
//!
//! A request is one JSON value. It may be followed by a newline, but the
//! daemon does not wait for one: as soon as a complete value is buffered it is
//! decoded. Responses are always written as a single line.

use bytes::{Buf, BufMut, BytesMut};
use sand_core::protocol::{Command, Response};
use tokio_util::codec::{Decoder, Encoder};

/// Largest request the daemon will buffer.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Request exceeds {max} bytes")]
    FrameTooLong { max: usize },

    #[error("Connection closed mid-request")]
    Truncated,
}

impl CodecError {
    /// Errors the peer caused by sending something we cannot decode.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, CodecError::Io(_))
    }
}

/// Server side of the connection: decodes [`Command`]s, encodes [`Response`]s.
#[derive(Debug, Clone)]
pub struct ServerCodec {
    max_length: usize,
}

impl ServerCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_FRAME_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Default for ServerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ServerCodec {
    type Item = Command;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>, CodecError> {
        let leading = src
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        src.advance(leading);
        if src.is_empty() {
            return Ok(None);
        }

        let mut values = serde_json::Deserializer::from_slice(&src[..]).into_iter::<Command>();
        match values.next() {
            Some(Ok(command)) => {
                let consumed = values.byte_offset();
                src.advance(consumed);
                Ok(Some(command))
            }
            Some(Err(e)) if e.is_eof() => {
                if src.len() > self.max_length {
                    Err(CodecError::FrameTooLong {
                        max: self.max_length,
                    })
                } else {
                    Ok(None)
                }
            }
            Some(Err(e)) => Err(CodecError::Malformed(e)),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Command>, CodecError> {
        match self.decode(src)? {
            Some(command) => Ok(Some(command)),
            None if src.is_empty() => Ok(None),
            None => {
                src.clear();
                Err(CodecError::Truncated)
            }
        }
    }
}

impl Encoder<Response> for ServerCodec {
    type Error = CodecError;

    fn encode(&mut self, response: Response, dst: &mut BytesMut) -> Result<(), CodecError> {
        let json = serde_json::to_vec(&response)?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}
