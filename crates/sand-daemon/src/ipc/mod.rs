//! IPC module for daemon communication

pub mod codec;
pub mod connection;
pub mod listener;
pub mod server;

pub use codec::{CodecError, ServerCodec};
pub use connection::{Connection, ConnectionError};
pub use listener::{SocketError, SocketGuard};
pub use server::{IpcServer, IpcServerError};
