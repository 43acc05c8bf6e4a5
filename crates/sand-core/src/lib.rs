//! Shared types for the sand daemon and its clients: timer identifiers, the
//! wire protocol, duration helpers and socket configuration.

pub mod config;
pub mod duration;
pub mod error;
pub mod protocol;
pub mod timer;

pub use error::{Error, Result};
