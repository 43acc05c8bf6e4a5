//! Sand Daemon Library
//!
//! Core daemon functionality exposed as a library for the `sandd` and `sand`
//! binaries and for testing.

pub mod api;
pub mod daemon;
pub mod ipc;
pub mod timer;

pub use api::ApiHandler;
pub use daemon::{init_logging, run, run_until};
pub use ipc::IpcServer;
pub use timer::{ExpiryHook, ExpiryMonitor, LogHook, TimerEvent, TimerManager};
