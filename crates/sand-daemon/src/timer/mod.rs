pub mod countdown;
pub mod events;
pub mod manager;
pub mod monitor;
pub mod registry;


pub use countdown::Timer;
pub use events::{TimerEvent, TimerEventType};
pub use manager::TimerManager;
pub use monitor::{ExpiryHook, ExpiryMonitor, LogHook};
pub use registry::{ExpiredTimer, Registry, TimerError};
