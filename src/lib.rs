//! Graceful shutdown orchestration for long-running processes.
//!
//! [`watch`] fans any number of shutdown watchers (OS signals and custom
//! monitors) into one shared [`ShutdownContext`]. The first notification
//! completes the context so teardown code can start; a configured grace
//! period or a second notification forces the process to exit.

pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::{ShutdownConfig, ShutdownOption, ShutdownSettings};
pub use lifecycle::{
    named, watch, watcher_fn, BoxError, Cause, Exiter, Notifier, ReleaseHandle, ShutdownContext,
    Signal, SignalNotice, SignalSource, SignalStream, WatchError, Watcher,
};
pub use observability::Logger;
