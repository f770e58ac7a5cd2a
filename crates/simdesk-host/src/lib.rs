//! SimDesk Host - collaborator seams for the desktop simulation
//!
//! Everything the simulation core needs from the surrounding desktop is
//! expressed here as a trait:
//! - [`KeyValueStore`] for JSON persistence
//! - [`Filesystem`] for the virtual filesystem and app registration
//! - [`Notifier`] for user-visible notifications
//! - [`Localizer`] for user-facing strings
//! - [`UsageTracker`] for per-session transfer counters
//! - [`UserDirectory`] for account and group lookup
//!
//! The crate also provides [`TimerQueue`], the virtual-time scheduler every
//! simulation service steps through, and in-memory collaborators used by the
//! CLI and the tests.
//!
//! # Example
//!
//! ```rust
//! use simdesk_host::{Host, TimerQueue};
//! use std::time::Duration;
//!
//! let host = Host::in_memory();
//! let mut timers: TimerQueue<&str> = TimerQueue::new();
//! timers.schedule(Duration::from_millis(100), "tick");
//! assert_eq!(timers.pop_due(timers.now() + Duration::from_millis(100)).map(|(_, e)| e), Some("tick"));
//! # drop(host);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod collab;
pub mod error;
pub mod memory;
pub mod timer;

pub use collab::{
    Filesystem, FsNode, Host, KeyValueStore, Localizer, NodeKind, NotificationKind, Notifier,
    UsageTracker, UserAccount, UserDirectory,
};
pub use error::HostError;
pub use memory::{
    AppPolicy, EnglishLocalizer, MemoryFilesystem, MemoryStore, SessionUsage, StaticUserDirectory,
    TracingNotifier,
};
pub use timer::{SimTime, TimerId, TimerQueue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
