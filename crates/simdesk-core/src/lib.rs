//! SimDesk Core - the simulated desktop coordinator
//!
//! Ties the services together:
//! - [`Desktop`] owns the network registry and the install pipeline and
//!   moves them through simulated time on one clock
//! - [`DesktopConfig`] loads every knob from one TOML document
//! - [`spawn_driver`] runs a shared desktop in real time on tokio
//!
//! The `simdesk` binary exposes the same operations on the command line.
//!
//! # Example
//!
//! ```rust
//! use simdesk_core::{Desktop, DesktopConfig};
//! use simdesk_host::Host;
//! use std::time::Duration;
//!
//! let config = DesktopConfig::default().with_seed(42);
//! let mut desktop = Desktop::new(config, Host::in_memory()).unwrap();
//!
//! let ssid = desktop.available_networks()[0].ssid().to_string();
//! desktop.connect_to_network(&ssid);
//! desktop.handle_install("paint", 10.0, Some("root")).unwrap();
//!
//! desktop.advance(Duration::from_secs(600));
//! assert!(desktop.installing_apps().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod desktop;
pub mod driver;
pub mod error;

pub use config::DesktopConfig;
pub use desktop::{memory_host, Desktop, DesktopSnapshot};
pub use driver::{spawn_driver, DriverHandle, SharedDesktop};
pub use error::DesktopError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
