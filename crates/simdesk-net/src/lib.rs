//! SimDesk Net - deterministic simulated WiFi
//!
//! Three layers, leaf-first:
//! - [`capabilities`]: pure SSID → (security, max speed) derivation
//! - [`generation`]: random visible-set synthesis on top of that derivation
//! - [`registry`]: the adapter state machine (enable, scan, connect,
//!   disconnect, signal fluctuation, known-network persistence)
//!
//! # Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use simdesk_host::Host;
//! use simdesk_net::{NetworkConfig, NetworkRegistry};
//!
//! let mut registry = NetworkRegistry::new(
//!     NetworkConfig::default(),
//!     &Host::in_memory(),
//!     Box::new(StdRng::seed_from_u64(42)),
//! );
//! let ssid = registry.available_networks()[0].ssid().to_string();
//! registry.connect_to_network(&ssid);
//! assert!(registry.current_speed() > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod capabilities;
pub mod config;
pub mod error;
pub mod generation;
pub mod known;
pub mod network;
pub mod registry;

pub use capabilities::{derive_capabilities, Capabilities};
pub use config::NetworkConfig;
pub use error::NetError;
pub use known::KnownNetworks;
pub use network::{Network, NetworkId, Security};
pub use registry::NetworkRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
