//! SimDesk Install - app store download and install simulation
//!
//! An install request becomes an [`InstallJob`] that progresses in two
//! halves:
//! - download (0-50%), paced by the speed of the active network and
//!   stalling while there is none
//! - install (50-100%), random increments with jitter and the occasional
//!   slow-finalize stall
//!
//! Completion registers the app with the filesystem and notifies the user.
//! Uninstall, restore and broken-app detection sit next to it in
//! [`InstallPipeline`].
//!
//! # Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use simdesk_host::Host;
//! use simdesk_install::{InstallConfig, InstallOutcome, InstallPipeline};
//! use std::time::Duration;
//!
//! let mut pipeline = InstallPipeline::new(
//!     InstallConfig::default().with_default_user("root"),
//!     &Host::in_memory(),
//!     Box::new(StdRng::seed_from_u64(7)),
//! );
//! let link = Some(80.0);
//! let outcome = pipeline.handle_install("paint", 50.0, None, &link).unwrap();
//! assert_eq!(outcome, InstallOutcome::Started);
//!
//! pipeline.advance_to(pipeline.now() + Duration::from_millis(100), &link);
//! assert_eq!(pipeline.installing_apps().get("paint"), Some(&1));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod job;
pub mod link;
pub mod permission;
pub mod pipeline;

pub use config::InstallConfig;
pub use error::InstallError;
pub use job::{AppId, InstallJob, InstallPhase};
pub use link::LinkStatus;
pub use permission::{can_manage_apps, resolve_user};
pub use pipeline::{InstallOutcome, InstallPipeline};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
