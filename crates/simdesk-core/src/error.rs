//! Error types for the desktop coordinator

use simdesk_install::InstallError;
use simdesk_net::NetError;
use std::path::PathBuf;

/// Desktop coordinator errors
#[derive(Debug, thiserror::Error)]
pub enum DesktopError {
    /// Configuration values are inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file is not valid TOML for [`crate::DesktopConfig`]
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Network registry refused an operation
    #[error(transparent)]
    Net(#[from] NetError),

    /// Install pipeline refused an operation
    #[error(transparent)]
    Install(#[from] InstallError),
}

impl DesktopError {
    /// Check if the operation was refused because of the current desktop
    /// state rather than a fault
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        match self {
            Self::Net(NetError::WifiDisabled) => true,
            Self::Install(err) => err.is_precondition(),
            _ => false,
        }
    }

    /// Check if the error came from loading configuration
    #[inline]
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Parse(_) | Self::Io { .. })
    }
}
