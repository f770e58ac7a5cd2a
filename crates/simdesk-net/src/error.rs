//! Error types for the network simulation

use simdesk_host::HostError;

/// Network registry errors
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Operation needs WiFi switched on
    #[error("wifi is disabled")]
    WifiDisabled,

    /// Persisted known-network data has the wrong shape
    #[error("corrupt known-network data: {0}")]
    CorruptKnownNetworks(String),

    /// Host storage failed
    #[error("persistence failed: {0}")]
    Persistence(#[from] HostError),
}

impl NetError {
    /// Check if the error came from the storage layer
    #[inline]
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::CorruptKnownNetworks(_))
    }
}
