//! Error types for host collaborators

/// Failure reported by a host collaborator
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Backing storage unavailable or rejected the operation
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Stored value could not be (de)serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HostError {
    /// Check if the failure is transient storage trouble rather than bad data
    #[inline]
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
