//! Error types for the install pipeline

use crate::job::AppId;

/// Install pipeline errors
///
/// Every variant is raised after the user has already been notified; the
/// caller only needs it for logging or control flow.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// No usable network connection
    #[error("no network connection, cannot download {app_id}")]
    NoConnection {
        /// Requested app
        app_id: AppId,
    },

    /// Acting user may not manage apps
    #[error("{user} may not {action} {app_id}")]
    PermissionDenied {
        /// Acting user
        user: String,
        /// Attempted action
        action: &'static str,
        /// Target app
        app_id: AppId,
    },

    /// Placeholder executable could not be written
    #[error("restore of {app_id} failed")]
    RestoreFailed {
        /// Target app
        app_id: AppId,
    },
}

impl InstallError {
    /// Check if the request was refused before any state changed
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NoConnection { .. } | Self::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_error_display() {
        let err = InstallError::PermissionDenied {
            user: "user".to_string(),
            action: "uninstall",
            app_id: AppId::from("paint"),
        };
        assert_eq!(err.to_string(), "user may not uninstall paint");
        assert!(err.is_precondition());

        let err = InstallError::RestoreFailed {
            app_id: AppId::from("paint"),
        };
        assert!(!err.is_precondition());
    }
}
