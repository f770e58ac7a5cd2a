//! Install jobs
//!
//! Progress runs from 0 to 100: the first half is the download, the second
//! half the install. The download half is driven by bytes moved, the install
//! half by random increments.

use serde::{Deserialize, Serialize};
use simdesk_host::TimerId;
use std::borrow::Borrow;
use std::fmt;
use std::time::Duration;

/// Progress at which the download phase ends
pub const DOWNLOAD_SHARE: f64 = 50.0;

/// Progress of a finished job
pub const COMPLETE: f64 = 100.0;

/// Application identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    /// Create an identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AppId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AppId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for AppId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a job is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallPhase {
    /// Bytes moving, progress 0-50
    Downloading,
    /// Unpacking, progress 50-100
    Installing,
    /// At 100, waiting to register the app
    Finalizing,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Downloading => "downloading",
            Self::Installing => "installing",
            Self::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// One in-flight install
#[derive(Debug, Clone)]
pub struct InstallJob {
    app_id: AppId,
    owner: String,
    size_mb: f64,
    progress: f64,
    downloaded_mb: f64,
    pub(crate) timer: Option<TimerId>,
}

impl InstallJob {
    /// Create a job at 0%
    #[must_use]
    pub fn new(app_id: AppId, owner: impl Into<String>, size_mb: f64) -> Self {
        Self {
            app_id,
            owner: owner.into(),
            size_mb,
            progress: 0.0,
            downloaded_mb: 0.0,
            timer: None,
        }
    }

    /// App being installed
    #[inline]
    #[must_use]
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// User the app is installed for
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Download size, MB
    #[inline]
    #[must_use]
    pub fn size_mb(&self) -> f64 {
        self.size_mb
    }

    /// Exact progress, 0-100
    #[inline]
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Megabytes downloaded so far
    #[inline]
    #[must_use]
    pub fn downloaded_mb(&self) -> f64 {
        self.downloaded_mb
    }

    /// Whole-percent progress as shown to observers
    #[inline]
    #[must_use]
    pub fn percent(&self) -> u8 {
        // progress is kept within [0, 100]
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = self.progress.floor() as u8;
        percent
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> InstallPhase {
        if self.progress < DOWNLOAD_SHARE {
            InstallPhase::Downloading
        } else if self.progress < COMPLETE {
            InstallPhase::Installing
        } else {
            InstallPhase::Finalizing
        }
    }

    /// Move bytes at `speed_mbps` for one `window`, returning MB moved
    ///
    /// A zero speed moves nothing and leaves progress where it was.
    pub fn download(&mut self, speed_mbps: f64, window: Duration) -> f64 {
        let moved = speed_mbps.max(0.0) / 8.0 * window.as_secs_f64();
        self.downloaded_mb += moved;
        self.progress = if self.size_mb > 0.0 {
            (self.downloaded_mb / self.size_mb * DOWNLOAD_SHARE).min(DOWNLOAD_SHARE)
        } else {
            DOWNLOAD_SHARE
        };
        moved
    }

    /// Advance the install half by `step` percent, capped at 100
    pub fn install(&mut self, step: f64) {
        self.progress = (self.progress + step).min(COMPLETE);
    }
}
