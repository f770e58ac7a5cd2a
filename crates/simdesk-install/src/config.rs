//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing, stall and permission knobs of the install pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Delay between download ticks; also the nominal transfer window
    pub download_tick_ms: u64,
    /// Base delay between install ticks, scaled by jitter in `[0.5, 1.5)`
    pub install_tick_ms: u64,
    /// Extra delay of a slow-finalize stall
    pub stall_delay_ms: u64,
    /// Per-tick stall probability while progress is in `(85, 95)`
    pub stall_chance: f64,
    /// Delay between reaching 100% and registering the app
    pub finalize_delay_ms: u64,
    /// Acting user when a request names no owner
    pub default_user: String,
    /// Group whose members may manage apps
    pub admin_group: String,
    /// Identity that may always manage apps
    pub superuser: String,
    /// Directory holding app executables
    pub bin_dir: String,
}

impl InstallConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a different acting user for ownerless requests
    #[inline]
    #[must_use]
    pub fn with_default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = user.into();
        self
    }

    /// With a different stall probability
    #[inline]
    #[must_use]
    pub fn with_stall_chance(mut self, chance: f64) -> Self {
        self.stall_chance = chance;
        self
    }

    /// Download tick interval
    #[inline]
    #[must_use]
    pub fn download_tick(&self) -> Duration {
        Duration::from_millis(self.download_tick_ms)
    }

    /// Base install tick interval
    #[inline]
    #[must_use]
    pub fn install_tick(&self) -> Duration {
        Duration::from_millis(self.install_tick_ms)
    }

    /// Slow-finalize stall
    #[inline]
    #[must_use]
    pub fn stall_delay(&self) -> Duration {
        Duration::from_millis(self.stall_delay_ms)
    }

    /// Completion delay
    #[inline]
    #[must_use]
    pub fn finalize_delay(&self) -> Duration {
        Duration::from_millis(self.finalize_delay_ms)
    }

    /// Path of the executable for `app_id`
    #[must_use]
    pub fn executable_path(&self, app_id: &str) -> String {
        format!("{}/{}", self.bin_dir.trim_end_matches('/'), app_id)
    }

    /// Check the knobs are coherent
    ///
    /// # Errors
    /// Returns a description of the offending field
    pub fn validate(&self) -> Result<(), String> {
        if self.download_tick_ms == 0 || self.install_tick_ms == 0 || self.finalize_delay_ms == 0 {
            return Err("install delays must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.stall_chance) {
            return Err(format!("stall chance {} outside [0, 1]", self.stall_chance));
        }
        if self.bin_dir.is_empty() {
            return Err("bin dir must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            download_tick_ms: 100,
            install_tick_ms: 30,
            stall_delay_ms: 800,
            stall_chance: 0.2,
            finalize_delay_ms: 500,
            default_user: "user".to_string(),
            admin_group: "admin".to_string(),
            superuser: "root".to_string(),
            bin_dir: "/usr/bin".to_string(),
        }
    }
}
