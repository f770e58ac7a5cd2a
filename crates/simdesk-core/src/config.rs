//! Desktop configuration
//!
//! One TOML document configures the whole simulation:
//!
//! ```toml
//! seed = 42
//! driver_period_ms = 50
//!
//! [network]
//! scan_delay_ms = 1500
//!
//! [install]
//! default_user = "admin"
//! stall_chance = 0.2
//! ```
//!
//! Every table and field is optional and falls back to its default.

use crate::error::DesktopError;
use serde::{Deserialize, Serialize};
use simdesk_install::InstallConfig;
use simdesk_net::NetworkConfig;
use std::path::Path;
use std::time::Duration;

/// Configuration of a [`crate::Desktop`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    /// Network registry knobs
    pub network: NetworkConfig,
    /// Install pipeline knobs
    pub install: InstallConfig,
    /// Real-time driver period
    pub driver_period_ms: u64,
    /// Seed for the random sources; entropy when absent
    pub seed: Option<u64>,
}

impl DesktopConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With network knobs
    #[inline]
    #[must_use]
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// With install knobs
    #[inline]
    #[must_use]
    pub fn with_install(mut self, install: InstallConfig) -> Self {
        self.install = install;
        self
    }

    /// With a fixed seed
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Real-time driver period
    #[inline]
    #[must_use]
    pub fn driver_period(&self) -> Duration {
        Duration::from_millis(self.driver_period_ms)
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// `DesktopError::Parse` on malformed TOML, `DesktopError::Config` when
    /// values are inconsistent
    pub fn from_toml_str(text: &str) -> Result<Self, DesktopError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `DesktopError::Io` when the file cannot be read, otherwise as
    /// [`DesktopConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DesktopError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DesktopError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading desktop configuration");
        Self::from_toml_str(&text)
    }

    /// Check every section
    ///
    /// # Errors
    /// Returns `DesktopError::Config` naming the first offending value
    pub fn validate(&self) -> Result<(), DesktopError> {
        self.network.validate().map_err(DesktopError::Config)?;
        self.install.validate().map_err(DesktopError::Config)?;
        if self.driver_period_ms == 0 {
            return Err(DesktopError::Config("driver period must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            install: InstallConfig::default(),
            driver_period_ms: 50,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(DesktopConfig::from_toml_str("").unwrap(), DesktopConfig::default());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = DesktopConfig::from_toml_str(
            r#"
            seed = 7

            [network]
            scan_delay_ms = 200

            [install]
            default_user = "admin"
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.network.scan_delay_ms, 200);
        assert_eq!(config.network.fluctuation_interval_ms, 2000);
        assert_eq!(config.install.default_user, "admin");
        assert_eq!(config.install.download_tick_ms, 100);
    }

    #[test]
    fn zero_delays_are_rejected() {
        let err = DesktopConfig::from_toml_str("[install]\ndownload_tick_ms = 0\n").unwrap_err();
        assert!(matches!(err, DesktopError::Config(_)));

        let err = DesktopConfig::from_toml_str("driver_period_ms = 0\n").unwrap_err();
        assert!(matches!(err, DesktopError::Config(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = DesktopConfig::from_toml_str("seed = \"many\"").unwrap_err();
        assert!(matches!(err, DesktopError::Parse(_)));
    }
}
