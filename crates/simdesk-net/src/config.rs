//! Registry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and generation knobs of the network registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whether WiFi starts switched on
    pub start_enabled: bool,
    /// Storage key of the known-network cache
    pub known_networks_key: String,
    /// Simulated scan duration
    pub scan_delay_ms: u64,
    /// Period of background signal fluctuation
    pub fluctuation_interval_ms: u64,
    /// Fewest networks a scan produces
    pub min_networks: usize,
    /// Most networks a scan produces
    pub max_networks: usize,
    /// Most previously-known networks mixed into a scan
    pub max_known_per_scan: usize,
    /// Lowest strength of a freshly generated network
    pub strength_min: u8,
    /// Highest strength of a freshly generated network
    pub strength_max: u8,
    /// Largest strength change per fluctuation
    pub fluctuation_step: u8,
    /// Strength never fluctuates below this
    pub strength_floor: u8,
}

impl NetworkConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With WiFi initially on or off
    #[inline]
    #[must_use]
    pub fn with_start_enabled(mut self, enabled: bool) -> Self {
        self.start_enabled = enabled;
        self
    }

    /// With a different scan duration
    #[inline]
    #[must_use]
    pub fn with_scan_delay_ms(mut self, ms: u64) -> Self {
        self.scan_delay_ms = ms;
        self
    }

    /// Scan duration
    #[inline]
    #[must_use]
    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }

    /// Fluctuation period
    #[inline]
    #[must_use]
    pub fn fluctuation_interval(&self) -> Duration {
        Duration::from_millis(self.fluctuation_interval_ms)
    }

    /// Check the knobs are coherent, describing the first problem found
    ///
    /// # Errors
    /// Returns a description of the offending field
    pub fn validate(&self) -> Result<(), String> {
        if self.scan_delay_ms == 0 || self.fluctuation_interval_ms == 0 {
            return Err("network delays must be positive".to_string());
        }
        if self.min_networks == 0 || self.min_networks > self.max_networks {
            return Err(format!(
                "network count range {}..={} is empty",
                self.min_networks, self.max_networks
            ));
        }
        if self.strength_min > self.strength_max || self.strength_max > 100 {
            return Err(format!(
                "strength range {}..={} is invalid",
                self.strength_min, self.strength_max
            ));
        }
        if self.strength_floor > 100 {
            return Err("strength floor above 100".to_string());
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            start_enabled: true,
            known_networks_key: "simdesk.wifi.knownNetworks".to_string(),
            scan_delay_ms: 1500,
            fluctuation_interval_ms: 2000,
            min_networks: 4,
            max_networks: 6,
            max_known_per_scan: 1,
            strength_min: 60,
            strength_max: 100,
            fluctuation_step: 5,
            strength_floor: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = NetworkConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_delay(), Duration::from_millis(1500));
        assert_eq!(config.fluctuation_interval(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_empty_ranges() {
        let mut config = NetworkConfig::new();
        config.min_networks = 7;
        assert!(config.validate().is_err());

        let config = NetworkConfig::new().with_scan_delay_ms(0);
        assert!(config.validate().is_err());
    }
}
