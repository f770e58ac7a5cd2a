//! Desktop coordinator
//!
//! [`Desktop`] owns the network registry and the install pipeline and is the
//! only thing that moves simulated time. Each service keeps its own timer
//! queue; [`Desktop::advance`] walks both in deadline order so events from
//! different services interleave exactly as they would on one clock.

use crate::config::DesktopConfig;
use crate::error::DesktopError;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use simdesk_host::{AppPolicy, Host, MemoryFilesystem, SimTime};
use simdesk_install::{AppId, InstallConfig, InstallOutcome, InstallPhase, InstallPipeline};
use simdesk_net::{Network, NetworkRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Offset between the network and install random streams of one seed
const INSTALL_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Point-in-time view of the desktop, for display and logging
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopSnapshot {
    /// Simulated milliseconds since start
    pub now_ms: u64,
    /// WiFi switch
    pub wifi_enabled: bool,
    /// Active SSID
    pub current_network: Option<String>,
    /// Scan in flight
    pub is_scanning: bool,
    /// Live speed of the active connection
    pub current_speed: f64,
    /// Visible networks
    pub networks: Vec<Network>,
    /// Whole-percent progress per in-flight install
    pub installing: BTreeMap<AppId, u8>,
}

/// Swap `base`'s filesystem for an in-memory one laid out for `install`
///
/// Executables land in `install.bin_dir`, and only `install.superuser` or
/// members of `install.admin_group` may register apps. Refusals go through
/// `base`'s notifier and localizer.
#[must_use]
pub fn memory_host(base: Host, install: &InstallConfig) -> Host {
    let policy = AppPolicy::new(
        Arc::clone(&base.users),
        Arc::clone(&base.notifier),
        Arc::clone(&base.localizer),
    )
    .with_admin_group(install.admin_group.as_str())
    .with_superuser(install.superuser.as_str());
    let fs = MemoryFilesystem::new()
        .with_bin_dir(install.bin_dir.as_str())
        .with_app_policy(policy);
    base.with_fs(Arc::new(fs))
}

/// The simulated desktop: WiFi plus app installs on one clock
pub struct Desktop {
    config: DesktopConfig,
    host: Host,
    network: NetworkRegistry,
    installer: InstallPipeline,
    now: SimTime,
}

impl Desktop {
    /// Create a desktop, seeding both random sources from `config.seed`
    ///
    /// # Errors
    /// Returns `DesktopError::Config` when the configuration is invalid
    pub fn new(config: DesktopConfig, host: Host) -> Result<Self, DesktopError> {
        let (net_rng, install_rng): (Box<dyn RngCore + Send>, Box<dyn RngCore + Send>) =
            match config.seed {
                Some(seed) => (
                    Box::new(StdRng::seed_from_u64(seed)),
                    Box::new(StdRng::seed_from_u64(seed ^ INSTALL_STREAM)),
                ),
                None => (Box::new(StdRng::from_entropy()), Box::new(StdRng::from_entropy())),
            };
        Self::with_rngs(config, host, net_rng, install_rng)
    }

    /// Create a desktop over in-memory collaborators matching `config`
    ///
    /// # Errors
    /// Returns `DesktopError::Config` when the configuration is invalid
    pub fn in_memory(config: DesktopConfig) -> Result<Self, DesktopError> {
        let host = memory_host(Host::in_memory(), &config.install);
        Self::new(config, host)
    }

    /// Create a desktop with explicit random sources
    ///
    /// # Errors
    /// Returns `DesktopError::Config` when the configuration is invalid
    pub fn with_rngs(
        config: DesktopConfig,
        host: Host,
        net_rng: Box<dyn RngCore + Send>,
        install_rng: Box<dyn RngCore + Send>,
    ) -> Result<Self, DesktopError> {
        config.validate()?;
        let network = NetworkRegistry::new(config.network.clone(), &host, net_rng);
        let installer = InstallPipeline::new(config.install.clone(), &host, install_rng);
        tracing::info!(seed = ?config.seed, "desktop started");

        Ok(Self {
            config,
            host,
            network,
            installer,
            now: SimTime::ZERO,
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DesktopConfig {
        &self.config
    }

    /// Injected collaborators
    #[inline]
    #[must_use]
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Network registry, read-only
    #[inline]
    #[must_use]
    pub fn network(&self) -> &NetworkRegistry {
        &self.network
    }

    /// Install pipeline, read-only
    #[inline]
    #[must_use]
    pub fn installer(&self) -> &InstallPipeline {
        &self.installer
    }

    /// Simulated time
    #[inline]
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    // WiFi

    /// Check if WiFi is switched on
    #[inline]
    #[must_use]
    pub fn wifi_enabled(&self) -> bool {
        self.network.wifi_enabled()
    }

    /// SSID of the active connection
    #[inline]
    #[must_use]
    pub fn current_network(&self) -> Option<&str> {
        self.network.current_network()
    }

    /// Visible networks
    #[inline]
    #[must_use]
    pub fn available_networks(&self) -> &[Network] {
        self.network.available_networks()
    }

    /// Check if a scan is in flight
    #[inline]
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.network.is_scanning()
    }

    /// Live speed of the active connection, 0 when there is none
    #[inline]
    #[must_use]
    pub fn current_speed(&self) -> f64 {
        self.network.current_speed()
    }

    /// Switch WiFi on or off
    pub fn set_wifi_enabled(&mut self, enabled: bool) {
        self.network.set_wifi_enabled(enabled);
    }

    /// Start a scan
    ///
    /// # Errors
    /// Returns `DesktopError::Net` when WiFi is off
    pub fn scan_networks(&mut self) -> Result<(), DesktopError> {
        Ok(self.network.scan_networks()?)
    }

    /// Connect to `ssid`
    pub fn connect_to_network(&mut self, ssid: &str) {
        self.network.connect_to_network(ssid);
    }

    /// Drop the active connection
    pub fn disconnect(&mut self) {
        self.network.disconnect();
    }

    /// Forget persisted characteristics of `ssid`
    pub fn forget_network(&mut self, ssid: &str) -> bool {
        self.network.forget_network(ssid)
    }

    // Apps

    /// Whole-percent progress of every in-flight install
    #[must_use]
    pub fn installing_apps(&self) -> BTreeMap<AppId, u8> {
        self.installer.installing_apps()
    }

    /// Phase of the install of `app_id`
    #[must_use]
    pub fn job_phase(&self, app_id: &str) -> Option<InstallPhase> {
        self.installer.job_phase(app_id)
    }

    /// Request an install, paced by the live network
    ///
    /// # Errors
    /// Returns `DesktopError::Install` when there is no connection
    pub fn handle_install(
        &mut self,
        app_id: &str,
        size_mb: f64,
        owner: Option<&str>,
    ) -> Result<InstallOutcome, DesktopError> {
        Ok(self
            .installer
            .handle_install(app_id, size_mb, owner, &self.network)?)
    }

    /// Abort an install
    pub fn cancel_install(&mut self, app_id: &str) -> bool {
        self.installer.cancel_install(app_id)
    }

    /// Remove an installed app
    ///
    /// # Errors
    /// Returns `DesktopError::Install` when the user may not manage apps
    pub fn handle_uninstall(&mut self, app_id: &str, owner: Option<&str>) -> Result<(), DesktopError> {
        Ok(self.installer.handle_uninstall(app_id, owner)?)
    }

    /// Check if an app's executable is missing
    #[must_use]
    pub fn is_app_broken(&self, app_id: &str) -> bool {
        self.installer.is_app_broken(app_id)
    }

    /// Recreate a missing executable
    ///
    /// # Errors
    /// Returns `DesktopError::Install` on refusal or write failure
    pub fn handle_restore(&self, app_id: &str, owner: Option<&str>) -> Result<(), DesktopError> {
        Ok(self.installer.handle_restore(app_id, owner)?)
    }

    // Time

    /// Move simulated time forward by `dt`, firing everything that falls due
    ///
    /// At each instant the registry runs before the pipeline, so a speed
    /// change is visible to an install tick due at the same time.
    pub fn advance(&mut self, dt: Duration) {
        let target = self.now + dt;
        while let Some(at) = self.next_deadline().filter(|at| *at <= target) {
            self.network.advance_to(at);
            self.installer.advance_to(at, &self.network);
        }
        self.network.advance_to(target);
        self.installer.advance_to(target, &self.network);
        self.now = target;
    }

    /// Earliest pending event across both services
    pub fn next_deadline(&mut self) -> Option<SimTime> {
        match (self.network.next_deadline(), self.installer.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Stop every timer and drop every in-flight install
    pub fn shutdown(&mut self) {
        self.network.shutdown();
        self.installer.shutdown();
        tracing::info!(at = %self.now, "desktop shut down");
    }

    /// Current state, for display
    #[must_use]
    pub fn snapshot(&self) -> DesktopSnapshot {
        DesktopSnapshot {
            now_ms: u64::try_from(self.now.as_millis()).unwrap_or(u64::MAX),
            wifi_enabled: self.wifi_enabled(),
            current_network: self.current_network().map(str::to_string),
            is_scanning: self.is_scanning(),
            current_speed: self.current_speed(),
            networks: self.available_networks().to_vec(),
            installing: self.installing_apps(),
        }
    }
}

impl std::fmt::Debug for Desktop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desktop")
            .field("now", &self.now)
            .field("wifi_enabled", &self.wifi_enabled())
            .field("current_network", &self.current_network())
            .field("installing", &self.installing_apps())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop(seed: u64) -> Desktop {
        Desktop::new(DesktopConfig::default().with_seed(seed), Host::in_memory()).unwrap()
    }

    #[test]
    fn advance_moves_both_clocks() {
        let mut d = desktop(1);
        d.advance(Duration::from_millis(2_500));
        assert_eq!(d.now(), SimTime::from_millis(2_500));
        assert_eq!(d.network().now(), d.now());
        assert_eq!(d.installer().now(), d.now());
    }

    #[test]
    fn same_seed_same_world() {
        let a = desktop(9);
        let b = desktop(9);
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = DesktopConfig::default();
        config.network.scan_delay_ms = 0;
        assert!(Desktop::new(config, Host::in_memory()).is_err());
    }

    #[test]
    fn in_memory_follows_install_layout() {
        let mut config = DesktopConfig::default().with_seed(4);
        config.install.bin_dir = "/opt/apps".to_string();
        let d = Desktop::in_memory(config).unwrap();
        assert!(d.host().fs.node_at_path("/opt/apps").is_some());
        assert!(!d.is_app_broken("paint"));
    }

    #[test]
    fn shutdown_leaves_nothing_pending() {
        let mut d = desktop(3);
        d.scan_networks().unwrap();
        d.shutdown();
        assert_eq!(d.next_deadline(), None);
    }
}
