//! Network registry
//!
//! Owns the visible network list, the WiFi switch, the active connection and
//! the known-network cache. All timed behavior (scan completion and signal
//! fluctuation) runs on the registry's own [`TimerQueue`], stepped by
//! [`NetworkRegistry::advance_to`].

use crate::config::NetworkConfig;
use crate::error::NetError;
use crate::generation::generate_networks;
use crate::known::KnownNetworks;
use crate::network::Network;
use rand::{Rng, RngCore};
use simdesk_host::{Host, KeyValueStore, SimTime, TimerId, TimerQueue, UsageTracker};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegistryEvent {
    ScanComplete,
    Fluctuate,
}

/// Simulated WiFi adapter state
pub struct NetworkRegistry {
    config: NetworkConfig,
    store: Arc<dyn KeyValueStore>,
    usage: Arc<dyn UsageTracker>,
    rng: Box<dyn RngCore + Send>,
    timers: TimerQueue<RegistryEvent>,
    wifi_enabled: bool,
    current: Option<String>,
    networks: Vec<Network>,
    known: KnownNetworks,
    scan_timer: Option<TimerId>,
    fluctuation_timer: Option<TimerId>,
}

impl NetworkRegistry {
    /// Create a registry, loading known networks from the host store
    ///
    /// An unreadable cache is replaced by an empty one. WiFi is switched on
    /// (and the visible list populated) when `config.start_enabled` is set.
    #[must_use]
    pub fn new(config: NetworkConfig, host: &Host, rng: Box<dyn RngCore + Send>) -> Self {
        let known = KnownNetworks::load_or_default(host.store.as_ref(), &config.known_networks_key);
        let start_enabled = config.start_enabled;

        let mut registry = Self {
            config,
            store: Arc::clone(&host.store),
            usage: Arc::clone(&host.usage),
            rng,
            timers: TimerQueue::new(),
            wifi_enabled: false,
            current: None,
            networks: Vec::new(),
            known,
            scan_timer: None,
            fluctuation_timer: None,
        };
        if start_enabled {
            registry.set_wifi_enabled(true);
        }
        registry
    }

    /// Check if WiFi is switched on
    #[inline]
    #[must_use]
    pub fn wifi_enabled(&self) -> bool {
        self.wifi_enabled
    }

    /// SSID of the active connection, kept while WiFi is off
    #[inline]
    #[must_use]
    pub fn current_network(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Visible networks
    #[inline]
    #[must_use]
    pub fn available_networks(&self) -> &[Network] {
        &self.networks
    }

    /// Visible entry for `ssid`
    #[must_use]
    pub fn network(&self, ssid: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.ssid() == ssid)
    }

    /// Check if a scan is in flight
    #[inline]
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scan_timer.is_some()
    }

    /// Persisted network characteristics
    #[inline]
    #[must_use]
    pub fn known_networks(&self) -> &KnownNetworks {
        &self.known
    }

    /// Visible entry of the active connection, when WiFi is on
    #[must_use]
    pub fn active_network(&self) -> Option<&Network> {
        if !self.wifi_enabled {
            return None;
        }
        self.network(self.current.as_deref()?)
    }

    /// Live speed of the active connection, 0 when there is none
    #[must_use]
    pub fn current_speed(&self) -> f64 {
        self.active_network().map_or(0.0, Network::speed)
    }

    /// Simulated time of the registry clock
    #[inline]
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.timers.now()
    }

    /// Switch WiFi on or off
    ///
    /// Off clears the visible list and stops scanning and fluctuation. On
    /// starts fluctuation and populates the list if it is empty.
    pub fn set_wifi_enabled(&mut self, enabled: bool) {
        if enabled == self.wifi_enabled {
            return;
        }
        self.wifi_enabled = enabled;

        if enabled {
            if self.networks.is_empty() {
                self.regenerate();
            }
            self.start_fluctuation();
            tracing::info!(visible = self.networks.len(), "wifi enabled");
        } else {
            self.networks.clear();
            if let Some(timer) = self.scan_timer.take() {
                self.timers.cancel(timer);
            }
            self.stop_fluctuation();
            tracing::info!("wifi disabled");
        }
        self.sync_connected();
    }

    /// Start a scan; the visible list is replaced when it completes
    ///
    /// A scan already in flight is restarted.
    ///
    /// # Errors
    /// Returns `NetError::WifiDisabled` when WiFi is off
    pub fn scan_networks(&mut self) -> Result<(), NetError> {
        if !self.wifi_enabled {
            return Err(NetError::WifiDisabled);
        }
        if let Some(timer) = self.scan_timer.take() {
            self.timers.cancel(timer);
            tracing::debug!("scan restarted");
        }
        let timer = self.timers.schedule(self.config.scan_delay(), RegistryEvent::ScanComplete);
        self.scan_timer = Some(timer);
        tracing::debug!(delay_ms = self.config.scan_delay_ms, "scan started");
        Ok(())
    }

    /// Connect to `ssid`, switching WiFi on if needed
    ///
    /// When `ssid` is visible its characteristics are frozen into the known
    /// cache. Connecting to an invisible SSID is accepted but persists
    /// nothing.
    pub fn connect_to_network(&mut self, ssid: &str) {
        let visible = self.network(ssid).map(Network::capabilities);

        self.current = Some(ssid.to_string());
        if !self.wifi_enabled {
            self.set_wifi_enabled(true);
        }

        match visible {
            Some(caps) => {
                self.known.insert(ssid, caps);
                self.persist_known();
                tracing::info!(ssid, security = %caps.security, max_speed = caps.max_speed, "connected");
            }
            None => tracing::info!(ssid, "connected to network outside visible list"),
        }
        self.sync_connected();
    }

    /// Drop the active connection and reset session usage
    pub fn disconnect(&mut self) {
        if let Some(ssid) = self.current.take() {
            tracing::info!(ssid = %ssid, "disconnected");
        }
        self.usage.reset_session();
        self.sync_connected();
    }

    /// Remove `ssid` from the known cache, returning whether it was known
    pub fn forget_network(&mut self, ssid: &str) -> bool {
        if self.known.remove(ssid).is_none() {
            return false;
        }
        self.persist_known();
        tracing::info!(ssid, "network forgotten");
        true
    }

    /// Due time of the next scheduled registry event
    pub fn next_deadline(&mut self) -> Option<SimTime> {
        self.timers.next_deadline()
    }

    /// Fire every registry event due at or before `at`
    pub fn advance_to(&mut self, at: SimTime) {
        while let Some((_, event)) = self.timers.pop_due(at) {
            match event {
                RegistryEvent::ScanComplete => self.complete_scan(),
                RegistryEvent::Fluctuate => self.fluctuate(),
            }
        }
        self.timers.settle(at);
    }

    /// Stop every timer; the registry stays readable but inert
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.scan_timer = None;
        self.fluctuation_timer = None;
    }

    fn complete_scan(&mut self) {
        self.scan_timer = None;
        self.regenerate();
        self.sync_connected();
        tracing::info!(visible = self.networks.len(), "scan complete");
    }

    fn fluctuate(&mut self) {
        self.fluctuation_timer = None;
        if !self.wifi_enabled {
            return;
        }

        let step = i16::from(self.config.fluctuation_step);
        let floor = i16::from(self.config.strength_floor);
        for net in &mut self.networks {
            let delta = self.rng.gen_range(-step..=step);
            let next = (i16::from(net.strength()) + delta).clamp(floor, 100);
            net.set_strength(u8::try_from(next).unwrap_or(100));
        }
        self.start_fluctuation();
    }

    fn regenerate(&mut self) {
        self.networks = generate_networks(
            &mut self.rng,
            &self.config,
            self.current.as_deref(),
            &self.known,
        );
    }

    fn start_fluctuation(&mut self) {
        if self.fluctuation_timer.is_none() {
            let timer = self
                .timers
                .schedule(self.config.fluctuation_interval(), RegistryEvent::Fluctuate);
            self.fluctuation_timer = Some(timer);
        }
    }

    fn stop_fluctuation(&mut self) {
        if let Some(timer) = self.fluctuation_timer.take() {
            self.timers.cancel(timer);
        }
    }

    fn sync_connected(&mut self) {
        let active = self.current.as_deref().filter(|_| self.wifi_enabled);
        for net in &mut self.networks {
            let connected = Some(net.ssid()) == active;
            net.set_connected(connected);
        }
    }

    fn persist_known(&self) {
        if let Err(e) = self.known.save(self.store.as_ref(), &self.config.known_networks_key) {
            tracing::warn!(error = %e, "failed to persist known networks");
        }
    }
}

impl fmt::Debug for NetworkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkRegistry")
            .field("wifi_enabled", &self.wifi_enabled)
            .field("current", &self.current)
            .field("networks", &self.networks.len())
            .field("known", &self.known.len())
            .field("scanning", &self.is_scanning())
            .finish_non_exhaustive()
    }
}
