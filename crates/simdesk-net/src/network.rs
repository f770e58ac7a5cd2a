//! Visible network entries

use crate::capabilities::{round1, Capabilities};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// WiFi security protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Security {
    /// No encryption
    Open,
    /// Wired Equivalent Privacy
    Wep,
    /// WiFi Protected Access
    Wpa,
    /// WPA2
    Wpa2,
    /// WPA3
    Wpa3,
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "OPEN",
            Self::Wep => "WEP",
            Self::Wpa => "WPA",
            Self::Wpa2 => "WPA2",
            Self::Wpa3 => "WPA3",
        };
        f.write_str(name)
    }
}

/// Identifier of a network within one generation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub Uuid);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A network currently visible to the WiFi adapter
///
/// `speed` always equals `round1(max_speed * strength / 100)`; the only way
/// to change strength is [`Network::set_strength`], which keeps it so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    id: NetworkId,
    ssid: String,
    strength: u8,
    security: Security,
    channel: u8,
    bssid: String,
    max_speed: f64,
    speed: f64,
    connected: bool,
}

impl Network {
    /// Create an entry, computing its current speed
    #[must_use]
    pub fn new(
        id: NetworkId,
        ssid: impl Into<String>,
        strength: u8,
        capabilities: Capabilities,
        channel: u8,
        bssid: impl Into<String>,
    ) -> Self {
        let strength = strength.min(100);
        Self {
            id,
            ssid: ssid.into(),
            strength,
            security: capabilities.security,
            channel,
            bssid: bssid.into(),
            max_speed: capabilities.max_speed,
            speed: speed_at(capabilities.max_speed, strength),
            connected: false,
        }
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> NetworkId {
        self.id
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Signal strength, percent
    #[inline]
    #[must_use]
    pub fn strength(&self) -> u8 {
        self.strength
    }

    /// Security protocol
    #[inline]
    #[must_use]
    pub fn security(&self) -> Security {
        self.security
    }

    /// Radio channel, 1-11
    #[inline]
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Synthetic MAC address
    #[inline]
    #[must_use]
    pub fn bssid(&self) -> &str {
        &self.bssid
    }

    /// Speed at full signal, Mbps
    #[inline]
    #[must_use]
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Current speed, Mbps
    #[inline]
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Check if this is the active connection
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Frozen characteristics of this entry
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            security: self.security,
            max_speed: self.max_speed,
        }
    }

    /// Change signal strength and recompute speed
    pub fn set_strength(&mut self, strength: u8) {
        self.strength = strength.min(100);
        self.speed = speed_at(self.max_speed, self.strength);
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

/// Speed at a given signal strength, rounded to one decimal
#[inline]
#[must_use]
pub fn speed_at(max_speed: f64, strength: u8) -> f64 {
    round1(max_speed * f64::from(strength) / 100.0)
}

/// Synthetic BSSID for the entry at `index`
#[must_use]
pub fn bssid_for(index: usize) -> String {
    let [hi, lo] = u16::try_from(index).unwrap_or(u16::MAX).to_be_bytes();
    format!("02:5D:E5:00:{hi:02X}:{lo:02X}")
}
