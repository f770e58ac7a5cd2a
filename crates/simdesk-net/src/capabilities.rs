//! Deterministic network characteristics
//!
//! A network's security and maximum speed are a pure function of its SSID,
//! so the same name looks the same on every scan and every run. Once the
//! user connects, the derived values are frozen in [`KnownNetworks`] and
//! take precedence over re-derivation.

use crate::known::KnownNetworks;
use crate::network::Security;
use serde::{Deserialize, Serialize};

/// Carrier names that get carrier-grade security, matched case-sensitively
const CARRIERS: [&str; 4] = ["Verizon", "ATT", "Xfinity", "T-Mobile"];

/// Security and speed ceiling of a network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Security protocol
    pub security: Security,
    /// Speed at full signal, Mbps
    pub max_speed: f64,
}

/// Derive capabilities for `ssid`, preferring the persisted entry
///
/// Never consults a random source: identical input always yields an
/// identical result.
#[must_use]
pub fn derive_capabilities(ssid: &str, known: &KnownNetworks) -> Capabilities {
    if let Some(caps) = known.get(ssid) {
        return *caps;
    }

    let security = classify_security(ssid);
    let max_speed = max_speed_for(security, stable_unit(&format!("{ssid}_speed")));

    Capabilities {
        security,
        max_speed,
    }
}

/// djb2-xor hash over UTF-16 code units, wrapping at 32 bits
#[must_use]
pub fn djb2(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(5381u32, |hash, unit| hash.wrapping_mul(33) ^ u32::from(unit))
}

/// Stable pseudo-random value in `[0, 1)` for `input`
#[must_use]
pub fn stable_unit(input: &str) -> f64 {
    f64::from(djb2(input) % 1000) / 1000.0
}

/// Round to one decimal place
#[inline]
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn classify_security(ssid: &str) -> Security {
    let name = ssid.to_lowercase();
    let rng = stable_unit(ssid);

    if ["insecure", "public", "free"].iter().any(|s| name.contains(s)) {
        Security::Open
    } else if name.contains("legacy") {
        Security::Wep
    } else if name.contains("home") {
        if rng > 0.5 {
            Security::Wpa2
        } else {
            Security::Wpa3
        }
    } else if CARRIERS.iter().any(|c| ssid.contains(c)) {
        if rng > 0.3 {
            Security::Wpa3
        } else {
            Security::Wpa2
        }
    } else {
        match stable_unit(&format!("{ssid}_security")) {
            r if r < 0.1 => Security::Wep,
            r if r < 0.3 => Security::Wpa,
            r if r < 0.7 => Security::Wpa2,
            _ => Security::Wpa3,
        }
    }
}

fn max_speed_for(security: Security, rng: f64) -> f64 {
    let speed = match security {
        Security::Open => 1.0 + rng * 1.5,
        Security::Wep => 1.0 + rng * 4.0,
        Security::Wpa => 5.0 + rng * 10.0,
        Security::Wpa2 => (20.0 + rng * 130.0).floor(),
        Security::Wpa3 => (150.0 + rng * 450.0).floor(),
    };
    round1(speed)
}

/// Speed range, Mbps, a security class can derive into
#[must_use]
pub fn speed_range(security: Security) -> (f64, f64) {
    match security {
        Security::Open => (1.0, 2.5),
        Security::Wep => (1.0, 5.0),
        Security::Wpa => (5.0, 15.0),
        Security::Wpa2 => (20.0, 150.0),
        Security::Wpa3 => (150.0, 600.0),
    }
}
