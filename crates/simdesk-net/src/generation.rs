//! Generation of the visible network set
//!
//! Randomness only decides *which* SSIDs are visible and how strong they
//! are; what each SSID looks like comes from
//! [`derive_capabilities`](crate::capabilities::derive_capabilities).

use crate::capabilities::derive_capabilities;
use crate::config::NetworkConfig;
use crate::known::KnownNetworks;
use crate::network::{bssid_for, Network, NetworkId};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

const PREFIXES: [&str; 16] = [
    "Home", "Office", "Cafe", "Library", "Airport", "Hotel", "Linksys", "NETGEAR", "TP-Link",
    "Verizon", "ATT", "Xfinity", "T-Mobile", "Guest", "Public", "Legacy",
];

const SUFFIXES: [&str; 6] = ["_5G", "_2.4G", "_EXT", "-Guest", "_Free", "_insecure"];

/// Give up synthesizing after this many duplicate draws
const MAX_SYNTH_ATTEMPTS: usize = 256;

/// Highest radio channel
const CHANNELS: usize = 11;

/// Produce a fresh visible set
///
/// The connected SSID always comes first, followed by up to
/// `max_known_per_scan` previously-known SSIDs and then synthesized names.
/// SSIDs are unique within the returned set.
pub fn generate_networks<R: Rng + ?Sized>(
    rng: &mut R,
    config: &NetworkConfig,
    connected: Option<&str>,
    known: &KnownNetworks,
) -> Vec<Network> {
    let target = rng.gen_range(config.min_networks..=config.max_networks);
    let mut ssids: Vec<String> = Vec::with_capacity(target);

    if let Some(ssid) = connected {
        ssids.push(ssid.to_string());
    }

    let mut remembered: Vec<&str> = known.ssids().filter(|s| Some(*s) != connected).collect();
    remembered.shuffle(rng);
    let take = rng.gen_range(0..=config.max_known_per_scan);
    for ssid in remembered.into_iter().take(take) {
        if ssids.len() < target {
            ssids.push(ssid.to_string());
        }
    }

    let mut attempts = 0;
    while ssids.len() < target && attempts < MAX_SYNTH_ATTEMPTS {
        attempts += 1;
        let candidate = synthesize_ssid(rng);
        if !ssids.contains(&candidate) {
            ssids.push(candidate);
        }
    }

    ssids
        .into_iter()
        .enumerate()
        .map(|(index, ssid)| {
            let caps = derive_capabilities(&ssid, known);
            let strength = rng.gen_range(config.strength_min..=config.strength_max);
            let channel = u8::try_from(index % CHANNELS).unwrap_or(0) + 1;
            let id = NetworkId(Uuid::from_u128(rng.gen()));
            Network::new(id, ssid, strength, caps, channel, bssid_for(index))
        })
        .collect()
}

/// Build a name of the form `prefix[-num][suffix]`
pub fn synthesize_ssid<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix = PREFIXES.choose(rng).copied().unwrap_or("WiFi");
    let mut ssid = prefix.to_string();
    if rng.gen_bool(0.5) {
        ssid.push_str(&format!("-{}", rng.gen_range(0..1000)));
    }
    if rng.gen_bool(0.5) {
        if let Some(suffix) = SUFFIXES.choose(rng) {
            ssid.push_str(suffix);
        }
    }
    ssid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use crate::network::Security;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn known_with(ssids: &[&str]) -> KnownNetworks {
        let mut known = KnownNetworks::default();
        for ssid in ssids {
            known.insert(
                *ssid,
                Capabilities {
                    security: Security::Wpa,
                    max_speed: 9.9,
                },
            );
        }
        known
    }

    #[test]
    fn size_channels_and_strength_in_bounds() {
        let config = NetworkConfig::default();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let nets = generate_networks(&mut rng, &config, None, &KnownNetworks::default());
            assert!((4..=6).contains(&nets.len()));
            for (i, net) in nets.iter().enumerate() {
                assert_eq!(usize::from(net.channel()), i + 1);
                assert!((60..=100).contains(&net.strength()));
                assert!(!net.is_connected());
            }
        }
    }

    #[test]
    fn ssids_and_bssids_unique() {
        let config = NetworkConfig::default();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let nets = generate_networks(&mut rng, &config, Some("OfficeNet"), &known_with(&["A", "B"]));
            let ssids: HashSet<_> = nets.iter().map(Network::ssid).collect();
            let bssids: HashSet<_> = nets.iter().map(Network::bssid).collect();
            assert_eq!(ssids.len(), nets.len());
            assert_eq!(bssids.len(), nets.len());
        }
    }

    #[test]
    fn connected_ssid_always_first() {
        let config = NetworkConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let nets = generate_networks(&mut rng, &config, Some("OfficeNet"), &KnownNetworks::default());
        assert_eq!(nets[0].ssid(), "OfficeNet");
    }

    #[test]
    fn at_most_one_known_besides_connected() {
        let config = NetworkConfig::default();
        let known = known_with(&["Alpha", "Bravo", "Charlie", "OfficeNet"]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let nets = generate_networks(&mut rng, &config, Some("OfficeNet"), &known);
            let remembered = nets
                .iter()
                .filter(|n| n.ssid() != "OfficeNet" && known.contains(n.ssid()))
                .count();
            assert!(remembered <= 1, "seed {seed} mixed in {remembered} known networks");
        }
    }

    #[test]
    fn known_networks_keep_frozen_capabilities() {
        let config = NetworkConfig::default();
        let known = known_with(&["OfficeNet"]);
        let mut rng = StdRng::seed_from_u64(3);
        let nets = generate_networks(&mut rng, &config, Some("OfficeNet"), &known);
        assert_eq!(nets[0].security(), Security::Wpa);
        assert_eq!(nets[0].max_speed(), 9.9);
    }

    #[test]
    fn synthesized_names_use_known_prefixes() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let ssid = synthesize_ssid(&mut rng);
            assert!(PREFIXES.iter().any(|p| ssid.starts_with(p)), "{ssid}");
        }
    }
}
