//! Persisted characteristics of networks the user has connected to

use crate::capabilities::Capabilities;
use crate::error::NetError;
use serde::{Deserialize, Serialize};
use simdesk_host::KeyValueStore;
use std::collections::BTreeMap;

/// Known-network cache keyed by SSID
///
/// Stored as a JSON object `{ ssid: { security, maxSpeed } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownNetworks(BTreeMap<String, Capabilities>);

impl KnownNetworks {
    /// Read the cache from `store`
    ///
    /// # Errors
    /// - `NetError::Persistence` if the store fails
    /// - `NetError::CorruptKnownNetworks` if the stored value has the wrong shape
    pub fn read(store: &dyn KeyValueStore, key: &str) -> Result<Self, NetError> {
        match store.get(key)? {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| NetError::CorruptKnownNetworks(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Read the cache, falling back to an empty set on any failure
    #[must_use]
    pub fn load_or_default(store: &dyn KeyValueStore, key: &str) -> Self {
        Self::read(store, key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "known networks unreadable, starting empty");
            Self::default()
        })
    }

    /// Write the cache to `store`
    ///
    /// # Errors
    /// Returns `NetError::Persistence` if the store rejects the write
    pub fn save(&self, store: &dyn KeyValueStore, key: &str) -> Result<(), NetError> {
        let value = serde_json::to_value(self).map_err(simdesk_host::HostError::from)?;
        store.set(key, value)?;
        Ok(())
    }

    /// Frozen capabilities for `ssid`
    #[inline]
    #[must_use]
    pub fn get(&self, ssid: &str) -> Option<&Capabilities> {
        self.0.get(ssid)
    }

    /// Freeze capabilities for `ssid`, replacing any previous entry
    pub fn insert(&mut self, ssid: impl Into<String>, caps: Capabilities) -> Option<Capabilities> {
        self.0.insert(ssid.into(), caps)
    }

    /// Forget `ssid`
    pub fn remove(&mut self, ssid: &str) -> Option<Capabilities> {
        self.0.remove(ssid)
    }

    /// Check if `ssid` is known
    #[inline]
    #[must_use]
    pub fn contains(&self, ssid: &str) -> bool {
        self.0.contains_key(ssid)
    }

    /// Known SSIDs in sorted order
    pub fn ssids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of known networks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no network is known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
