//! Read-only view of the network connection

use simdesk_net::NetworkRegistry;

/// What the pipeline needs to know about connectivity
pub trait LinkStatus {
    /// Speed of the usable connection in Mbps, `None` when there is none
    ///
    /// Usable means WiFi is on, a connection is active, and that network is
    /// in the visible list.
    fn link_speed_mbps(&self) -> Option<f64>;
}

impl LinkStatus for NetworkRegistry {
    fn link_speed_mbps(&self) -> Option<f64> {
        self.active_network().map(simdesk_net::Network::speed)
    }
}

/// A fixed link, handy when no registry is around
impl LinkStatus for Option<f64> {
    fn link_speed_mbps(&self) -> Option<f64> {
        *self
    }
}
