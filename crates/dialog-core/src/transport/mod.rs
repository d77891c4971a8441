//! Transport and DNS collaborator interfaces
//!
//! Socket I/O lives outside this crate. The engines only see a
//! [`TransportInfo`] snapshot of the connection a message arrived on, and
//! hand their routing decision back as message-local properties:
//!
//! | property | meaning |
//! |---|---|
//! | `target-address` | next-hop IP |
//! | `target-port` | next-hop port |
//! | `target-transport` | `UDP`, `TCP`, `TLS`, `WS`, ... |
//! | `transport-id` | connection to reuse for the leg |

pub mod resolver;

use std::net::{IpAddr, SocketAddr};

pub use resolver::{DnsResolver, StaticResolver, SystemResolver};

pub const TARGET_ADDRESS: &str = "target-address";
pub const TARGET_PORT: &str = "target-port";
pub const TARGET_TRANSPORT: &str = "target-transport";
pub const TRANSPORT_ID: &str = "transport-id";

/// The connection a message was received on or sent over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInfo {
    pub local_address: SocketAddr,
    pub remote_address: SocketAddr,
    /// Lowercase scheme (`udp`, `tcp`, `tls`, `ws`)
    pub transport_scheme: String,
    /// Stable per-connection id, reused so in-dialog traffic returns over
    /// the same connection
    pub identifier: u64,
}

impl TransportInfo {
    pub fn new(
        local_address: SocketAddr,
        remote_address: SocketAddr,
        transport_scheme: impl Into<String>,
        identifier: u64,
    ) -> Self {
        Self {
            local_address,
            remote_address,
            transport_scheme: transport_scheme.into().to_ascii_lowercase(),
            identifier,
        }
    }

    pub fn is_reliable(&self) -> bool {
        self.transport_scheme != "udp"
    }
}

/// RFC 1918 / RFC 4193 ranges plus loopback and link-local
pub(crate) fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}
