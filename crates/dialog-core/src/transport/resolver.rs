//! DNS collaborator
//!
//! Routing only needs `host -> addresses`; the first result wins and the
//! port comes from the route or contact, defaulting to 5060.

use std::collections::HashMap;
use std::net::{IpAddr, ToSocketAddrs};

use tracing::debug;

/// Host name resolution used by the routing engines
pub trait DnsResolver: Send + Sync {
    fn resolve_host(&self, host: &str) -> Vec<IpAddr>;
}

/// Strip IPv6 brackets and parse an IP literal
pub(crate) fn ip_literal(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[').trim_end_matches(']').parse().ok()
}

/// Blocking resolver backed by the system (`getaddrinfo`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl DnsResolver for SystemResolver {
    fn resolve_host(&self, host: &str) -> Vec<IpAddr> {
        if let Some(ip) = ip_literal(host) {
            return vec![ip];
        }
        match (host, 5060u16).to_socket_addrs() {
            Ok(addrs) => addrs.map(|addr| addr.ip()).collect(),
            Err(e) => {
                debug!("DNS lookup for {} failed: {}", host, e);
                Vec::new()
            }
        }
    }
}

/// Fixed host table; IP literals resolve to themselves
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>, addr: IpAddr) -> Self {
        self.hosts
            .entry(host.into().to_ascii_lowercase())
            .or_default()
            .push(addr);
        self
    }
}

impl DnsResolver for StaticResolver {
    fn resolve_host(&self, host: &str) -> Vec<IpAddr> {
        if let Some(ip) = ip_literal(host) {
            return vec![ip];
        }
        self.hosts
            .get(&host.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}
