//! Route set encoding and next-hop resolution for in-dialog requests.
//!
//! A stored route set keeps the next hop as its last element. Encoding
//! prepends the elements first to last, so the next hop ends up as the
//! top Route on the wire.

use std::net::{IpAddr, SocketAddr};

use b2bua_sip_core::SipMessage;
use b2bua_sip_core::types::{name_addr, route, uri};
use tracing::{debug, trace};

use crate::dialog::DialogLeg;
use crate::errors::{DialogError, DialogResult};
use crate::transport::{
    DnsResolver, TARGET_ADDRESS, TARGET_PORT, TARGET_TRANSPORT, TRANSPORT_ID, is_private,
};

pub const DEFAULT_SIP_PORT: u16 = 5060;

/// Where and how a rewritten request leaves the B2BUA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// Local interface to send from (internal address, external mapping undone)
    pub local_address: Option<SocketAddr>,
    /// Next hop; `None` only for WebSocket legs, which reuse `transport_id`
    pub target: Option<SocketAddr>,
    /// Uppercase transport (`UDP`, `TCP`, `TLS`, `WS`, ...)
    pub transport: String,
    pub transport_id: String,
}

impl RouteTarget {
    /// Record the decision on the message for the transport layer
    pub fn apply_to(&self, msg: &SipMessage) {
        msg.set_property(TARGET_TRANSPORT, &self.transport);
        msg.set_property(TRANSPORT_ID, &self.transport_id);
        if let Some(target) = self.target {
            msg.set_property(TARGET_ADDRESS, &target.ip().to_string());
            msg.set_property(TARGET_PORT, &target.port().to_string());
        }
    }
}

/// Uppercase transport of a leg, UDP when unknown
pub fn leg_transport(leg: &DialogLeg) -> String {
    if leg.target_transport.is_empty() {
        "UDP".to_string()
    } else {
        leg.target_transport.to_ascii_uppercase()
    }
}

/// Write the leg's route set onto `msg` as Route headers.
///
/// When the next hop is a strict router (no `;lr`) its URI becomes the
/// Request-URI, and the remote target is added as the last Route instead.
/// Returns the next-hop element, if any.
pub fn encode_route_set(msg: &SipMessage, leg: &DialogLeg, method: &str) -> DialogResult<Option<String>> {
    let mut routes = leg.route_set.clone();
    let Some(top) = routes.last().cloned() else {
        return Ok(None);
    };

    if !route::is_loose(&top) {
        let top_uri = name_addr::get_uri(&top)
            .ok_or_else(|| DialogError::corrupted(format!("unparsable route '{}'", top)))?;
        let remote_uri = name_addr::get_uri(&leg.remote_contact)
            .ok_or_else(|| DialogError::corrupted("leg has no remote contact"))?;
        msg.set_start_line(&format!("{} {} SIP/2.0", method, top_uri))?;
        routes.pop();
        routes.insert(0, format!("<{}>", remote_uri));
        debug!("{} Strict route {}, remote target moved to Route", msg.context_id(), top_uri);
    }

    for element in &routes {
        route::msg_add_route(msg, element)?;
    }
    Ok(Some(top))
}

/// First address for the host of `target_uri`, port defaulting to 5060,
/// plus the URI's `transport` parameter uppercased
pub fn resolve_uri(resolver: &dyn DnsResolver, target_uri: &str) -> Option<(SocketAddr, Option<String>)> {
    let host = uri::host(target_uri).filter(|h| !h.is_empty())?;
    let ip: IpAddr = resolver.resolve_host(host).into_iter().next()?;
    let port = uri::port(target_uri).filter(|p| *p != 0).unwrap_or(DEFAULT_SIP_PORT);
    let transport = uri::param(target_uri, "transport")
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_uppercase());
    trace!("Resolved {} to {}:{}", host, ip, port);
    Some((SocketAddr::new(ip, port), transport))
}

/// `ip[:port]` as stored in `remote_ip`
fn parse_remote_ip(value: &str) -> Option<SocketAddr> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(addr);
    }
    crate::transport::resolver::ip_literal(value).map(|ip| SocketAddr::new(ip, DEFAULT_SIP_PORT))
}

/// Pick the next hop for a request to `leg`.
///
/// Order: the next-hop route, then the remote contact (not for WS), then
/// the address the leg last sent from when nothing resolved or the result
/// is private while the transport is UDP. `transport` may be overridden by
/// a `transport` URI parameter.
pub fn resolve_next_hop(
    resolver: &dyn DnsResolver,
    leg: &DialogLeg,
    top_route: Option<&str>,
    transport: &mut String,
) -> DialogResult<Option<SocketAddr>> {
    let mut target = None;

    if let Some(top_uri) = top_route.and_then(name_addr::get_uri) {
        if let Some((addr, scheme)) = resolve_uri(resolver, top_uri) {
            target = Some(addr);
            if let Some(scheme) = scheme {
                *transport = scheme;
            }
        }
    }

    if target.is_none() && transport.as_str() != "WS" {
        if let Some(contact_uri) = name_addr::get_uri(&leg.remote_contact) {
            if let Some((addr, scheme)) = resolve_uri(resolver, contact_uri) {
                target = Some(addr);
                if let Some(scheme) = scheme {
                    *transport = scheme;
                }
            }
        }
    }

    let unusable = match target {
        None => true,
        Some(addr) => is_private(&addr.ip()) && transport.as_str() == "UDP",
    };
    if unusable {
        if let Some(remote) = parse_remote_ip(&leg.remote_ip) {
            debug!("Using last known source address {} of the leg", remote);
            target = Some(remote);
        }
    }

    if target.is_none() && transport.as_str() != "WS" {
        return Err(DialogError::unresolved("no route, contact or source address resolved"));
    }
    Ok(target)
}
