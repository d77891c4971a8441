//! REGISTER contact rewriting
//!
//! A relayed REGISTER advertises a binding on this B2BUA instead of the
//! client's own contact. The binding carries the `sbc-reg` marker plus a
//! hash of the client's contact host/port, so requests routed to the
//! binding can be told apart ([`is_register_route`]) and matched back to
//! the registration.

use std::net::SocketAddr;

use b2bua_sip_core::SipMessage;
use b2bua_sip_core::parser::utils::string_hash;
use b2bua_sip_core::types::{addr_list, contact, name_addr};
use tracing::debug;

use super::contact::advertised_host_port;
use crate::config::B2buaConfig;
use crate::errors::{DialogError, DialogResult};

pub const REG_PREFIX: &str = "sbc-reg";

const DEFAULT_EXPIRES: &str = "3600";

/// Key under which the binding for `to_user` at `contact_host_port` is kept
pub fn registration_key(to_user: &str, contact_host_port: &str) -> String {
    format!("{}-{}-{}", REG_PREFIX, to_user, string_hash(contact_host_port))
}

/// True if the request targets a binding created by [`transform_register`]
pub fn is_register_route(msg: &SipMessage) -> bool {
    msg.start_line()
        .map(|line| line.contains(REG_PREFIX))
        .unwrap_or(false)
}

/// Rewrite the Contact of an outbound REGISTER.
///
/// A wildcard Contact is kept as-is (and requires an Expires header); a
/// REGISTER without Contact is a binding query and is left alone.
pub fn transform_register(msg: &SipMessage, local: SocketAddr, config: &B2buaConfig) -> DialogResult<()> {
    let contact_line = msg.hdr_get(contact::CONTACT)?;
    let mut expires = msg.hdr_get("Expires")?.trim().to_string();

    if contact_line.trim().is_empty() {
        return Ok(());
    }

    if contact::is_wildcard(&contact_line) {
        if expires.is_empty() {
            return Err(DialogError::bad_request("Wildcard Contact without Expires"));
        }
        msg.hdr_list_remove(contact::CONTACT)?;
        msg.hdr_list_prepend(contact::CONTACT, "*")?;
        return Ok(());
    }

    let element = addr_list::get_at(&contact_line, 0)
        .ok_or_else(|| DialogError::bad_request("Unable to parse Contact"))?
        .to_string();
    if expires.is_empty() {
        expires = contact::expires(&element)
            .map(|e| e.to_string())
            .unwrap_or_else(|| DEFAULT_EXPIRES.to_string());
    }

    let to = msg.hdr_get("To")?;
    if name_addr::get_uri(&to).is_none() {
        return Err(DialogError::bad_request("Unable to parse To"));
    }
    let to_user = name_addr::user(&to).unwrap_or_default();
    let client_host_port = name_addr::host_port(&element).unwrap_or_default();
    let transport = msg
        .top_via_transport()
        .unwrap_or_else(|| "udp".to_string());
    let host_port = advertised_host_port(config, &transport, local, true);

    let binding = if config.register_state_in_params {
        format!(
            "<sip:{}@{};{}={}>",
            to_user,
            host_port,
            REG_PREFIX,
            string_hash(client_host_port)
        )
    } else {
        format!(
            "<sip:{}@{}>",
            registration_key(to_user, client_host_port),
            host_port
        )
    };
    let binding = format!("{};expires={}", binding, expires);

    msg.hdr_list_remove(contact::CONTACT)?;
    msg.hdr_list_prepend(contact::CONTACT, &binding)?;
    debug!("{} REGISTER binding {} -> {}", msg.context_id(), element, binding);
    Ok(())
}

trait TopViaTransport {
    fn top_via_transport(&self) -> Option<String>;
}

impl TopViaTransport for SipMessage {
    fn top_via_transport(&self) -> Option<String> {
        let line = self.hdr_get("Via").ok()?;
        b2bua_sip_core::types::via::top(&line)
            .and_then(b2bua_sip_core::types::via::transport)
            .map(|t| t.to_ascii_lowercase())
    }
}
