//! Contact and Via generation for the leg a message is sent on.

use std::net::SocketAddr;

use b2bua_sip_core::SipMessage;
use b2bua_sip_core::types::{contact, name_addr, route};
use tracing::trace;

use super::session::{CALL_INDEX_PARAM, SESSION_ID_PARAM, SessionInfo, encode_user_info};
use crate::config::{B2buaConfig, SessionCodec};
use crate::errors::DialogResult;
use crate::transaction::{B2bTransaction, contact_property, record_route_property};

/// Lowercase transport scheme a message travels on.
///
/// Responses use the server transport; requests read the top Via, defaulting
/// to UDP.
pub fn transport_scheme_for(msg: &SipMessage, tx: &B2bTransaction) -> String {
    if msg.is_response() {
        return tx.server_transport().transport_scheme.to_ascii_lowercase();
    }
    let via = msg.hdr_get("Via").unwrap_or_default().to_ascii_lowercase();
    for scheme in ["udp", "tcp", "tls"] {
        if via.contains(&format!("2.0/{}", scheme)) {
            return scheme.to_string();
        }
    }
    "udp".to_string()
}

/// `host:port` to advertise for a local listener, honoring external mappings
pub fn advertised_host_port(
    config: &B2buaConfig,
    transport: &str,
    local: SocketAddr,
    use_external: bool,
) -> String {
    match config.external_address(transport, &local).filter(|_| use_external) {
        Some(external) => format!("{}:{}", external, local.port()),
        None => local.to_string(),
    }
}

/// `SIP/2.0/<TRANSPORT> <sent-by>;branch=<branch>;rport`
pub fn construct_via(sent_by: &str, transport: &str, branch: &str) -> String {
    format!(
        "SIP/2.0/{} {};branch={};rport",
        transport.to_ascii_uppercase(),
        sent_by,
        branch
    )
}

fn contact_prefix(user: Option<&str>) -> String {
    match user.filter(|u| !u.is_empty()) {
        Some(user) => format!("{} <sip:{}@", user, user),
        None => "<sip:".to_string(),
    }
}

/// Replace the message's Contact with one pointing back at this B2BUA and
/// carrying `session` with the configured codec.
///
/// The generated Contact (and Record-Route, for the Record-Route codec) is
/// also stored on the transaction as `legN-contact` / `legN-rr`. Returns the
/// new Contact value.
pub fn transform(
    msg: &SipMessage,
    tx: &B2bTransaction,
    local: SocketAddr,
    session: &SessionInfo,
    config: &B2buaConfig,
) -> DialogResult<String> {
    let transport = transport_scheme_for(msg, tx);
    let host_port = advertised_host_port(config, &transport, local, true);
    let from = msg.hdr_get("From")?;
    let from_user = name_addr::user(&from).map(str::to_string);
    let index = session.call_index();

    let new_contact = match config.session_codec {
        SessionCodec::UserInfo => {
            let mut value = match from_user.as_deref().filter(|u| !u.is_empty()) {
                Some(user) => format!("{} <sip:", user),
                None => "<sip:".to_string(),
            };
            if !session.session_id.is_empty() {
                value.push_str(&encode_user_info(session));
                value.push('@');
            } else if let Some(user) = from_user.as_deref().filter(|u| !u.is_empty()) {
                value.push_str(user);
                value.push('@');
            }
            format!("{}{};transport={}>", value, host_port, transport)
        }
        SessionCodec::UriParams => {
            let mut value = format!("{}{};transport={}", contact_prefix(from_user.as_deref()), host_port, transport);
            if !session.session_id.is_empty() {
                value.push_str(&format!(";{}={}", SESSION_ID_PARAM, session.session_id));
            }
            if index != 0 {
                value.push_str(&format!(";{}={}", CALL_INDEX_PARAM, index));
            }
            value.push('>');
            value
        }
        SessionCodec::RecordRouteParams => {
            let mut record_route = format!("<sip:{};transport={}", host_port, transport);
            if !session.session_id.is_empty() {
                record_route.push_str(&format!(";{}={}", SESSION_ID_PARAM, session.session_id));
            }
            if index != 0 {
                record_route.push_str(&format!(";{}={}", CALL_INDEX_PARAM, index));
            }
            record_route.push_str(";lr>");
            if index != 0 {
                tx.set_property(&record_route_property(index), &record_route);
            }
            route::msg_add_record_route(msg, &record_route)?;
            format!("{}{};transport={}>", contact_prefix(from_user.as_deref()), host_port, transport)
        }
    };

    msg.hdr_list_remove(contact::CONTACT)?;
    msg.hdr_list_prepend(contact::CONTACT, &new_contact)?;
    if index != 0 {
        tx.set_property(&contact_property(index), &new_contact);
    }
    trace!("{} Contact rewritten to {}", tx.log_id(), new_contact);
    Ok(new_contact)
}
