//! ACK routing for 2xx responses
//!
//! An ACK to a 2xx has no transaction of its own at the B2BUA. The target
//! leg comes from the dialog store like any in-dialog request, and the Via
//! branch comes from the 2xx retransmission cache so the downstream UAS can
//! match the ACK to its INVITE.

use std::net::SocketAddr;

use b2bua_sip_core::SipMessage;
use b2bua_sip_core::types::{cseq, name_addr};
use tracing::{debug, error};

use super::mid_dialog::{XOR_PROPERTY, remote_contact_uri, rewrite_dialog_headers};
use super::route_set::{RouteTarget, encode_route_set, leg_transport, resolve_next_hop};
use crate::codec::{construct_via, decode_session_info};
use crate::errors::{DialogError, DialogResult};
use crate::manager::DialogStateManager;
use crate::manager::state_updates::sdp_body;
use crate::store::DialogMatch;
use crate::store::retransmit::cache_key;

pub const PEER_XOR_PROPERTY: &str = "peer-xor";

const DEFAULT_MAX_FORWARDS: u32 = 70;

/// A routed ACK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckRoute {
    pub session_id: String,
    /// The ACK arrived XOR-scrambled
    pub peer_xor: bool,
    pub route: RouteTarget,
}

impl AckRoute {
    pub fn local_interface(&self) -> Option<SocketAddr> {
        self.route.local_address
    }

    pub fn target(&self) -> Option<SocketAddr> {
        self.route.target
    }
}

impl DialogStateManager {
    /// Rewrite an ACK for the other leg.
    ///
    /// Unlike [`route_mid_dialog`](Self::route_mid_dialog) nothing is
    /// answered: every failure is returned and the ACK is dropped by the
    /// caller.
    pub fn route_ack(&self, msg: &SipMessage) -> DialogResult<AckRoute> {
        let log_id = msg.context_id();
        if !msg.is_request_of("ACK") {
            error!("{} Non-ACK request fed to the ACK router: {:?}", log_id, msg.start_line());
            return Err(DialogError::bad_request("Not an ACK request"));
        }

        let max_forwards = msg.max_forwards().unwrap_or(DEFAULT_MAX_FORWARDS);
        if max_forwards <= 1 {
            return Err(DialogError::MaxForwardsExceeded);
        }
        msg.hdr_set("Max-Forwards", &(max_forwards - 1).to_string())?;

        let peer_xor = msg.property(XOR_PROPERTY).is_some_and(|v| v == "1");
        msg.clear_properties();
        if peer_xor {
            msg.set_property(PEER_XOR_PROPERTY, "1");
        }

        let session = decode_session_info(msg, None)?;
        let DialogMatch {
            mut record,
            sender,
            target,
        } = self
            .store
            .find_with_legs(msg, session.as_ref())
            .ok_or_else(|| DialogError::not_found(msg.call_id()))?;
        let leg = record.leg(target).clone();
        let remote_uri = remote_contact_uri(&leg)?;
        debug!(
            "{} Found dialog for ACK: session {} target {} contact {}",
            log_id, record.session_id, target, leg.remote_contact
        );

        if leg.is_xor() {
            msg.set_property(XOR_PROPERTY, "1");
        }

        rewrite_dialog_headers(msg, &leg, "ACK", &remote_uri)?;
        let mut transport = leg_transport(&leg);
        let top_route = encode_route_set(msg, &leg, "ACK")?;
        let next_hop = resolve_next_hop(self.resolver.as_ref(), &leg, top_route.as_deref(), &mut transport)?;

        let cseq_number = cseq::number(&msg.hdr_get("CSeq")?)
            .ok_or_else(|| DialogError::bad_request("Bad CSeq"))?;
        let dialog_id = msg
            .dialog_id(true)
            .ok_or_else(|| DialogError::corrupted(format!("leg {} is missing a tag", leg.call_id)))?;
        let key = cache_key(&dialog_id, cseq_number, "INVITE");
        let Some(cached) = self.retransmit.get(&key) else {
            error!("{} Unable to find 2xx {} in retransmission cache", log_id, key);
            return Err(DialogError::cache_miss(key));
        };
        let branch = cached
            .top_via_branch()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| DialogError::internal("cached 2xx has no Via branch"))?;

        let local = name_addr::host_port(&leg.local_contact).unwrap_or_default();
        msg.hdr_list_prepend("Via", &construct_via(local, &transport, &branch))?;
        if let Some(user_agent) = self.config.user_agent.as_deref().filter(|ua| !ua.is_empty()) {
            msg.hdr_set("User-Agent", user_agent)?;
        }

        if let Some(sdp) = sdp_body(msg)? {
            record.leg_mut(sender).remote_sdp = sdp.clone();
            record.leg_mut(target).local_sdp = sdp;
            msg.update_length()?;
            self.store.update(&record)?;
            self.store.persist(&record)?;
            debug!("{} ACK SDP stored for session {}", log_id, record.session_id);
        }

        let route = RouteTarget {
            local_address: self.config.internal_address(local),
            target: next_hop,
            transport,
            transport_id: leg.transport_id.clone(),
        };
        route.apply_to(msg);

        Ok(AckRoute {
            session_id: record.session_id,
            peer_xor,
            route,
        })
    }
}
