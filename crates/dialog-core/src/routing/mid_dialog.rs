//! Mid-dialog request routing
//!
//! An in-dialog request arriving on one leg is rewritten into the matching
//! request on the other leg: dialog-forming headers come from the stored
//! target leg, the Request-URI is the target's remote contact, and the
//! stored route set decides the next hop.

use b2bua_sip_core::SipMessage;
use b2bua_sip_core::types::{contact, cseq, name_addr, route, uri};
use tracing::{debug, warn};

use super::route_set::{RouteTarget, encode_route_set, leg_transport, resolve_next_hop};
use crate::codec::{construct_via, decode_session_info};
use crate::dialog::DialogLeg;
use crate::errors::{DialogError, DialogResult};
use crate::manager::DialogStateManager;
use crate::store::DialogMatch;
use crate::transaction::{B2bTransaction, LEG_IDENTIFIER, LEG_INDEX, NO_RTP_PROXY, SESSION_ID};

/// Message-local flag asking the transport to XOR-scramble the payload
pub const XOR_PROPERTY: &str = "xor";

/// What the caller should do with a routed request
#[derive(Debug)]
pub enum RouteOutcome {
    /// Send the rewritten request to the given target
    Forward(RouteTarget),
    /// Answer the original request with this response instead
    Respond(SipMessage),
}

impl RouteOutcome {
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::Forward(_))
    }

    pub fn response(&self) -> Option<&SipMessage> {
        match self {
            Self::Respond(response) => Some(response),
            Self::Forward(_) => None,
        }
    }
}

/// Error response for `request` carrying the error's status and reason
pub(crate) fn error_response(request: &SipMessage, err: &DialogError) -> DialogResult<SipMessage> {
    let reason = err.reason();
    Ok(request.create_response(err.status_code(), reason.as_deref(), None, None)?)
}

/// Replace the dialog-forming headers of `msg` with those of `leg`.
///
/// CSeq is left to the caller.
pub(crate) fn rewrite_dialog_headers(
    msg: &SipMessage,
    leg: &DialogLeg,
    method: &str,
    remote_contact_uri: &str,
) -> DialogResult<()> {
    msg.hdr_remove("Call-ID")?;
    msg.hdr_remove("From")?;
    msg.hdr_remove("To")?;
    msg.hdr_list_remove(contact::CONTACT)?;
    msg.hdr_list_remove("Via")?;
    msg.hdr_list_remove(route::ROUTE)?;
    msg.hdr_list_remove(route::RECORD_ROUTE)?;

    msg.set_start_line(&format!("{} {} SIP/2.0", method, remote_contact_uri))?;
    msg.hdr_set("From", &leg.from)?;
    msg.hdr_set("To", &leg.to)?;
    if !leg.local_contact.is_empty() {
        msg.hdr_set(contact::CONTACT, &leg.local_contact)?;
    }
    msg.hdr_set("Call-ID", &leg.call_id)?;
    if !leg.local_record_route.is_empty() {
        msg.hdr_set(route::RECORD_ROUTE, &leg.local_record_route)?;
    }
    Ok(())
}

/// Remote contact URI of a stored leg
pub(crate) fn remote_contact_uri(leg: &DialogLeg) -> DialogResult<String> {
    name_addr::get_uri(&leg.remote_contact)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DialogError::corrupted(format!("leg {} has no remote contact", leg.call_id)))
}

impl DialogStateManager {
    /// Route an in-dialog request received on one leg to the other leg.
    ///
    /// On success `msg` has been rewritten in place and carries the
    /// `target-*` / `transport-id` properties. Failures become a
    /// [`RouteOutcome::Respond`] built from the request as received; `Err`
    /// is only returned when even that response cannot be built.
    pub fn route_mid_dialog(&self, msg: &SipMessage, tx: &B2bTransaction) -> DialogResult<RouteOutcome> {
        let received = msg.clone();
        match self.rewrite_mid_dialog(msg, tx) {
            Ok(target) => Ok(RouteOutcome::Forward(target)),
            Err(err) => {
                warn!("{} Unable to route mid-dialog request: {}", tx.log_id(), err);
                Ok(RouteOutcome::Respond(error_response(&received, &err)?))
            }
        }
    }

    fn rewrite_mid_dialog(&self, msg: &SipMessage, tx: &B2bTransaction) -> DialogResult<RouteTarget> {
        let branch = msg
            .top_via_branch()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| DialogError::bad_request("Missing Via Branch Parameter"))?;
        let request_uri = msg
            .request_uri()
            .filter(|u| uri::verify(u))
            .ok_or_else(|| DialogError::bad_request("Bad Request URI"))?;
        let method = msg
            .request_method()
            .ok_or_else(|| DialogError::bad_request("Bad Request URI"))?;

        let session = decode_session_info(msg, Some(tx))?;
        let DialogMatch {
            mut record,
            sender,
            target,
        } = self
            .store
            .find_with_legs(msg, session.as_ref())
            .ok_or_else(|| DialogError::not_found(msg.call_id()))?;

        tx.set_property(LEG_IDENTIFIER, uri::user(&request_uri).unwrap_or_default());
        tx.set_property(LEG_INDEX, &sender.as_index().to_string());
        tx.set_property(SESSION_ID, &record.session_id);

        let inbound_cseq = cseq::number(&msg.hdr_get("CSeq")?)
            .ok_or_else(|| DialogError::bad_request("Bad CSeq"))?;
        let remote_uri = remote_contact_uri(record.leg(target))?;

        let leg = record.leg_mut(target);
        leg.local_cseq = inbound_cseq.max(leg.local_cseq);
        let leg = leg.clone();
        self.store.update(&record)?;
        self.store.persist(&record)?;

        if leg.no_rtp_proxy {
            tx.set_property(NO_RTP_PROXY, "1");
        }
        if leg.is_xor() {
            msg.set_property(XOR_PROPERTY, "1");
        }

        msg.hdr_remove("CSeq")?;
        rewrite_dialog_headers(msg, &leg, &method, &remote_uri)?;
        msg.hdr_set("CSeq", &format!("{} {}", leg.local_cseq, method))?;

        let local = name_addr::host_port(&leg.local_contact).unwrap_or_default();
        let local_address = self.config.internal_address(local);
        let mut transport = leg_transport(&leg);
        msg.hdr_set("Via", &construct_via(local, &transport, &branch))?;

        let top_route = encode_route_set(msg, &leg, &method)?;
        let next_hop = resolve_next_hop(self.resolver.as_ref(), &leg, top_route.as_deref(), &mut transport)?;

        let route_target = RouteTarget {
            local_address,
            target: next_hop,
            transport,
            transport_id: leg.transport_id.clone(),
        };
        route_target.apply_to(msg);
        debug!(
            "{} {} routed from {} to {} via {:?} ({})",
            tx.log_id(),
            method,
            sender,
            target,
            route_target.target,
            route_target.transport
        );
        Ok(route_target)
    }
}
