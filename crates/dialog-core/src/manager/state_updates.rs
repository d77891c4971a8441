//! Leg-state update hooks
//!
//! Called by the B2BUA for every response it relays, these capture the
//! dialog-forming state of each leg into the dialog store:
//!
//! - initial UAC: response received on leg B to the B2BUA's INVITE creates
//!   the record
//! - initial UAS: the same response relayed on leg A fills in leg A
//! - mid-call UAS/UAC: 2xx to a target refresh updates contacts, sources
//!   and SDP
//!
//! The UAC hook runs before the UAS hook for a given response.

use b2bua_sip_core::SipMessage;
use b2bua_sip_core::types::{contact, cseq, route};
use tracing::{debug, trace};

use super::DialogStateManager;
use crate::codec::{SessionInfo, transform};
use crate::dialog::{DialogRecord, LegIndex};
use crate::errors::{DialogError, DialogResult};
use crate::transaction::{
    B2bTransaction, LEG_INDEX, NO_RTP_PROXY, contact_property, record_route_property,
};

/// Body of `msg` when it is a non-empty `application/sdp` payload
pub(crate) fn sdp_body(msg: &SipMessage) -> DialogResult<Option<String>> {
    let content_type = msg.content_type();
    let media = content_type.split(';').next().unwrap_or_default().trim();
    if !media.eq_ignore_ascii_case("application/sdp") {
        return Ok(None);
    }
    let body = msg.body()?;
    if body.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&body).into_owned()))
}

fn status_of(response: &SipMessage) -> DialogResult<u16> {
    response
        .status_code()
        .ok_or_else(|| DialogError::internal("leg-state hook called with a request"))
}

/// 1xx/2xx carrying both tags
fn establishes_dialog(response: &SipMessage, status: u16) -> bool {
    response.is_mid_dialog() == Some(true) && status < 300
}

fn leg_index_of(tx: &B2bTransaction) -> DialogResult<LegIndex> {
    tx.property(LEG_INDEX)
        .and_then(|index| index.trim().parse().ok())
        .and_then(LegIndex::from_index)
        .ok_or_else(|| DialogError::internal("leg-index not set on mid-dialog transaction"))
}

fn no_rtp_proxy(tx: &B2bTransaction) -> bool {
    tx.property(NO_RTP_PROXY).as_deref() == Some("1")
}

impl DialogStateManager {
    /// Look the session up through the response, falling back to a scan
    /// when the legs use different Call-IDs
    fn find_for_response(&self, response: &SipMessage, session_id: &str) -> Option<DialogRecord> {
        self.store
            .find_by_message(response, Some(session_id))
            .or_else(|| self.store.find_by_session(session_id))
    }

    /// A response to the initial INVITE is about to be relayed on leg A
    pub fn on_update_initial_uas_state(
        &self,
        response: &SipMessage,
        tx: &B2bTransaction,
        session_id: &str,
    ) -> DialogResult<()> {
        let status = status_of(response)?;
        let redirect = response.is_response_family(300);
        if !redirect {
            response.hdr_list_remove(contact::CONTACT)?;
        }
        if status == 100 {
            return Ok(());
        }

        // Captured before our own Record-Route is added
        let record_routes = route::msg_get_record_routes(response)?;
        if !redirect {
            let info = SessionInfo::new(session_id, LegIndex::A);
            transform(response, tx, tx.server_transport().local_address, &info, &self.config)?;
        }

        if establishes_dialog(response, status) {
            let Some(record) = self.find_for_response(response, session_id) else {
                debug!("{} No leg B state for session {}, leg A not saved", tx.log_id(), session_id);
                return Ok(());
            };

            let request = tx.server_request();
            let transport = tx.server_transport();
            let mut leg = record.leg_a.clone();
            leg.call_id = response.call_id();
            leg.from = response.hdr_get("To")?;
            leg.to = response.hdr_get("From")?;
            leg.remote_contact = request.hdr_get(contact::CONTACT)?;
            leg.local_contact = response.hdr_get(contact::CONTACT)?;
            leg.local_record_route = tx.property(&record_route_property(1)).unwrap_or_default();
            leg.remote_ip = transport.remote_address.to_string();
            leg.transport_id = transport.identifier.to_string();
            leg.target_transport = transport.transport_scheme.clone();
            if let Some(sdp) = sdp_body(response)? {
                leg.local_sdp = sdp;
            }
            if let Some(sdp) = sdp_body(request)? {
                leg.remote_sdp = sdp;
            }
            leg.set_route_set(record_routes, true);
            if tx.is_server_xor() {
                leg.encryption = "xor".to_string();
            }
            leg.no_rtp_proxy = no_rtp_proxy(tx);

            let updated = self.store.update_leg(&record.session_id, leg, LegIndex::A)?;
            self.store.persist(&updated)?;
            trace!("{} Saved leg A of session {} ({})", tx.log_id(), session_id, status);
        } else if response.is_error_response() {
            self.store.remove(&response.call_id(), session_id)?;
            debug!("{} Session {} ended by {} response", tx.log_id(), session_id, status);
        }
        Ok(())
    }

    /// A response to the initial INVITE arrived on leg B
    pub fn on_update_initial_uac_state(
        &self,
        response: &SipMessage,
        tx: &B2bTransaction,
        session_id: &str,
    ) -> DialogResult<()> {
        let status = status_of(response)?;
        if status == 100 || !establishes_dialog(response, status) {
            return Ok(());
        }

        let local_contact = tx
            .property(&contact_property(2))
            .ok_or_else(|| DialogError::internal("leg2-contact not set on transaction"))?;
        let transport = tx
            .client_transport()
            .ok_or_else(|| DialogError::internal("transaction has no client transport"))?;

        let mut record = self
            .store
            .find_by_session(session_id)
            .unwrap_or_else(|| DialogRecord::new(session_id));
        let leg = &mut record.leg_b;
        leg.call_id = response.call_id();
        leg.from = response.hdr_get("From")?;
        leg.to = response.hdr_get("To")?;
        leg.remote_contact = response.hdr_get(contact::CONTACT)?;
        leg.local_cseq = cseq::number(&response.hdr_get("CSeq")?).unwrap_or_default();
        leg.local_contact = local_contact;
        leg.local_record_route = tx.property(&record_route_property(2)).unwrap_or_default();
        leg.remote_ip = transport.remote_address.to_string();
        leg.transport_id = transport.identifier.to_string();
        leg.target_transport = transport.transport_scheme.clone();
        if let Some(sdp) = sdp_body(response)? {
            leg.remote_sdp = sdp;
        }
        if let Some(request) = tx.client_request() {
            if let Some(sdp) = sdp_body(request)? {
                leg.local_sdp = sdp;
            }
        }
        leg.no_rtp_proxy = no_rtp_proxy(tx);
        leg.set_route_set(route::msg_get_record_routes(response)?, false);
        if tx.is_client_xor() {
            leg.encryption = "xor".to_string();
        }

        let call_id = leg.call_id.clone();
        self.store.add(&call_id, record.clone());
        self.store.persist(&record)?;
        trace!("{} Saved leg B of session {} ({})", tx.log_id(), session_id, status);
        Ok(())
    }

    /// A response to an in-dialog request is about to be relayed back to
    /// the leg that sent the request
    pub fn on_update_mid_call_uas_state(
        &self,
        response: &SipMessage,
        tx: &B2bTransaction,
        session_id: &str,
    ) -> DialogResult<()> {
        response.hdr_list_remove(contact::CONTACT)?;
        let status = status_of(response)?;
        if status == 100 {
            return Ok(());
        }

        let index = leg_index_of(tx)?;
        let info = SessionInfo::new(session_id, index);
        transform(response, tx, tx.server_transport().local_address, &info, &self.config)?;

        if !response.is_response_family(200) {
            return Ok(());
        }
        let Some(mut record) = self.find_for_response(response, session_id) else {
            return Ok(());
        };

        let request = tx.server_request();
        let transport = tx.server_transport();
        let leg = record.leg_mut(index);
        let refreshed_contact = request.hdr_get(contact::CONTACT)?;
        if !refreshed_contact.is_empty() {
            leg.remote_contact = refreshed_contact;
        }
        leg.remote_ip = transport.remote_address.to_string();
        leg.transport_id = transport.identifier.to_string();
        if let Some(sdp) = sdp_body(response)? {
            leg.local_sdp = sdp;
        }
        if let Some(sdp) = sdp_body(request)? {
            leg.remote_sdp = sdp;
        }
        let leg = leg.clone();

        let updated = self.store.update_leg(&record.session_id, leg, index)?;
        self.store.persist(&updated)?;
        trace!("{} Refreshed {} of session {}", tx.log_id(), index, session_id);
        Ok(())
    }

    /// A response to an in-dialog request arrived from the target leg
    pub fn on_update_mid_call_uac_state(
        &self,
        response: &SipMessage,
        tx: &B2bTransaction,
        session_id: &str,
    ) -> DialogResult<()> {
        let index = leg_index_of(tx)?;
        if !response.is_response_family(200) {
            return Ok(());
        }
        let Some(mut record) = self.find_for_response(response, session_id) else {
            return Ok(());
        };

        let target_cseq = cseq::number(&response.hdr_get("CSeq")?).unwrap_or_default();
        record.leg_mut(index.other()).local_cseq = target_cseq;

        let request = tx.server_request();
        let transport = tx.server_transport();
        let leg = record.leg_mut(index);
        let refreshed_contact = request.hdr_get(contact::CONTACT)?;
        if !refreshed_contact.is_empty() {
            leg.remote_contact = refreshed_contact;
        }
        leg.remote_ip = transport.remote_address.to_string();
        leg.transport_id = transport.identifier.to_string();
        if let Some(sdp) = sdp_body(response)? {
            leg.remote_sdp = sdp;
        }
        if let Some(request) = tx.client_request() {
            if let Some(sdp) = sdp_body(request)? {
                leg.local_sdp = sdp;
            }
        }

        self.store.update(&record)?;
        self.store.persist(&record)?;
        trace!("{} Target refresh stored for session {}", tx.log_id(), session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::B2buaConfig;
    use crate::transport::TransportInfo;

    const SDP: &str = "v=0\r\no=- 1 1 IN IP4 203.0.113.5\r\ns=-\r\nc=IN IP4 203.0.113.5\r\nt=0 0\r\nm=audio 4000 RTP/AVP 0\r\n";

    fn caller_invite() -> SipMessage {
        SipMessage::parse(
            "INVITE sip:bob@10.0.0.1 SIP/2.0\r\n\
             Via: SIP/2.0/UDP 198.51.100.1:5060;branch=z9hG4bK-a1\r\n\
             From: <sip:alice@a.example>;tag=caller\r\n\
             To: <sip:bob@10.0.0.1>\r\n\
             Call-ID: cid-a\r\n\
             CSeq: 1 INVITE\r\n\
             Contact: <sip:alice@198.51.100.1:5060>\r\n\
             Record-Route: <sip:proxy-a.example;lr>\r\n\
             Content-Length: 0\r\n\r\n",
        )
        .unwrap()
    }

    fn b2b_invite() -> SipMessage {
        SipMessage::parse(
            "INVITE sip:bob@203.0.113.5 SIP/2.0\r\n\
             Via: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK-b1\r\n\
             From: <sip:alice@10.0.0.1>;tag=b2b-b\r\n\
             To: <sip:bob@203.0.113.5>\r\n\
             Call-ID: cid-b\r\n\
             CSeq: 1 INVITE\r\n\
             Content-Length: 0\r\n\r\n",
        )
        .unwrap()
    }

    fn invite_tx() -> B2bTransaction {
        let tx = B2bTransaction::new(
            Arc::new(caller_invite()),
            TransportInfo::new(
                "10.0.0.1:5060".parse().unwrap(),
                "198.51.100.1:5060".parse().unwrap(),
                "udp",
                7,
            ),
        )
        .with_client(
            Arc::new(b2b_invite()),
            TransportInfo::new(
                "10.0.0.1:5060".parse().unwrap(),
                "203.0.113.5:5060".parse().unwrap(),
                "udp",
                9,
            ),
        );
        tx.set_property(&contact_property(2), "<sip:abc123-2@10.0.0.1:5060;transport=udp>");
        tx
    }

    fn callee_response(status: &str) -> SipMessage {
        let msg = SipMessage::parse(format!(
            "SIP/2.0 {}\r\n\
             Via: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK-b1\r\n\
             From: <sip:alice@10.0.0.1>;tag=b2b-b\r\n\
             To: <sip:bob@203.0.113.5>;tag=callee\r\n\
             Call-ID: cid-b\r\n\
             CSeq: 1 INVITE\r\n\
             Contact: <sip:bob@203.0.113.5:5070>\r\n\
             Record-Route: <sip:proxy-b.example;lr>\r\n\
             Content-Length: 0\r\n\r\n",
            status
        ))
        .unwrap();
        msg.hdr_set("Content-Type", "application/sdp").unwrap();
        msg.set_body(SDP).unwrap();
        msg
    }

    fn relayed_response(status: &str) -> SipMessage {
        SipMessage::parse(format!(
            "SIP/2.0 {}\r\n\
             Via: SIP/2.0/UDP 198.51.100.1:5060;branch=z9hG4bK-a1\r\n\
             From: <sip:alice@a.example>;tag=caller\r\n\
             To: <sip:bob@10.0.0.1>;tag=b2b-a\r\n\
             Call-ID: cid-a\r\n\
             CSeq: 1 INVITE\r\n\
             Contact: <sip:bob@203.0.113.5:5070>\r\n\
             Record-Route: <sip:proxy-a.example;lr>\r\n\
             Content-Length: 0\r\n\r\n",
            status
        ))
        .unwrap()
    }

    #[test]
    fn test_initial_hooks_capture_both_legs() {
        let manager = DialogStateManager::with_defaults(B2buaConfig::default()).unwrap();
        let tx = invite_tx();

        manager
            .on_update_initial_uac_state(&callee_response("200 OK"), &tx, "abc123")
            .unwrap();
        manager
            .on_update_initial_uas_state(&relayed_response("200 OK"), &tx, "abc123")
            .unwrap();

        let record = manager.store().find_by_session("abc123").unwrap();
        assert_eq!(record.leg_b.call_id, "cid-b");
        assert_eq!(record.leg_b.to_tag(), Some("callee"));
        assert_eq!(record.leg_b.remote_contact, "<sip:bob@203.0.113.5:5070>");
        assert_eq!(record.leg_b.local_cseq, 1);
        assert_eq!(record.leg_b.remote_ip, "203.0.113.5:5060");
        assert_eq!(record.leg_b.transport_id, "9");
        assert_eq!(record.leg_b.route_set, vec!["<sip:proxy-b.example;lr>"]);
        assert_eq!(record.leg_b.remote_sdp, SDP);

        assert_eq!(record.leg_a.call_id, "cid-a");
        assert_eq!(record.leg_a.from_tag(), Some("b2b-a"));
        assert_eq!(record.leg_a.to_tag(), Some("caller"));
        assert_eq!(record.leg_a.remote_contact, "<sip:alice@198.51.100.1:5060>");
        assert!(record.leg_a.local_contact.contains("abc123-1@"));
        assert_eq!(record.leg_a.route_set, vec!["<sip:proxy-a.example;lr>"]);
        assert_eq!(record.leg_a.transport_id, "7");

        assert!(manager.store().has("cid-a"));
        assert!(manager.store().has("cid-b"));
    }

    #[test]
    fn test_trying_and_untagged_responses_are_ignored() {
        let manager = DialogStateManager::with_defaults(B2buaConfig::default()).unwrap();
        let tx = invite_tx();
        let trying = callee_response("100 Trying");
        trying.hdr_set("To", "<sip:bob@203.0.113.5>").unwrap();
        manager.on_update_initial_uac_state(&trying, &tx, "abc123").unwrap();
        assert!(manager.store().is_empty());
    }

    #[test]
    fn test_error_response_removes_session() {
        let manager = DialogStateManager::with_defaults(B2buaConfig::default()).unwrap();
        let tx = invite_tx();
        manager
            .on_update_initial_uac_state(&callee_response("183 Session Progress"), &tx, "abc123")
            .unwrap();
        assert!(manager.store().find_by_session("abc123").is_some());

        let busy = relayed_response("486 Busy Here");
        manager.on_update_initial_uas_state(&busy, &tx, "abc123").unwrap();
        assert!(manager.store().find_by_session("abc123").is_none());
    }

    #[test]
    fn test_missing_leg_contact_is_an_error() {
        let manager = DialogStateManager::with_defaults(B2buaConfig::default()).unwrap();
        let tx = B2bTransaction::new(
            Arc::new(caller_invite()),
            TransportInfo::new(
                "10.0.0.1:5060".parse().unwrap(),
                "198.51.100.1:5060".parse().unwrap(),
                "udp",
                7,
            ),
        );
        let result = manager.on_update_initial_uac_state(&callee_response("200 OK"), &tx, "abc123");
        assert!(matches!(result, Err(DialogError::Internal { .. })));
    }

    #[test]
    fn test_sdp_body_requires_content_type() {
        let msg = callee_response("200 OK");
        assert_eq!(sdp_body(&msg).unwrap().as_deref(), Some(SDP));
        msg.hdr_set("Content-Type", "application/json").unwrap();
        assert_eq!(sdp_body(&msg).unwrap(), None);
    }
}
