//! Session correlation through each codec
//!
//! The Contact (or Record-Route) generated for an outbound INVITE is fed
//! back as the peer's next in-dialog request, which must decode to the same
//! session and leg.

use std::net::SocketAddr;
use std::sync::Arc;

use b2bua_dialog_core::codec::{
    decode_session_info, decode_user_info, encode_user_info, is_register_route, transform,
    transform_register, SessionInfo,
};
use b2bua_dialog_core::transaction::{B2bTransaction, SESSION_ID};
use b2bua_dialog_core::{B2buaConfig, LegIndex, SessionCodec, TransportInfo};
use b2bua_sip_core::SipMessage;
use b2bua_sip_core::types::name_addr;
use proptest::prelude::*;

fn local() -> SocketAddr {
    "10.0.0.1:5060".parse().unwrap()
}

fn outbound_invite() -> (SipMessage, B2bTransaction) {
    let msg = SipMessage::parse(
        "INVITE sip:bob@203.0.113.5 SIP/2.0\r\n\
         Via: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK-out\r\n\
         From: <sip:alice@a.example>;tag=b2b-b\r\n\
         To: <sip:bob@b.example>\r\n\
         Contact: <sip:alice@198.51.100.1>\r\n\
         Call-ID: cid-b\r\n\
         CSeq: 1 INVITE\r\n\r\n",
    )
    .unwrap();
    let transport = TransportInfo::new(local(), "198.51.100.1:5060".parse().unwrap(), "udp", 1);
    let tx = B2bTransaction::new(Arc::new(msg.clone()), transport);
    (msg, tx)
}

/// The callee's BYE, addressed the way RFC 3261 tells it to address it
fn peer_bye(invite: &SipMessage) -> SipMessage {
    let contact = invite.hdr_get("Contact").unwrap();
    let target = name_addr::get_uri(&contact).unwrap().to_string();
    let bye = SipMessage::parse(format!(
        "BYE {} SIP/2.0\r\n\
         Via: SIP/2.0/UDP 203.0.113.5;branch=z9hG4bK-bye\r\n\
         From: <sip:bob@b.example>;tag=callee\r\n\
         To: <sip:alice@a.example>;tag=b2b-b\r\n\
         Call-ID: cid-b\r\n\
         CSeq: 1 BYE\r\n\r\n",
        target
    ))
    .unwrap();
    for rr in invite.hdr_values("Record-Route").unwrap() {
        bye.hdr_list_append("Route", &rr).unwrap();
    }
    bye
}

fn round_trip(codec: SessionCodec) -> (SipMessage, Option<SessionInfo>) {
    let (invite, tx) = outbound_invite();
    let config = B2buaConfig::new().with_session_codec(codec);
    transform(&invite, &tx, local(), &SessionInfo::new("abc123", LegIndex::B), &config).unwrap();
    let bye = peer_bye(&invite);
    let decoded = decode_session_info(&bye, None).unwrap();
    (bye, decoded)
}

#[test]
fn test_user_info_codec_round_trip() {
    let (bye, decoded) = round_trip(SessionCodec::UserInfo);
    assert_eq!(bye.start_line().unwrap(), "BYE sip:abc123-2@10.0.0.1:5060;transport=udp SIP/2.0");
    assert_eq!(decoded, Some(SessionInfo::new("abc123", LegIndex::B)));
}

#[test]
fn test_uri_params_codec_round_trip() {
    let (bye, decoded) = round_trip(SessionCodec::UriParams);
    assert!(bye.start_line().unwrap().contains("sbc-session-id=abc123;sbc-call-index=2"));
    assert_eq!(decoded, Some(SessionInfo::new("abc123", LegIndex::B)));
}

#[test]
fn test_record_route_codec_round_trip_consumes_route() {
    let (bye, decoded) = round_trip(SessionCodec::RecordRouteParams);
    assert_eq!(decoded, Some(SessionInfo::new("abc123", LegIndex::B)));
    assert!(bye.hdr_values("Route").unwrap().is_empty());
}

#[test]
fn test_transaction_property_fallback() {
    let bye = SipMessage::parse(
        "BYE sip:bob@10.0.0.1 SIP/2.0\r\nCall-ID: c\r\nFrom: <sip:a@h>;tag=1\r\nTo: <sip:b@h>;tag=2\r\n\r\n",
    )
    .unwrap();
    let transport = TransportInfo::new(local(), "198.51.100.1:5060".parse().unwrap(), "udp", 1);
    let tx = B2bTransaction::new(Arc::new(bye.clone()), transport);
    assert_eq!(decode_session_info(&bye, Some(&tx)).unwrap(), None);

    tx.set_property(SESSION_ID, "abc123");
    let info = decode_session_info(&bye, Some(&tx)).unwrap().unwrap();
    assert_eq!(info.session_id, "abc123");
    assert_eq!(info.leg, None);
}

#[test]
fn test_register_binding_is_recognised() {
    let register = SipMessage::parse(
        "REGISTER sip:example.com SIP/2.0\r\n\
         Via: SIP/2.0/UDP 192.168.1.9:5062;branch=z9hG4bK-reg\r\n\
         From: <sip:1001@example.com>;tag=r\r\n\
         To: <sip:1001@example.com>\r\n\
         Call-ID: reg-1\r\n\
         CSeq: 1 REGISTER\r\n\
         Contact: <sip:1001@192.168.1.9:5062>\r\n\
         Expires: 600\r\n\r\n",
    )
    .unwrap();
    transform_register(&register, local(), &B2buaConfig::default()).unwrap();

    let binding = register.hdr_get("Contact").unwrap();
    assert!(binding.ends_with(";expires=600"));
    let target = name_addr::get_uri(&binding).unwrap().to_string();
    let invite = SipMessage::parse(format!(
        "INVITE {} SIP/2.0\r\nCall-ID: inbound\r\n\r\n",
        target
    ))
    .unwrap();
    assert!(is_register_route(&invite));

    let plain = SipMessage::parse("INVITE sip:1001@10.0.0.1 SIP/2.0\r\nCall-ID: x\r\n\r\n").unwrap();
    assert!(!is_register_route(&plain));
}

proptest! {
    #[test]
    fn prop_user_info_recovers_session(
        session_id in "[a-zA-Z0-9][a-zA-Z0-9.-]{0,23}",
        leg in prop_oneof![Just(LegIndex::A), Just(LegIndex::B)],
    ) {
        let info = SessionInfo::new(session_id, leg);
        prop_assert_eq!(decode_user_info(&encode_user_info(&info)), Some(info));
    }
}
