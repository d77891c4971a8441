use b2bua_sip_core::prelude::*;
use proptest::prelude::*;

const CONCRETE: &str = "INVITE sip:9001@192.168.0.152 SIP/2.0\r\n\
    Via: SIP/2.0/UDP h;branch=b1\r\n\
    Call-ID: cid1\r\n\
    CSeq: 1 INVITE\r\n\
    Content-Length: 0\r\n\r\n";

#[test]
fn test_concrete_invite() {
    let msg = SipMessage::parse(CONCRETE).unwrap();
    assert_eq!(msg.start_line().unwrap(), "INVITE sip:9001@192.168.0.152 SIP/2.0");
    assert_eq!(msg.hdr_get("call-id").unwrap(), "cid1");
    assert!(msg.is_request_of("INVITE"));
    assert_eq!(msg.transaction_id().unwrap(), "invite1b1");
}

#[test]
fn test_serialize_preserves_order() {
    let msg = SipMessage::parse(
        "SIP/2.0 180 Ringing\r\n\
         Via: SIP/2.0/UDP a;branch=1\r\n\
         To: <sip:b@h>;tag=2\r\n\
         Via: SIP/2.0/UDP b;branch=3\r\n\
         From: <sip:a@h>;tag=1\r\n\
         Call-ID: x\r\n\
         CSeq: 1 INVITE\r\n\r\n",
    )
    .unwrap();
    msg.hdr_list_prepend("Via", "SIP/2.0/UDP top;branch=0").unwrap();
    msg.hdr_list_append("Via", "SIP/2.0/UDP bottom;branch=4").unwrap();
    assert_eq!(
        msg.data().unwrap(),
        "SIP/2.0 180 Ringing\r\n\
         Via: SIP/2.0/UDP top;branch=0\r\n\
         Via: SIP/2.0/UDP a;branch=1\r\n\
         Via: SIP/2.0/UDP b;branch=3\r\n\
         Via: SIP/2.0/UDP bottom;branch=4\r\n\
         To: <sip:b@h>;tag=2\r\n\
         From: <sip:a@h>;tag=1\r\n\
         Call-ID: x\r\n\
         CSeq: 1 INVITE\r\n\r\n"
    );
    assert_eq!(msg.hdr_list_pop_front("via").unwrap().as_deref(), Some("SIP/2.0/UDP top;branch=0"));
    assert_eq!(msg.top_via_branch().as_deref(), Some("1"));
}

#[test]
fn test_compact_forms_match_long_forms() {
    let long = SipMessage::parse(
        "REGISTER sip:h SIP/2.0\r\nVia: SIP/2.0/UDP a;branch=1\r\nFrom: <sip:a@h>;tag=1\r\n\
         To: <sip:a@h>\r\nCall-ID: x\r\nContact: <sip:a@10.0.0.1>\r\nContent-Length: 0\r\n\r\n",
    )
    .unwrap();
    let compact = SipMessage::parse(
        "REGISTER sip:h SIP/2.0\r\nv: SIP/2.0/UDP a;branch=1\r\nf: <sip:a@h>;tag=1\r\n\
         t: <sip:a@h>\r\ni: x\r\nm: <sip:a@10.0.0.1>\r\nl: 0\r\n\r\n",
    )
    .unwrap();
    assert_eq!(long.headers().unwrap(), compact.headers().unwrap());
    assert_eq!(long.data().unwrap(), compact.data().unwrap());
}

#[test]
fn test_folded_and_bad_headers() {
    let msg = SipMessage::parse(
        "OPTIONS sip:h SIP/2.0\r\n\
         Subject: first\r\n second\r\n\
         this line has no separator\r\n\
         Call-ID: x\r\n\r\n",
    )
    .unwrap();
    assert_eq!(msg.hdr_get("subject").unwrap(), "first second");
    assert_eq!(msg.bad_headers().unwrap(), vec!["this line has no separator".to_string()]);
    assert_eq!(msg.hdr_get("call-id").unwrap(), "x");
}

#[test]
fn test_lenient_boundaries_and_leading_junk() {
    let msg = SipMessage::parse("\r\n\r\nOPTIONS sip:h SIP/2.0\nCall-ID: x\n\nhello").unwrap();
    assert_eq!(msg.start_line().unwrap(), "OPTIONS sip:h SIP/2.0");
    assert_eq!(msg.hdr_get("call-id").unwrap(), "x");
    assert_eq!(&msg.body().unwrap()[..], b"hello");
    assert!(matches!(SipMessage::parse("\r\n\r\n"), Err(Error::Malformed(_))));
}

#[test]
fn test_empty_values_skipped_on_output() {
    let msg = SipMessage::parse("OPTIONS sip:h SIP/2.0\r\nSubject:\r\nCall-ID: x\r\n\r\n").unwrap();
    assert_eq!(msg.hdr_present("subject").unwrap(), 1);
    assert_eq!(msg.data().unwrap(), "OPTIONS sip:h SIP/2.0\r\nCall-ID: x\r\n\r\n");
}

#[test]
fn test_binary_body_survives() {
    let mut raw = b"MESSAGE sip:h SIP/2.0\r\nContent-Length: 4\r\n\r\n".to_vec();
    raw.extend_from_slice(&[0x00, 0xff, 0x10, 0x80]);
    let msg = SipMessage::parse(&raw).unwrap();
    assert_eq!(&msg.to_bytes().unwrap()[..], &raw[..]);
}

fn header_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9;=<>:@. /-]{1,24}".prop_map(|s| s.trim().to_string()).prop_filter("non-empty", |s| !s.is_empty())
}

proptest! {
    /// Serializing a parsed message and parsing it again reaches a fixed point
    #[test]
    fn parse_serialize_idempotent(
        method in prop::sample::select(vec!["INVITE", "BYE", "OPTIONS", "ACK"]),
        headers in prop::collection::vec(
            (prop::sample::select(vec!["Via", "v", "From", "f", "To", "Call-ID", "i", "X-Custom", "Route"]), header_value()),
            0..8,
        ),
        body in "[a-z0-9 ]{0,16}",
    ) {
        let mut raw = format!("{} sip:user@host SIP/2.0\r\n", method);
        for (name, value) in &headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
        raw.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));

        let first = SipMessage::parse(&raw).unwrap().data().unwrap();
        let second = SipMessage::parse(&first).unwrap().data().unwrap();
        prop_assert_eq!(first, second);
    }

    /// `list_prepend` and `list_append` keep the other values in place
    #[test]
    fn list_edits_preserve_relative_order(values in prop::collection::vec("[a-z]{1,6}", 1..6)) {
        let msg = SipMessage::with_start_line("OPTIONS sip:h SIP/2.0");
        for value in &values {
            msg.hdr_list_append("X-List", value).unwrap();
        }
        msg.hdr_list_prepend("X-List", "first").unwrap();
        msg.hdr_list_append("X-List", "last").unwrap();
        let stored = msg.hdr_values("x-list").unwrap();
        prop_assert_eq!(stored.first().map(String::as_str), Some("first"));
        prop_assert_eq!(stored.last().map(String::as_str), Some("last"));
        prop_assert_eq!(&stored[1..stored.len() - 1], &values[..]);
    }
}
