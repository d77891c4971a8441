use b2bua_sip_core::prelude::*;
use proptest::prelude::*;

const WITH_BODY: &[u8] = b"INVITE sip:9001@192.168.0.152 SIP/2.0\r\n\
Via: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK77\r\n\
From: <sip:9011@192.168.0.152>;tag=a\r\n\
To: <sip:9001@192.168.0.152>\r\n\
Call-ID: stream-1\r\n\
CSeq: 1 INVITE\r\n\
Content-Type: application/sdp\r\n\
Content-Length: 14\r\n\r\n\
v=0\r\no=- 1 1\r\n";

fn consume_split(data: &[u8], split: usize) -> (SipMessage, Vec<usize>) {
    let msg = SipMessage::new();
    let mut completions = Vec::new();
    let mut consumed = 0usize;
    for chunk in [&data[..split], &data[split..]] {
        match msg.consume(chunk) {
            ConsumeResult::Complete(rest) if !msg_was_complete(&completions) => {
                consumed += chunk.len() - rest.len();
                completions.push(consumed);
            }
            ConsumeResult::Complete(_) => {}
            ConsumeResult::Incomplete => consumed += chunk.len(),
            ConsumeResult::Malformed => panic!("malformed at split {}", split),
        }
    }
    (msg, completions)
}

fn msg_was_complete(completions: &[usize]) -> bool {
    !completions.is_empty()
}

#[test]
fn test_every_split_point_completes_once() {
    for split in 0..=WITH_BODY.len() {
        let (msg, completions) = consume_split(WITH_BODY, split);
        assert_eq!(completions, vec![WITH_BODY.len()], "split at {}", split);
        assert_eq!(msg.hdr_get("call-id").unwrap(), "stream-1");
        assert_eq!(&msg.body().unwrap()[..], b"v=0\r\no=- 1 1\r\n");
    }
}

#[test]
fn test_trailing_bytes_returned() {
    let mut data = WITH_BODY.to_vec();
    data.extend_from_slice(b"OPTIONS sip:next SIP/2.0\r\n");
    let msg = SipMessage::new();
    match msg.consume(&data) {
        ConsumeResult::Complete(rest) => assert_eq!(rest, b"OPTIONS sip:next SIP/2.0\r\n"),
        other => panic!("unexpected {:?}", other),
    }
    // a finalized message consumes nothing more
    assert_eq!(msg.consume(b"abc"), ConsumeResult::Complete(b"abc"));
}

#[test]
fn test_keep_alive_prefix_ignored() {
    let msg = SipMessage::new();
    assert_eq!(msg.consume(b"\r\n\r\n"), ConsumeResult::Incomplete);
    assert!(!msg.is_finalized());
    assert!(matches!(
        msg.consume(b"OPTIONS sip:h SIP/2.0\r\nCall-ID: k\r\n\r\n"),
        ConsumeResult::Complete(rest) if rest.is_empty()
    ));
    assert_eq!(msg.start_line().unwrap(), "OPTIONS sip:h SIP/2.0");
}

#[test]
fn test_malformed_inputs() {
    let cases: [&[u8]; 5] = [
        b"OPTIONS sip:h SIP/2.0\nCall-ID: x\r\n\r\n",
        b"OPTIONS sip:h SIP/2.0\r\nCall\x00ID: x\r\n\r\n",
        b"OPTIONS sip:h SIP/2.0\r\nCall-ID: x\rX\r\n\r\n",
        b"OPTIONS sip:h SIP/2.0\r\nContent-Length: -1\r\n\r\n",
        b"OPTIONS sip:h SIP/2.0\r\nContent-Length: 99999999999\r\n\r\n",
    ];
    for case in cases {
        let msg = SipMessage::new();
        assert_eq!(msg.consume(case), ConsumeResult::Malformed, "{:?}", String::from_utf8_lossy(case));
        // stays failed
        assert_eq!(msg.consume(b"\r\n"), ConsumeResult::Malformed);
        assert!(msg.hdr_get("call-id").is_err());
    }
}

#[test]
fn test_streamed_equals_batch() {
    let streamed = SipMessage::new();
    assert!(matches!(streamed.consume(WITH_BODY), ConsumeResult::Complete(_)));
    let batch = SipMessage::parse(WITH_BODY).unwrap();
    assert_eq!(streamed.data().unwrap(), batch.data().unwrap());
}

proptest! {
    /// Arbitrary bytes never panic the consumer
    #[test]
    fn consume_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let msg = SipMessage::new();
        let _ = msg.consume(&data);
    }

    /// Three-way splits behave like a single feed
    #[test]
    fn three_way_split(a in 0usize..=WITH_BODY.len(), b in 0usize..=WITH_BODY.len()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let msg = SipMessage::new();
        let mut complete_at = None;
        let mut offset = 0usize;
        for chunk in [&WITH_BODY[..lo], &WITH_BODY[lo..hi], &WITH_BODY[hi..]] {
            if complete_at.is_some() {
                break;
            }
            match msg.consume(chunk) {
                ConsumeResult::Complete(rest) => complete_at = Some(offset + chunk.len() - rest.len()),
                ConsumeResult::Incomplete => offset += chunk.len(),
                ConsumeResult::Malformed => prop_assert!(false, "malformed"),
            }
        }
        prop_assert_eq!(complete_at, Some(WITH_BODY.len()));
    }
}
