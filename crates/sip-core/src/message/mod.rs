//! # SIP Message Model
//!
//! [`SipMessage`] holds a start line, a [`HeaderTokenStore`] and a binary
//! body behind a reader/writer lock so one message can be shared between the
//! server and client side of a back-to-back transaction.
//!
//! A message is built either in one shot with [`SipMessage::parse`] or
//! incrementally with [`SipMessage::consume`], which accepts arbitrary
//! fragments of a stream. Until the message is *finalized* the header API
//! refuses access with [`Error::InvalidState`].
//!
//! ```rust
//! use b2bua_sip_core::message::{ConsumeResult, SipMessage};
//!
//! let msg = SipMessage::new();
//! assert_eq!(msg.consume(b"OPTIONS sip:a@b SIP/2.0\r\n"), ConsumeResult::Incomplete);
//! assert!(matches!(msg.consume(b"Call-ID: x\r\n\r\n"), ConsumeResult::Complete(rest) if rest.is_empty()));
//! assert_eq!(msg.hdr_get("call-id").unwrap(), "x");
//! ```
//!
//! Message-local properties (routing hints such as `target-address`) live
//! outside the lock and are deliberately not carried over by `clone()`.

mod response;
mod stream;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::headers::HeaderTokenStore;
use crate::parser::split::{message_split, parse_head, strip_leading_junk};
use crate::parser::start_line::parse_status_line;
use crate::parser::utils::string_hash;
use crate::types::{cseq, name_addr, via};

pub use stream::ConsumeResult;
use stream::{StreamParser, load_headers};

pub const CONTENT_LENGTH: &str = "Content-Length";

#[derive(Debug, Clone, Default)]
struct MessageInner {
    start_line: String,
    headers: HeaderTokenStore,
    body: Bytes,
    bad_headers: Vec<String>,
    finalized: bool,
    stream: StreamParser,
}

impl MessageInner {
    fn header_first(&self, name: &str) -> &str {
        self.headers.first(name)
    }
}

/// A SIP request or response
#[derive(Debug, Default)]
pub struct SipMessage {
    inner: RwLock<MessageInner>,
    properties: Mutex<HashMap<String, String>>,
}

impl SipMessage {
    /// An empty message waiting for [`consume`](Self::consume)
    pub fn new() -> Self {
        Self::default()
    }

    /// A finalized message with the given start line and no headers
    pub fn with_start_line(start_line: impl Into<String>) -> Self {
        let inner = MessageInner {
            start_line: start_line.into(),
            finalized: true,
            ..Default::default()
        };
        SipMessage {
            inner: RwLock::new(inner),
            properties: Mutex::new(HashMap::new()),
        }
    }

    /// Parse a complete message held in memory.
    ///
    /// Leading junk is stripped; everything after the first blank line is
    /// the body regardless of Content-Length.
    pub fn parse(data: impl AsRef<[u8]>) -> Result<Self> {
        let data = strip_leading_junk(data.as_ref());
        if data.is_empty() {
            return Err(Error::Malformed("empty message".to_string()));
        }
        let (head, body) = message_split(data);
        let parsed = parse_head(head)?;
        let mut inner = MessageInner {
            start_line: parsed.start_line.clone(),
            body: Bytes::copy_from_slice(body),
            finalized: true,
            ..Default::default()
        };
        load_headers(&mut inner.headers, &parsed);
        inner.bad_headers = parsed.bad_headers;
        trace!("parsed message '{}' with {} headers", inner.start_line, inner.headers.len());
        Ok(SipMessage {
            inner: RwLock::new(inner),
            properties: Mutex::new(HashMap::new()),
        })
    }

    /// Feed bytes from a stream transport.
    ///
    /// Returns `Complete` with the unread tail once the message (including
    /// its Content-Length body) is whole. A finalized message consumes
    /// nothing and returns `Complete(input)`.
    pub fn consume<'a>(&self, input: &'a [u8]) -> ConsumeResult<'a> {
        let mut inner = self.inner.write();
        if inner.finalized {
            return ConsumeResult::Complete(input);
        }
        match inner.stream.feed(input) {
            Ok(Some(used)) => match inner.stream.take() {
                Ok(streamed) => {
                    inner.start_line = streamed.head.start_line.clone();
                    load_headers(&mut inner.headers, &streamed.head);
                    inner.bad_headers = streamed.head.bad_headers;
                    inner.body = Bytes::from(streamed.body);
                    inner.finalized = true;
                    ConsumeResult::Complete(&input[used..])
                }
                Err(e) => {
                    debug!("discarding streamed message: {}", e);
                    ConsumeResult::Malformed
                }
            },
            Ok(None) => ConsumeResult::Incomplete,
            Err(e) => {
                debug!("malformed stream input: {}", e);
                ConsumeResult::Malformed
            }
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.read().finalized
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MessageInner>> {
        let guard = self.inner.read();
        if !guard.finalized {
            return Err(Error::not_finalized());
        }
        Ok(guard)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MessageInner>> {
        let guard = self.inner.write();
        if !guard.finalized {
            return Err(Error::not_finalized());
        }
        Ok(guard)
    }

    // ---- start line ----

    pub fn start_line(&self) -> Result<String> {
        Ok(self.read()?.start_line.clone())
    }

    pub fn set_start_line(&self, line: &str) -> Result<()> {
        self.write()?.start_line = line.trim().to_string();
        Ok(())
    }

    // ---- header API ----

    /// Number of values stored under `name`
    pub fn hdr_present(&self, name: &str) -> Result<usize> {
        Ok(self.read()?.headers.present(name))
    }

    /// First value of `name`, or an empty string when absent
    pub fn hdr_get(&self, name: &str) -> Result<String> {
        Ok(self.read()?.headers.first(name).to_string())
    }

    pub fn hdr_get_at(&self, name: &str, index: usize) -> Result<String> {
        Ok(self.read()?.headers.get(name, index)?.to_string())
    }

    pub fn hdr_values(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .headers
            .values(name)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn hdr_set(&self, name: &str, value: &str) -> Result<()> {
        self.write()?.headers.set(name, value)
    }

    pub fn hdr_set_at(&self, name: &str, value: &str, index: usize) -> Result<()> {
        self.write()?.headers.set_at(name, value, index)
    }

    /// Remove a single-valued header; multi-valued headers need
    /// [`hdr_list_remove`](Self::hdr_list_remove)
    pub fn hdr_remove(&self, name: &str) -> Result<bool> {
        self.write()?.headers.remove(name)
    }

    pub fn hdr_list_append(&self, name: &str, value: &str) -> Result<()> {
        self.write()?.headers.list_append(name, value)
    }

    pub fn hdr_list_prepend(&self, name: &str, value: &str) -> Result<()> {
        self.write()?.headers.list_prepend(name, value)
    }

    pub fn hdr_list_pop_front(&self, name: &str) -> Result<Option<String>> {
        Ok(self.write()?.headers.list_pop_front(name))
    }

    pub fn hdr_list_remove(&self, name: &str) -> Result<bool> {
        Ok(self.write()?.headers.list_remove(name))
    }

    /// All `(name, value)` pairs in serialization order
    pub fn headers(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .read()?
            .headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }

    /// Header lines that could not be split into name and value
    pub fn bad_headers(&self) -> Result<Vec<String>> {
        Ok(self.read()?.bad_headers.clone())
    }

    // ---- body ----

    pub fn body(&self) -> Result<Bytes> {
        Ok(self.read()?.body.clone())
    }

    /// Replace the body and refresh Content-Length
    pub fn set_body(&self, body: impl Into<Bytes>) -> Result<()> {
        let mut inner = self.write()?;
        inner.body = body.into();
        let length = inner.body.len().to_string();
        inner.headers.set(CONTENT_LENGTH, &length)
    }

    /// Set Content-Length to the current body size
    pub fn update_length(&self) -> Result<()> {
        let mut inner = self.write()?;
        let length = inner.body.len().to_string();
        inner.headers.set(CONTENT_LENGTH, &length)
    }

    // ---- serialization ----

    /// Wire form; a non-UTF-8 body is replaced lossily
    pub fn data(&self) -> Result<String> {
        let bytes = self.to_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Binary-safe wire form
    pub fn to_bytes(&self) -> Result<Bytes> {
        let inner = self.read()?;
        let mut head = String::with_capacity(inner.start_line.len() + 512);
        head.push_str(&inner.start_line);
        head.push_str("\r\n");
        inner.headers.write_to(&mut head);
        head.push_str("\r\n");
        let mut out = BytesMut::with_capacity(head.len() + inner.body.len());
        out.put_slice(head.as_bytes());
        out.put_slice(&inner.body);
        Ok(out.freeze())
    }

    // ---- properties ----

    pub fn property(&self, name: &str) -> Option<String> {
        self.properties.lock().get(name).cloned()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.lock().contains_key(name)
    }

    pub fn set_property(&self, name: &str, value: &str) {
        self.properties.lock().insert(name.to_string(), value.to_string());
    }

    pub fn remove_property(&self, name: &str) -> Option<String> {
        self.properties.lock().remove(name)
    }

    pub fn clear_properties(&self) {
        self.properties.lock().clear();
    }

    // ---- classification ----
    //
    // The accessors below read an unfinalized message as empty.

    fn peek<T>(&self, f: impl FnOnce(&MessageInner) -> T) -> T {
        f(&self.inner.read())
    }

    pub fn is_response(&self) -> bool {
        self.peek(|inner| {
            inner
                .start_line
                .get(..4)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("SIP/"))
        })
    }

    pub fn is_request(&self) -> bool {
        self.peek(|inner| !inner.start_line.is_empty()) && !self.is_response()
    }

    /// True if this is a request whose method is `method` (case-insensitive)
    pub fn is_request_of(&self, method: &str) -> bool {
        self.is_request()
            && self.peek(|inner| {
                inner
                    .start_line
                    .split_whitespace()
                    .next()
                    .is_some_and(|token| token.eq_ignore_ascii_case(method))
            })
    }

    /// Method token of the request line
    pub fn request_method(&self) -> Option<String> {
        if !self.is_request() {
            return None;
        }
        self.peek(|inner| inner.start_line.split_whitespace().next().map(str::to_string))
    }

    /// Request-URI of the request line
    pub fn request_uri(&self) -> Option<String> {
        if !self.is_request() {
            return None;
        }
        self.peek(|inner| inner.start_line.split_whitespace().nth(1).map(str::to_string))
    }

    /// Rewrite the Request-URI, keeping method and version
    pub fn set_request_uri(&self, uri: &str) -> Result<()> {
        let mut inner = self.write()?;
        let mut parts = inner.start_line.split_whitespace();
        let (Some(method), Some(_), Some(version)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::Malformed(format!("not a request line: '{}'", inner.start_line)));
        };
        inner.start_line = format!("{} {} {}", method, uri, version);
        Ok(())
    }

    /// Method from the CSeq header
    pub fn method(&self) -> Option<String> {
        self.peek(|inner| cseq::method(inner.header_first("CSeq")).map(str::to_string))
    }

    pub fn status_code(&self) -> Option<u16> {
        self.peek(|inner| parse_status_line(&inner.start_line).map(|status| status.code))
    }

    pub fn reason_phrase(&self) -> Option<String> {
        self.peek(|inner| parse_status_line(&inner.start_line).map(|status| status.reason.to_string()))
    }

    /// True if the status code is in the same hundred as `code`
    pub fn is_response_family(&self, code: u16) -> bool {
        self.status_code().is_some_and(|status| status / 100 == code / 100)
    }

    /// 3xx, 4xx, 5xx and 6xx responses
    pub fn is_error_response(&self) -> bool {
        self.status_code().is_some_and(|status| status >= 300)
    }

    /// True if this is a response to a `method` request
    pub fn is_response_to(&self, method: &str) -> bool {
        self.is_response() && self.method().is_some_and(|m| m.eq_ignore_ascii_case(method))
    }

    // ---- dialog identity ----

    pub fn call_id(&self) -> String {
        self.peek(|inner| inner.header_first("Call-ID").to_string())
    }

    pub fn from_tag(&self) -> Option<String> {
        self.peek(|inner| name_addr::tag(inner.header_first("From")).map(str::to_string))
    }

    pub fn to_tag(&self) -> Option<String> {
        self.peek(|inner| name_addr::tag(inner.header_first("To")).map(str::to_string))
    }

    pub fn top_via_branch(&self) -> Option<String> {
        self.peek(|inner| {
            via::top(inner.header_first("Via"))
                .and_then(via::branch)
                .map(str::to_string)
        })
    }

    pub fn max_forwards(&self) -> Option<u32> {
        self.peek(|inner| inner.header_first("Max-Forwards").trim().parse().ok())
    }

    pub fn content_type(&self) -> String {
        self.peek(|inner| inner.header_first("Content-Type").to_string())
    }

    /// `Some(true)` with both tags, `Some(false)` with only a From tag,
    /// `None` when it cannot be told
    pub fn is_mid_dialog(&self) -> Option<bool> {
        match (self.from_tag(), self.to_tag()) {
            (Some(_), Some(_)) => Some(true),
            (Some(_), None) => Some(false),
            _ => None,
        }
    }

    /// Tag pair identifying the dialog from one side.
    ///
    /// With `as_sender` the id is computed as the party that sent the
    /// message sees it, otherwise as the receiver sees it. Empty when either
    /// tag is missing.
    pub fn dialog_id(&self, as_sender: bool) -> Option<String> {
        let from_tag = self.from_tag()?;
        let to_tag = self.to_tag()?;
        let local_first = if as_sender {
            self.is_response()
        } else {
            self.is_request()
        };
        Some(if local_first {
            format!("{}{}", to_tag, from_tag)
        } else {
            format!("{}{}", from_tag, to_tag)
        })
    }

    /// Lowercase CSeq method (ACK folded into INVITE), CSeq number and the
    /// top Via branch, falling back to Call-ID when there is no branch
    pub fn transaction_id(&self) -> Result<String> {
        let inner = self.read()?;
        let via_line = inner.header_first("Via");
        let call_id = inner.header_first("Call-ID");
        let cseq_value = inner.header_first("CSeq");
        if via_line.is_empty() || call_id.is_empty() || cseq_value.is_empty() {
            return Err(Error::InvalidHeader(
                "transaction id needs Via, Call-ID and CSeq".to_string(),
            ));
        }
        let (number, method) = cseq::parse(cseq_value)
            .ok_or_else(|| Error::InvalidHeader(format!("bad CSeq '{}'", cseq_value)))?;
        let mut method = method.to_ascii_lowercase();
        if method == "ack" {
            method = "invite".to_string();
        }
        let id = via::top(via_line)
            .and_then(via::branch)
            .unwrap_or(call_id);
        Ok(format!("{}{}{}", method, number, id))
    }

    /// `[CID=xxxxxxxx]` log prefix derived from the Call-ID
    pub fn context_id(&self) -> String {
        format!("[CID={:08x}]", string_hash(&self.call_id()))
    }
}

impl Clone for SipMessage {
    fn clone(&self) -> Self {
        SipMessage {
            inner: RwLock::new(self.inner.read().clone()),
            properties: Mutex::new(HashMap::new()),
        }
    }
}

impl FromStr for SipMessage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SipMessage::parse(s.as_bytes())
    }
}

impl fmt::Display for SipMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Ok(data) => f.write_str(&data),
            Err(_) => f.write_str("<incomplete SIP message>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE: &str = "INVITE sip:9001@192.168.0.152 SIP/2.0\r\n\
        Via: SIP/2.0/UDP 192.168.0.103:5060;branch=z9hG4bK1b1;rport\r\n\
        From: \"9011\" <sip:9011@192.168.0.152>;tag=abc\r\n\
        To: <sip:9001@192.168.0.152>\r\n\
        Call-ID: 1c2d3e@192.168.0.103\r\n\
        CSeq: 1 INVITE\r\n\
        Max-Forwards: 70\r\n\
        Content-Length: 0\r\n\r\n";

    #[test]
    fn test_unfinalized_refuses_header_access() {
        let msg = SipMessage::new();
        assert!(matches!(msg.hdr_get("via"), Err(Error::InvalidState(_))));
        assert!(matches!(msg.hdr_set("Via", "x"), Err(Error::InvalidState(_))));
        assert!(msg.data().is_err());
        assert_eq!(msg.call_id(), "");
        assert!(!msg.is_request());
    }

    #[test]
    fn test_classification() {
        let msg = SipMessage::parse(INVITE).unwrap();
        assert!(msg.is_request());
        assert!(msg.is_request_of("invite"));
        assert!(!msg.is_request_of("INV"));
        assert_eq!(msg.request_method().as_deref(), Some("INVITE"));
        assert_eq!(msg.request_uri().as_deref(), Some("sip:9001@192.168.0.152"));
        assert_eq!(msg.method().as_deref(), Some("INVITE"));
        assert_eq!(msg.status_code(), None);
        assert_eq!(msg.is_mid_dialog(), Some(false));
        assert_eq!(msg.max_forwards(), Some(70));
    }

    #[test]
    fn test_transaction_id() {
        let msg = SipMessage::parse(INVITE).unwrap();
        assert_eq!(msg.transaction_id().unwrap(), "invite1z9hG4bK1b1");
        msg.hdr_set("CSeq", "1 ACK").unwrap();
        assert_eq!(msg.transaction_id().unwrap(), "invite1z9hG4bK1b1");
        msg.hdr_list_remove("Via").unwrap();
        msg.hdr_set("Via", "SIP/2.0/UDP h").unwrap();
        assert_eq!(msg.transaction_id().unwrap(), "invite11c2d3e@192.168.0.103");
    }

    #[test]
    fn test_dialog_id_symmetry() {
        let request = SipMessage::parse(INVITE).unwrap();
        assert_eq!(request.dialog_id(true), None);
        request.hdr_set("To", "<sip:9001@192.168.0.152>;tag=xyz").unwrap();
        assert_eq!(request.dialog_id(true).as_deref(), Some("abcxyz"));
        assert_eq!(request.dialog_id(false).as_deref(), Some("xyzabc"));

        let response = request.create_response(200, None, None, None).unwrap();
        assert_eq!(response.dialog_id(true).as_deref(), Some("xyzabc"));
        assert_eq!(response.dialog_id(false).as_deref(), Some("abcxyz"));
    }

    #[test]
    fn test_properties_not_cloned() {
        let msg = SipMessage::parse(INVITE).unwrap();
        msg.set_property("target-address", "10.0.0.1");
        let copy = msg.clone();
        assert_eq!(copy.property("target-address"), None);
        assert_eq!(msg.property("target-address").as_deref(), Some("10.0.0.1"));
        copy.hdr_set("Call-ID", "other").unwrap();
        assert_eq!(msg.call_id(), "1c2d3e@192.168.0.103");
        assert_eq!(msg.remove_property("target-address").as_deref(), Some("10.0.0.1"));
        assert!(!msg.has_property("target-address"));
    }

    #[test]
    fn test_set_body_updates_length() {
        let msg = SipMessage::parse(INVITE).unwrap();
        msg.set_body(Bytes::from_static(b"v=0\r\n")).unwrap();
        assert_eq!(msg.hdr_get("content-length").unwrap(), "5");
        assert!(msg.data().unwrap().ends_with("\r\n\r\nv=0\r\n"));
    }

    #[test]
    fn test_set_request_uri() {
        let msg = SipMessage::parse(INVITE).unwrap();
        msg.set_request_uri("sip:bob@10.0.0.9:5062").unwrap();
        assert_eq!(msg.start_line().unwrap(), "INVITE sip:bob@10.0.0.9:5062 SIP/2.0");
    }

    #[test]
    fn test_context_id() {
        let msg = SipMessage::parse(INVITE).unwrap();
        let cid = msg.context_id();
        assert!(cid.starts_with("[CID=") && cid.ends_with(']'));
        assert_eq!(cid.len(), 15);
        assert_eq!(cid, msg.clone().context_id());
    }
}
