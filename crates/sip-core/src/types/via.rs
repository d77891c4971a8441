//! Via header values.
//!
//! `SIP/2.0/UDP sent-by *( ";" via-param )`, several per line separated by commas.

use nom::{
    IResult,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{space0, space1},
    sequence::tuple,
};

use crate::error::{Error, Result};
use crate::message::SipMessage;
use crate::parser::utils::split_list;
use crate::types::params;

pub const VIA: &str = "Via";

struct ViaLayout<'a> {
    version: &'a str,
    transport: &'a str,
    sent_by: &'a str,
    params: &'a str,
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c))(input)
}

fn sent_protocol(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, (_, _, _, version, _, _, _, transport)) = tuple((
        tag_no_case("SIP"),
        space0,
        tag("/"),
        token,
        space0,
        tag("/"),
        space0,
        token,
    ))(input)?;
    Ok((rest, (version, transport)))
}

fn layout(element: &str) -> Option<ViaLayout<'_>> {
    let trimmed = element.trim();
    let (rest, (version, transport)) = sent_protocol(trimmed).ok()?;
    let (rest, _) = space1::<&str, nom::error::Error<&str>>(rest).ok()?;
    let sent_by_end = rest.find(';').unwrap_or(rest.len());
    let sent_by = rest[..sent_by_end].trim();
    if sent_by.is_empty() {
        return None;
    }
    Some(ViaLayout {
        version,
        transport,
        sent_by,
        params: &rest[sent_by_end..],
    })
}

fn rebuild(l: &ViaLayout<'_>, transport: &str, sent_by: &str, params: &str) -> String {
    format!("SIP/{}/{} {}{}", l.version, transport, sent_by, params)
}

fn require(element: &str) -> Result<ViaLayout<'_>> {
    layout(element).ok_or_else(|| Error::InvalidHeader(format!("bad Via '{}'", element)))
}

/// `SIP/2.0/UDP`
pub fn sent_protocol_of(element: &str) -> Option<String> {
    layout(element).map(|l| format!("SIP/{}/{}", l.version, l.transport))
}

/// Transport token, uppercased
pub fn transport(element: &str) -> Option<String> {
    layout(element).map(|l| l.transport.to_ascii_uppercase())
}

pub fn set_transport(element: &str, transport: &str) -> Result<String> {
    let l = require(element)?;
    Ok(rebuild(&l, &transport.to_ascii_uppercase(), l.sent_by, l.params))
}

/// `host[:port]` of the sender
pub fn sent_by(element: &str) -> Option<&str> {
    layout(element).map(|l| l.sent_by)
}

pub fn set_sent_by(element: &str, sent_by: &str) -> Result<String> {
    let l = require(element)?;
    Ok(rebuild(&l, l.transport, sent_by, l.params))
}

pub fn params_of(element: &str) -> &str {
    layout(element).map(|l| l.params).unwrap_or("")
}

pub fn param<'a>(element: &'a str, name: &str) -> Option<&'a str> {
    params::get_param(params_of(element), name)
}

pub fn set_param(element: &str, name: &str, value: &str) -> Result<String> {
    let l = require(element)?;
    let updated = params::set_param(l.params, name, value);
    Ok(rebuild(&l, l.transport, l.sent_by, &updated))
}

pub fn remove_param(element: &str, name: &str) -> Result<String> {
    let l = require(element)?;
    let updated = params::remove_param(l.params, name);
    Ok(rebuild(&l, l.transport, l.sent_by, &updated))
}

pub fn branch(element: &str) -> Option<&str> {
    param(element, "branch").filter(|b| !b.is_empty())
}

/// `Some("")` when `rport` is present without a value
pub fn rport(element: &str) -> Option<&str> {
    param(element, "rport")
}

pub fn received(element: &str) -> Option<&str> {
    param(element, "received")
}

pub fn count_elements(line: &str) -> usize {
    split_list(line).len()
}

pub fn split_elements(line: &str) -> Vec<&str> {
    split_list(line)
}

pub fn top(line: &str) -> Option<&str> {
    split_list(line).into_iter().next()
}

pub fn bottom(line: &str) -> Option<&str> {
    split_list(line).into_iter().last()
}

/// Detach the first element, returning it and the rest of the line
pub fn pop_top(line: &str) -> Option<(String, String)> {
    let mut elements = split_list(line);
    if elements.is_empty() {
        return None;
    }
    let top = elements.remove(0).to_string();
    Some((top, elements.join(", ")))
}

/// Topmost Via element of the message
pub fn msg_get_top_via(msg: &SipMessage) -> Result<Option<String>> {
    let line = msg.hdr_get(VIA)?;
    Ok(top(&line).map(str::to_string))
}

/// Remove the topmost Via element, leaving any siblings on its line
pub fn msg_pop_top_via(msg: &SipMessage) -> Result<Option<String>> {
    let Some(line) = msg.hdr_list_pop_front(VIA)? else {
        return Ok(None);
    };
    let Some((top, rest)) = pop_top(&line) else {
        return Ok(None);
    };
    if !rest.is_empty() {
        msg.hdr_list_prepend(VIA, &rest)?;
    }
    Ok(Some(top))
}

pub fn msg_add_via(msg: &SipMessage, value: &str) -> Result<()> {
    msg.hdr_list_prepend(VIA, value)
}

pub fn msg_clear_vias(msg: &SipMessage) -> Result<bool> {
    msg.hdr_list_remove(VIA)
}

/// Every Via element across every line
pub fn msg_get_vias(msg: &SipMessage) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for line in msg.hdr_values(VIA)? {
        out.extend(split_list(&line).into_iter().map(str::to_string));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIA_VALUE: &str = "SIP/2.0/udp pc33.atlanta.com:5066;branch=z9hG4bK776asdhds;rport;received=192.0.2.1";

    #[test]
    fn test_fields() {
        assert_eq!(transport(VIA_VALUE).as_deref(), Some("UDP"));
        assert_eq!(sent_protocol_of(VIA_VALUE).as_deref(), Some("SIP/2.0/udp"));
        assert_eq!(sent_by(VIA_VALUE), Some("pc33.atlanta.com:5066"));
        assert_eq!(branch(VIA_VALUE), Some("z9hG4bK776asdhds"));
        assert_eq!(rport(VIA_VALUE), Some(""));
        assert_eq!(received(VIA_VALUE), Some("192.0.2.1"));
    }

    #[test]
    fn test_setters() {
        let updated = set_transport(VIA_VALUE, "tcp").unwrap();
        assert!(updated.starts_with("SIP/2.0/TCP pc33.atlanta.com:5066;branch="));
        let updated = set_sent_by(VIA_VALUE, "10.0.0.1").unwrap();
        assert_eq!(sent_by(&updated), Some("10.0.0.1"));
        let updated = set_param(VIA_VALUE, "rport", "5066").unwrap();
        assert_eq!(rport(&updated), Some("5066"));
        assert_eq!(branch(&remove_param(VIA_VALUE, "branch").unwrap()), None);
    }

    #[test]
    fn test_malformed() {
        assert_eq!(sent_by("garbage"), None);
        assert_eq!(sent_by("SIP/2.0/UDP"), None);
        assert!(set_transport("nope", "TCP").is_err());
    }

    #[test]
    fn test_line_elements() {
        let line = "SIP/2.0/UDP a;branch=1, SIP/2.0/TCP b;branch=2";
        assert_eq!(count_elements(line), 2);
        assert_eq!(top(line), Some("SIP/2.0/UDP a;branch=1"));
        assert_eq!(bottom(line), Some("SIP/2.0/TCP b;branch=2"));
        let (popped, rest) = pop_top(line).unwrap();
        assert_eq!(branch(&popped), Some("1"));
        assert_eq!(rest, "SIP/2.0/TCP b;branch=2");
    }

    #[test]
    fn test_message_helpers() {
        let msg = SipMessage::parse(
            b"INVITE sip:b@h SIP/2.0\r\n\
              Via: SIP/2.0/UDP a;branch=1, SIP/2.0/UDP b;branch=2\r\n\
              v: SIP/2.0/UDP c;branch=3\r\n\r\n",
        )
        .unwrap();
        assert_eq!(msg_get_vias(&msg).unwrap().len(), 3);
        assert_eq!(msg_pop_top_via(&msg).unwrap().as_deref(), Some("SIP/2.0/UDP a;branch=1"));
        assert_eq!(msg_get_top_via(&msg).unwrap().as_deref(), Some("SIP/2.0/UDP b;branch=2"));
        msg_add_via(&msg, "SIP/2.0/TCP me;branch=z9hG4bKx").unwrap();
        assert_eq!(msg_get_vias(&msg).unwrap().len(), 3);
        assert!(msg_clear_vias(&msg).unwrap());
        assert_eq!(msg_get_top_via(&msg).unwrap(), None);
    }
}
