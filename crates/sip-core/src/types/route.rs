//! Route and Record-Route values plus message-level route-set helpers.

use crate::error::Result;
use crate::message::SipMessage;
use crate::types::{addr_list, name_addr};

pub use addr_list::{get_at, get_size, pop_top, pop_top_uri, set_at, uri_at};

pub const ROUTE: &str = "Route";
pub const RECORD_ROUTE: &str = "Record-Route";

/// True if the route element's URI carries `;lr`
pub fn is_loose(element: &str) -> bool {
    name_addr::uri_param(element, "lr").is_some()
}

/// Every element across every line of `header`, in wire order
fn collect(msg: &SipMessage, header: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for line in msg.hdr_values(header)? {
        out.extend(addr_list::elements(&line).into_iter().map(str::to_string));
    }
    Ok(out)
}

pub fn msg_get_routes(msg: &SipMessage) -> Result<Vec<String>> {
    collect(msg, ROUTE)
}

pub fn msg_get_record_routes(msg: &SipMessage) -> Result<Vec<String>> {
    collect(msg, RECORD_ROUTE)
}

/// First Route element, if any
pub fn msg_get_top_route(msg: &SipMessage) -> Result<Option<String>> {
    let line = msg.hdr_get(ROUTE)?;
    Ok(addr_list::get_at(&line, 0).map(str::to_string))
}

/// Remove and return the first Route element.
///
/// Only that element is removed; the rest of its line stays in place.
pub fn msg_pop_top_route(msg: &SipMessage) -> Result<Option<String>> {
    let Some(line) = msg.hdr_list_pop_front(ROUTE)? else {
        return Ok(None);
    };
    let Some((top, rest)) = addr_list::pop_top(&line) else {
        return Ok(None);
    };
    if !rest.is_empty() {
        msg.hdr_list_prepend(ROUTE, &rest)?;
    }
    Ok(Some(top))
}

/// Prepend a Route line
pub fn msg_add_route(msg: &SipMessage, value: &str) -> Result<()> {
    msg.hdr_list_prepend(ROUTE, value)
}

/// Prepend a Record-Route line
pub fn msg_add_record_route(msg: &SipMessage, value: &str) -> Result<()> {
    msg.hdr_list_prepend(RECORD_ROUTE, value)
}

pub fn msg_clear_routes(msg: &SipMessage) -> Result<bool> {
    msg.hdr_list_remove(ROUTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SipMessage {
        SipMessage::parse(
            b"BYE sip:bob@10.0.0.2 SIP/2.0\r\n\
              Route: <sip:p1;lr>, <sip:p2;lr>\r\n\
              Route: <sip:p3>\r\n\
              Record-Route: <sip:rr1;lr>\r\n\
              Call-ID: x\r\n\r\n",
        )
        .unwrap()
    }

    #[test]
    fn test_collect_routes_across_lines() {
        let msg = request();
        assert_eq!(msg.hdr_present(ROUTE).unwrap(), 2);
        assert_eq!(
            msg_get_routes(&msg).unwrap(),
            vec!["<sip:p1;lr>", "<sip:p2;lr>", "<sip:p3>"]
        );
        assert_eq!(msg_get_record_routes(&msg).unwrap(), vec!["<sip:rr1;lr>"]);
    }

    #[test]
    fn test_pop_top_route_keeps_rest_of_line() {
        let msg = request();
        assert_eq!(msg_pop_top_route(&msg).unwrap().as_deref(), Some("<sip:p1;lr>"));
        assert_eq!(msg.hdr_present(ROUTE).unwrap(), 2);
        assert_eq!(msg_get_top_route(&msg).unwrap().as_deref(), Some("<sip:p2;lr>"));
        assert_eq!(msg_pop_top_route(&msg).unwrap().as_deref(), Some("<sip:p2;lr>"));
        assert_eq!(msg.hdr_present(ROUTE).unwrap(), 1);
        assert!(!is_loose(&msg_get_top_route(&msg).unwrap().unwrap()));
    }

    #[test]
    fn test_add_and_clear() {
        let msg = request();
        msg_add_route(&msg, "<sip:p0;lr>").unwrap();
        assert_eq!(msg_get_top_route(&msg).unwrap().as_deref(), Some("<sip:p0;lr>"));
        assert!(msg_clear_routes(&msg).unwrap());
        assert_eq!(msg_get_top_route(&msg).unwrap(), None);
        msg_add_record_route(&msg, "<sip:rr0;lr>").unwrap();
        assert_eq!(msg_get_record_routes(&msg).unwrap()[0], "<sip:rr0;lr>");
    }
}
