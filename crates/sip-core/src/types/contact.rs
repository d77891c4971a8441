//! Contact header values.

use crate::error::Result;
use crate::message::SipMessage;
use crate::types::{addr_list, name_addr};

pub use addr_list::{get_at, get_size, pop_top, pop_top_uri, set_at, uri_at};

pub const CONTACT: &str = "Contact";

/// `Contact: *`, used by REGISTER to drop every binding
pub fn is_wildcard(line: &str) -> bool {
    line.trim() == "*"
}

/// `expires` header parameter of one element
pub fn expires(element: &str) -> Option<u32> {
    name_addr::header_param(element, "expires").and_then(|v| v.trim().parse().ok())
}

/// `q` header parameter of one element
pub fn q_value(element: &str) -> Option<f32> {
    name_addr::header_param(element, "q").and_then(|v| v.trim().parse().ok())
}

/// URI of the first Contact element in the message
pub fn msg_get_contact_uri(msg: &SipMessage) -> Result<Option<String>> {
    let line = msg.hdr_get(CONTACT)?;
    Ok(addr_list::uri_at(&line, 0).map(str::to_string))
}
