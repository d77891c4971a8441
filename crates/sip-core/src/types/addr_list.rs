//! Comma-separated name-addr lists (Contact, Route, Record-Route).
//!
//! One header line may carry several elements, and the same header may also
//! appear on several lines. The functions here only deal with the elements of
//! a single line; element count and line count are unrelated.

use crate::error::{Error, Result};
use crate::parser::utils::split_list;
use crate::types::name_addr;

/// Number of elements on the line
pub fn get_size(line: &str) -> usize {
    split_list(line).len()
}

pub fn get_at(line: &str, index: usize) -> Option<&str> {
    split_list(line).into_iter().nth(index)
}

/// URI of the element at `index`
pub fn uri_at(line: &str, index: usize) -> Option<&str> {
    get_at(line, index).and_then(name_addr::get_uri)
}

/// Replace the element at `index`
pub fn set_at(line: &str, index: usize, value: &str) -> Result<String> {
    let mut elements = split_list(line);
    let count = elements.len();
    let slot = elements.get_mut(index).ok_or_else(|| Error::InvalidIndex {
        name: line.to_string(),
        index,
        count,
    })?;
    *slot = value;
    Ok(elements.join(", "))
}

/// Insert `value` as the new first element
pub fn push_front(line: &str, value: &str) -> String {
    let mut elements = split_list(line);
    elements.insert(0, value);
    elements.join(", ")
}

/// Detach the first element.
///
/// Returns the popped element and what is left of the line; the remainder is
/// empty when the line held a single element.
pub fn pop_top(line: &str) -> Option<(String, String)> {
    let mut elements = split_list(line);
    if elements.is_empty() {
        return None;
    }
    let top = elements.remove(0).to_string();
    Some((top, elements.join(", ")))
}

/// Like [`pop_top`], returning only the URI of the popped element
pub fn pop_top_uri(line: &str) -> Option<(String, String)> {
    let (top, rest) = pop_top(line)?;
    let uri = name_addr::get_uri(&top)?.to_string();
    Some((uri, rest))
}

pub fn elements(line: &str) -> Vec<&str> {
    split_list(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "<sip:p1.example.com;lr>, \"Proxy 2\" <sip:p2.example.com;lr>,sip:p3.example.com";

    #[test]
    fn test_size_and_get() {
        assert_eq!(get_size(LINE), 3);
        assert_eq!(get_at(LINE, 1), Some("\"Proxy 2\" <sip:p2.example.com;lr>"));
        assert_eq!(uri_at(LINE, 2), Some("sip:p3.example.com"));
        assert_eq!(get_at(LINE, 3), None);
        assert_eq!(get_size(""), 0);
    }

    #[test]
    fn test_set_at() {
        let updated = set_at(LINE, 2, "<sip:p4.example.com;lr>").unwrap();
        assert_eq!(uri_at(&updated, 2), Some("sip:p4.example.com;lr"));
        assert!(matches!(set_at(LINE, 3, "x"), Err(Error::InvalidIndex { count: 3, .. })));
    }

    #[test]
    fn test_pop_top_uri() {
        let (uri, rest) = pop_top_uri(LINE).unwrap();
        assert_eq!(uri, "sip:p1.example.com;lr");
        assert_eq!(get_size(&rest), 2);
        let (uri, rest) = pop_top_uri("<sip:only;lr>").unwrap();
        assert_eq!(uri, "sip:only;lr");
        assert!(rest.is_empty());
        assert!(pop_top_uri("").is_none());
    }

    #[test]
    fn test_push_front() {
        assert_eq!(push_front("<sip:b>", "<sip:a>"), "<sip:a>, <sip:b>");
    }
}
