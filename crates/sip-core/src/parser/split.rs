//! Batch splitting of a complete message buffer.
//!
//! The boundary between head and body is the earliest blank line, written
//! as `\r\n\r\n`, `\r\r` or `\n\n` (peers that terminate lines with a
//! bare `\r` or `\n`).

use std::borrow::Cow;

use tracing::trace;

use crate::error::{Error, Result};
use crate::headers::expand_compact;

const BOUNDARIES: [&[u8]; 3] = [b"\r\n\r\n", b"\r\r", b"\n\n"];

/// Head and body of a message after boundary detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHead {
    pub start_line: String,
    /// Header lines that split cleanly, compact names expanded
    pub headers: Vec<(String, String)>,
    /// Header lines without a `:` separator
    pub bad_headers: Vec<String>,
}

/// A byte that may start a message. Anything else in front of the start
/// line (keep-alive CRLFs, stray NULs) is discarded.
pub fn is_message_start_byte(b: u8) -> bool {
    b.is_ascii_graphic()
}

pub fn strip_leading_junk(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|&b| is_message_start_byte(b))
        .unwrap_or(data.len());
    &data[start..]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Split at the first blank line; returns `(head, body)`
pub fn message_split(data: &[u8]) -> (&[u8], &[u8]) {
    let earliest = BOUNDARIES
        .iter()
        .filter_map(|boundary| find(data, boundary).map(|at| (at, boundary.len())))
        .min_by_key(|&(at, _)| at);
    match earliest {
        Some((at, len)) => (&data[..at], &data[at + len..]),
        None => (data, &[]),
    }
}

/// Break the head into logical lines, joining folded continuations.
///
/// A line that begins with SP or HTAB continues the previous line; the two
/// are joined with a single space.
pub fn header_tokenize(head: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in head.split(['\r', '\n']) {
        if raw.is_empty() {
            continue;
        }
        if raw.starts_with([' ', '\t']) {
            if let Some(previous) = lines.last_mut() {
                let continuation = raw.trim();
                let joined_len = previous.trim_end().len();
                previous.truncate(joined_len);
                if !continuation.is_empty() {
                    previous.push(' ');
                    previous.push_str(continuation);
                }
                continue;
            }
        }
        lines.push(raw.to_string());
    }
    lines
}

/// Split `Name: value` on the first colon
pub fn header_split(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, value.trim()))
}

/// Parse the head of a message: start line plus header lines
pub fn parse_head(head: &[u8]) -> Result<ParsedHead> {
    let text = String::from_utf8_lossy(head);
    if let Cow::Owned(_) = text {
        trace!("Replaced invalid UTF-8 in message head ({} bytes)", head.len());
    }
    let mut lines = header_tokenize(&text).into_iter();
    let start_line = lines
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| Error::Malformed("missing start line".to_string()))?;

    let mut headers = Vec::new();
    let mut bad_headers = Vec::new();
    for line in lines {
        match header_split(&line) {
            Some((name, value)) => headers.push((expand_compact(name).to_string(), value.to_string())),
            None => bad_headers.push(line),
        }
    }
    Ok(ParsedHead {
        start_line,
        headers,
        bad_headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_junk() {
        assert_eq!(strip_leading_junk(b"\r\n\r\n\0 INVITE"), b"INVITE");
        assert_eq!(strip_leading_junk(b"\r\n"), b"");
    }

    #[test]
    fn test_message_split_boundaries() {
        assert_eq!(message_split(b"A\r\nB: 1\r\n\r\nbody"), (&b"A\r\nB: 1"[..], &b"body"[..]));
        assert_eq!(message_split(b"A\nB: 1\n\nbody"), (&b"A\nB: 1"[..], &b"body"[..]));
        assert_eq!(message_split(b"A\rB: 1\r\rbody"), (&b"A\rB: 1"[..], &b"body"[..]));
        assert_eq!(message_split(b"A\r\nB: 1"), (&b"A\r\nB: 1"[..], &b""[..]));
    }

    #[test]
    fn test_message_split_takes_earliest_boundary() {
        let data = b"MESSAGE sip:a@h SIP/2.0\nContent-Length: 8\n\nab\r\n\r\ncd";
        let (head, body) = message_split(data);
        assert_eq!(head, b"MESSAGE sip:a@h SIP/2.0\nContent-Length: 8");
        assert_eq!(body, b"ab\r\n\r\ncd");
    }

    #[test]
    fn test_header_tokenize_folds() {
        let lines = header_tokenize("INVITE x SIP/2.0\r\nSubject: I know\r\n   you're there,\r\n\tpick up!\r\nTo: b");
        assert_eq!(
            lines,
            vec!["INVITE x SIP/2.0", "Subject: I know you're there, pick up!", "To: b"]
        );
    }

    #[test]
    fn test_header_split() {
        assert_eq!(header_split("Via :  SIP/2.0/UDP h:5060 "), Some(("Via", "SIP/2.0/UDP h:5060")));
        assert_eq!(header_split("NoColonHere"), None);
        assert_eq!(header_split(": value"), None);
        assert_eq!(header_split("Bad Name: value"), None);
    }

    #[test]
    fn test_parse_head() {
        let head = parse_head(b"SIP/2.0 200 OK\r\ni: abc\r\ngarbage line\r\nl: 0").unwrap();
        assert_eq!(head.start_line, "SIP/2.0 200 OK");
        assert_eq!(
            head.headers,
            vec![
                ("Call-ID".to_string(), "abc".to_string()),
                ("Content-Length".to_string(), "0".to_string())
            ]
        );
        assert_eq!(head.bad_headers, vec!["garbage line".to_string()]);
        assert!(parse_head(b"").is_err());
    }

    #[test]
    fn test_parse_head_replaces_invalid_utf8() {
        let head = parse_head(b"OPTIONS sip:h SIP/2.0\r\nSubject: caf\xe9").unwrap();
        assert_eq!(head.headers, vec![("Subject".to_string(), "caf\u{fffd}".to_string())]);
    }
}
