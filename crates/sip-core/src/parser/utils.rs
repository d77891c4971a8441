//! Small lexical helpers shared by the message parser and the grammar types.

use rand::Rng;
use uuid::Uuid;

/// RFC 3261 magic cookie prefix for branch parameters
pub const BRANCH_MAGIC_COOKIE: &str = "z9hG4bK";

/// Generate a new RFC 3261 compliant branch value
pub fn create_branch() -> String {
    format!("{}{}", BRANCH_MAGIC_COOKIE, Uuid::new_v4().simple())
}

/// Generate a random tag suitable for From/To
pub fn create_tag() -> String {
    let value: u64 = rand::thread_rng().r#gen();
    format!("{:016x}", value)
}

/// Stable 32-bit bitwise string hash (Justin Sobel).
///
/// Used wherever a short, reproducible token must be derived from text,
/// such as log context ids and registration binding keys.
pub fn string_hash(value: &str) -> u32 {
    value.bytes().fold(1_315_423_911u32, |hash, b| {
        hash ^ (hash << 5).wrapping_add(b as u32).wrapping_add(hash >> 2)
    })
}

/// Strip one level of surrounding double quotes, if present
pub fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Byte offset of the first `needle` outside double quotes
pub fn find_unquoted(haystack: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in haystack.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split a header value on commas that are outside quotes and angle brackets.
///
/// Each element is trimmed; empty elements are dropped.
pub fn split_list(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => depth += 1,
            '>' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                let part = value[start..i].trim();
                if !part.is_empty() {
                    parts.push(part);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = value[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

fn escape_with(value: &str, allowed: impl Fn(u8) -> bool) -> String {
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        if is_unreserved(b) || allowed(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Percent-escape a URI user part
pub fn escape_user(user: &str) -> String {
    escape_with(user, |b| matches!(b, b'&' | b'=' | b'+' | b'$' | b',' | b';' | b'?' | b'/'))
}

/// Percent-escape a URI parameter name or value
pub fn escape_param(param: &str) -> String {
    escape_with(param, |b| matches!(b, b'[' | b']' | b'/' | b':' | b'&' | b'+' | b'$'))
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim
pub fn unescape(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
