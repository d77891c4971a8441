//! Header name normalization.
//!
//! Lookup keys are lowercase canonical names; compact forms (RFC 3261
//! section 7.3.3 plus the common extensions) are expanded before any key is
//! computed so `m` and `Contact` address the same entry.

/// Compact form to canonical display name
const COMPACT_FORMS: &[(char, &str)] = &[
    ('a', "Accept-Contact"),
    ('b', "Referred-By"),
    ('c', "Content-Type"),
    ('e', "Content-Encoding"),
    ('f', "From"),
    ('i', "Call-ID"),
    ('k', "Supported"),
    ('l', "Content-Length"),
    ('m', "Contact"),
    ('o', "Event"),
    ('r', "Refer-To"),
    ('s', "Subject"),
    ('t', "To"),
    ('u', "Allow-Events"),
    ('v', "Via"),
];

/// Expand a compact header name to its canonical display form.
///
/// Names that are not compact forms are returned unchanged (trimmed).
pub fn expand_compact(name: &str) -> &str {
    let name = name.trim();
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let c = c.to_ascii_lowercase();
        if let Some((_, full)) = COMPACT_FORMS.iter().find(|(short, _)| *short == c) {
            return full;
        }
    }
    name
}

/// Lookup key for a header name: compact forms expanded, lowercased
pub fn canonical_key(name: &str) -> String {
    expand_compact(name).to_ascii_lowercase()
}

/// True if `name` is a single-letter compact form
pub fn is_compact(name: &str) -> bool {
    let mut chars = name.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => COMPACT_FORMS
            .iter()
            .any(|(short, _)| *short == c.to_ascii_lowercase()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_compact() {
        assert_eq!(expand_compact("m"), "Contact");
        assert_eq!(expand_compact("V"), "Via");
        assert_eq!(expand_compact("t"), "To");
        assert_eq!(expand_compact("Contact"), "Contact");
        assert_eq!(expand_compact("x"), "x");
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("i"), "call-id");
        assert_eq!(canonical_key("Call-ID"), "call-id");
        assert_eq!(canonical_key(" l "), "content-length");
    }

    #[test]
    fn test_is_compact() {
        assert!(is_compact("m"));
        assert!(is_compact("L"));
        assert!(!is_compact("Max-Forwards"));
        assert!(!is_compact("x"));
    }
}
