//! # SIP Status Codes
//!
//! Three-digit response codes and their default reason phrases. Codes that
//! have no entry of their own fall back to the phrase of their class
//! (for example 499 reads "Bad Request").
//!
//! ```rust
//! use b2bua_sip_core::types::status::{reason_phrase, StatusCode};
//!
//! assert_eq!(reason_phrase(481), "Call Leg/Transaction Does Not Exist");
//! let status = StatusCode::from_u16(404).unwrap();
//! assert!(status.is_client_error());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const PHRASES: &[(u16, &str)] = &[
    (100, "Trying"),
    (180, "Ringing"),
    (181, "Call Is Being Forwarded"),
    (182, "Queued"),
    (183, "Session Progress"),
    (200, "OK"),
    (202, "Accepted"),
    (300, "Multiple Choices"),
    (301, "Moved Permanently"),
    (302, "Moved Temporarily"),
    (305, "Use Proxy"),
    (380, "Alternative Service"),
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (402, "Payment Required"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (405, "Method Not Allowed"),
    (406, "Not Acceptable"),
    (407, "Proxy Authentication Required"),
    (408, "Request Timeout"),
    (409, "Conflict"),
    (410, "Gone"),
    (411, "Length Required"),
    (412, "Conditional Request Failed"),
    (413, "Request Entity Too Large"),
    (414, "Request-URI Too Large"),
    (415, "Unsupported Media Type"),
    (416, "Unsupported Uri Scheme"),
    (420, "Bad Extension"),
    (422, "Session Interval Too Small"),
    (423, "Interval Too Short"),
    (480, "Temporarily not available"),
    (481, "Call Leg/Transaction Does Not Exist"),
    (482, "Loop Detected"),
    (483, "Too Many Hops"),
    (484, "Address Incomplete"),
    (485, "Ambiguous"),
    (486, "Busy Here"),
    (487, "Request Cancelled"),
    (488, "Not Acceptable Here"),
    (489, "Bad Event"),
    (491, "Request Pending"),
    (500, "Internal Server Error"),
    (501, "Not Implemented"),
    (502, "Bad Gateway"),
    (503, "Service Unavailable"),
    (504, "Gateway Time-out"),
    (505, "SIP Version not supported"),
    (600, "Busy Everywhere"),
    (603, "Decline"),
    (604, "Does not exist anywhere"),
    (606, "Not Acceptable"),
];

/// Default reason phrase for `code`
pub fn reason_phrase(code: u16) -> &'static str {
    if let Some((_, phrase)) = PHRASES.iter().find(|(c, _)| *c == code) {
        return phrase;
    }
    match code / 100 {
        1 => "Trying",
        2 => "OK",
        3 => "Multiple Choices",
        4 => "Bad Request",
        5 => "Internal Server Error",
        6 => "Busy Everywhere",
        _ => "Reason Unknown",
    }
}

/// A validated response status code (100-699)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const TRYING: StatusCode = StatusCode(100);
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const CALL_OR_TRANSACTION_DOES_NOT_EXIST: StatusCode = StatusCode(481);
    pub const SERVER_INTERNAL_ERROR: StatusCode = StatusCode(500);

    pub fn from_u16(code: u16) -> Result<Self> {
        if (100..=699).contains(&code) {
            Ok(StatusCode(code))
        } else {
            Err(Error::InvalidStatusCode(code))
        }
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn reason_phrase(&self) -> &'static str {
        reason_phrase(self.0)
    }

    pub fn is_provisional(&self) -> bool {
        self.0 < 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.0)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    pub fn is_global_failure(&self) -> bool {
        self.0 >= 600
    }

    /// 3xx through 6xx
    pub fn is_error(&self) -> bool {
        self.0 >= 300
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StatusCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s
            .trim()
            .parse::<u16>()
            .map_err(|_| Error::Malformed(format!("invalid status code '{}'", s)))?;
        StatusCode::from_u16(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_phrase_table() {
        assert_eq!(reason_phrase(481), "Call Leg/Transaction Does Not Exist");
        assert_eq!(reason_phrase(500), "Internal Server Error");
        assert_eq!(reason_phrase(183), "Session Progress");
        assert_eq!(reason_phrase(199), "Trying");
        assert_eq!(reason_phrase(499), "Bad Request");
        assert_eq!(reason_phrase(999), "Reason Unknown");
    }

    #[test]
    fn test_status_code_classes() {
        let code: StatusCode = "302".parse().unwrap();
        assert!(code.is_redirection());
        assert!(code.is_error());
        assert!(!StatusCode::OK.is_error());
        assert!(StatusCode::TRYING.is_provisional());
        assert!(StatusCode::from_u16(700).is_err());
        assert!("abc".parse::<StatusCode>().is_err());
    }
}
