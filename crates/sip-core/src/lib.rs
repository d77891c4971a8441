//! SIP message layer for a back-to-back user agent
//!
//! This crate provides the Header Token Store, the SIP message model with
//! streaming and batch parsing, response construction, and string-level
//! grammar helpers for URI, From/To, Contact, Route, CSeq and Via values.

pub mod error;
pub mod headers;
pub mod message;
pub mod parser;
pub mod prelude;
pub mod types;

// Re-export key public items
pub use error::{Error, Result};
pub use headers::HeaderTokenStore;
pub use message::{ConsumeResult, SipMessage};
pub use parser::{create_branch, create_tag};
pub use types::{CSeq, NameAddr, StatusCode, Uri, reason_phrase};
