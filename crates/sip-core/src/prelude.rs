//! # Prelude
//!
//! The `b2bua_sip_core` prelude brings the most common types into scope.
//!
//! This is typically imported with `use b2bua_sip_core::prelude::*;`

pub use crate::error::{Error, Result};
pub use crate::headers::HeaderTokenStore;
pub use crate::message::{ConsumeResult, SipMessage};
pub use crate::parser::{BRANCH_MAGIC_COOKIE, MAX_BODY_SIZE, MAX_HEADER_SIZE, create_branch, create_tag};
pub use crate::types::{CSeq, NameAddr, StatusCode, Uri, reason_phrase};
pub use crate::types::{contact, cseq, name_addr, route, uri, via};
