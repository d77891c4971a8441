//! Grammar field parsers.
//!
//! Every header type is available both as free functions over raw strings
//! (used for bulk rewriting) and, where useful, as a small owned wrapper.

pub mod addr_list;
pub mod contact;
pub mod cseq;
pub mod name_addr;
pub mod params;
pub mod route;
pub mod status;
pub mod uri;
pub mod via;

pub use cseq::CSeq;
pub use name_addr::NameAddr;
pub use status::{StatusCode, reason_phrase};
pub use uri::Uri;
