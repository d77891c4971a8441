//! Dialog data model
//!
//! - [`DialogLeg`]: the dialog-forming header state of one call leg
//! - [`DialogRecord`]: both legs of one B2BUA session
//! - [`RegData`]: a REGISTER binding relayed through the B2BUA
//!
//! All three serialize to camelCase JSON, the format handed to persistence
//! backends.

pub mod leg;
pub mod record;
pub mod registration;

pub use leg::{DialogLeg, LegIndex};
pub use record::DialogRecord;
pub use registration::RegData;
