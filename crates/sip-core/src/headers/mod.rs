//! Header Token Store and header name normalization.

pub mod header_name;
pub mod store;

pub use header_name::{canonical_key, expand_compact, is_compact};
pub use store::HeaderTokenStore;
