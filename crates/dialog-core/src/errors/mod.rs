//! Error types for dialog-core
//!
//! Failures of the routing and ACK engines map onto SIP status codes through
//! [`DialogError::status_code`]; the engines turn them into error responses.

pub mod dialog_errors;

// Re-export main error types
pub use dialog_errors::{DialogError, DialogResult};
