//! Dialog state manager
//!
//! [`DialogStateManager`] owns the dialog store and drives it from three
//! directions: response hooks capture leg state, the routing engines
//! consume it, and the registration API keeps REGISTER bindings alongside.

pub mod core;
pub mod registration;
pub mod state_updates;

pub use core::DialogStateManager;
