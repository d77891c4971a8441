//! # B2BUA Dialog-Core
//!
//! Two-leg dialog state and mid-dialog routing for a SIP back-to-back user
//! agent.
//!
//! A B2BUA terminates the caller's dialog (leg A) and originates a new one
//! toward the callee (leg B). This crate keeps both legs of every session
//! correlated and rewrites in-dialog traffic from one leg into the other.
//!
//! ## Architecture Position
//!
//! ```text
//! B2BUA transaction pipeline
//!      ↓
//! dialog-core (leg state, routing)  ← THIS CRATE
//!      ↓
//! sip-core (message model, header helpers)
//! ```
//!
//! ## What This Crate Does
//!
//! - **Session Correlation**: Encodes the session id and leg index into the
//!   Contact (or a Record-Route) the B2BUA hands out, and decodes it from
//!   in-dialog requests
//! - **Leg State Capture**: Response hooks record Call-ID, tags, contacts,
//!   route sets, CSeq and SDP for each leg
//! - **Mid-Dialog Routing**: Rewrites in-dialog requests for the other leg and
//!   resolves the next hop (loose and strict routing)
//! - **ACK Correlation**: Reuses the Via branch of the cached 2xx so the
//!   downstream UAS matches the ACK
//! - **Persistence**: Pluggable storage with bootstrap and expiry sweeps
//! - **Registrations**: REGISTER bindings relayed through the B2BUA
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use b2bua_dialog_core::{B2buaConfig, DialogStateManager, RouteOutcome};
//! use b2bua_dialog_core::transaction::B2bTransaction;
//! use b2bua_sip_core::SipMessage;
//!
//! fn relay(manager: &DialogStateManager, bye: &SipMessage, tx: &B2bTransaction) {
//!     match manager.route_mid_dialog(bye, tx) {
//!         Ok(RouteOutcome::Forward(target)) => {
//!             println!("send to {:?} over {}", target.target, target.transport);
//!         }
//!         Ok(RouteOutcome::Respond(response)) => {
//!             println!("answer with {:?}", response.status_code());
//!         }
//!         Err(e) => eprintln!("dropped: {}", e),
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = DialogStateManager::with_defaults(B2buaConfig::default())?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod dialog;
pub mod errors;
pub mod manager;
pub mod routing;
pub mod store;
pub mod transaction;
pub mod transport;

// Re-export main types
pub use config::{B2buaConfig, SessionCodec, StoreConfig};
pub use dialog::{DialogLeg, DialogRecord, LegIndex, RegData};
pub use errors::{DialogError, DialogResult};
pub use manager::DialogStateManager;
pub use routing::{AckRoute, RouteOutcome, RouteTarget};
pub use store::{DialogPersistence, DialogStore, InMemoryPersistence};
pub use transport::{DnsResolver, TransportInfo};

// Re-export for convenience
pub use b2bua_sip_core::SipMessage;
