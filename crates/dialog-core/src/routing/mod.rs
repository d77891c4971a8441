//! Routing engines for requests inside an established B2BUA dialog
//!
//! - [`mid_dialog`]: BYE, re-INVITE, UPDATE, INFO, ... relayed to the other leg
//! - [`ack`]: ACKs for 2xx responses, correlated through the retransmission cache
//! - [`route_set`]: Route header encoding and next-hop selection shared by both

pub mod ack;
pub mod mid_dialog;
pub mod route_set;

pub use ack::{AckRoute, PEER_XOR_PROPERTY};
pub use mid_dialog::{RouteOutcome, XOR_PROPERTY};
pub use route_set::{RouteTarget, encode_route_set, resolve_next_hop};
