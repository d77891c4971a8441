//! # b2bua-infra-common
//!
//! Shared infrastructure for the B2BUA signaling core crates:
//!
//! - [`logging`]: `tracing` subscriber bootstrap driven by a small [`LoggingConfig`]
//! - [`config`]: TOML configuration loading into any `serde` type
//! - [`errors`]: the infrastructure error type used by both
//!
//! Protocol crates never install a subscriber themselves; the embedding
//! application calls [`setup_logging`] once at startup.

pub mod config;
pub mod errors;
pub mod logging;

pub use config::{load_toml_file, load_toml_str};
pub use errors::{Error, Result};
pub use logging::{LoggingConfig, log_welcome, parse_log_level, setup_logging};
