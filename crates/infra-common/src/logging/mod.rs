/*!
Logging

`tracing` subscriber bootstrap for applications embedding the signaling core.
*/

pub mod setup;

pub use setup::{LoggingConfig, log_welcome, parse_log_level, setup_logging};
