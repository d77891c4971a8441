/*!
Error Handling

Error type shared by the logging and configuration helpers, plus a small
context utility for attributing a failure to a component and operation.
*/

pub mod types;
mod context;

pub use types::{Error, Result};
pub use context::{ErrorContext, ErrorExt};
