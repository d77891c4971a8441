use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the message model and the grammar helpers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Wire syntax violation
    #[error("Malformed SIP message: {0}")]
    Malformed(String),

    /// Header API misuse: access before the message is finalized, or a
    /// destructive remove of a multi-valued header
    #[error("Invalid parser state: {0}")]
    InvalidState(String),

    /// Header list index out of range on a present header
    #[error("Invalid index {index} for header '{name}' ({count} values)")]
    InvalidIndex {
        name: String,
        index: usize,
        count: usize,
    },

    /// A header value that cannot be stored or interpreted
    #[error("Invalid SIP header: {0}")]
    InvalidHeader(String),

    /// A URI that cannot be interpreted
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// Status code outside 100..=699
    #[error("Invalid status code: {0}")]
    InvalidStatusCode(u16),
}

impl Error {
    pub(crate) fn not_finalized() -> Self {
        Error::InvalidState("message is not finalized".to_string())
    }
}
