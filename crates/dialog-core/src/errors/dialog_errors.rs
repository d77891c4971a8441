use thiserror::Error;

/// Result type for dialog operations
pub type DialogResult<T> = Result<T, DialogError>;

/// Errors raised by the dialog store and the routing engines
#[derive(Debug, Error)]
pub enum DialogError {
    /// No dialog state matches the message
    #[error("Dialog not found: {id}")]
    DialogNotFound { id: String },

    /// The request cannot be routed as sent
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Route set, contact and last known address all failed to resolve
    #[error("Unable to resolve target: {message}")]
    UnresolvedTarget { message: String },

    /// An ACK arrived for a 2xx that is not (or no longer) cached
    #[error("No 2xx retransmission in cache for {key}")]
    RetransmissionCacheMiss { key: String },

    /// Max-Forwards would drop to zero
    #[error("Max-Forwards exhausted")]
    MaxForwardsExceeded,

    /// Registration record missing key, AOR or contact
    #[error("Invalid registration: {message}")]
    InvalidRegistration { message: String },

    /// Stored state could not be decoded
    #[error("Corrupted dialog state: {message}")]
    CorruptedState { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Message model error
    #[error("SIP error: {0}")]
    Sip(#[from] b2bua_sip_core::Error),

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DialogError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::DialogNotFound { id: id.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unresolved(message: impl Into<String>) -> Self {
        Self::UnresolvedTarget {
            message: message.into(),
        }
    }

    pub fn cache_miss(key: impl Into<String>) -> Self {
        Self::RetransmissionCacheMiss { key: key.into() }
    }

    pub fn invalid_registration(message: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            message: message.into(),
        }
    }

    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::CorruptedState {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// SIP status code used when this error is answered with a response
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DialogNotFound { .. } => 481,
            Self::BadRequest { .. } => 400,
            Self::MaxForwardsExceeded => 483,
            Self::InvalidRegistration { .. } => 400,
            Self::Sip(b2bua_sip_core::Error::Malformed(_)) => 400,
            _ => 500,
        }
    }

    /// Reason phrase for the error response, when it differs from the
    /// standard phrase of [`status_code`](Self::status_code)
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::DialogNotFound { .. } => Some("Unable to match dialog".to_string()),
            Self::BadRequest { message } => Some(message.clone()),
            Self::UnresolvedTarget { .. } => Some("Can't Resolve Requested Target".to_string()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DialogError {
    fn from(err: serde_json::Error) -> Self {
        Self::corrupted(err.to_string())
    }
}

impl From<b2bua_infra_common::Error> for DialogError {
    fn from(err: b2bua_infra_common::Error) -> Self {
        Self::config(err.to_string())
    }
}
