use crate::errors::types::Error;
use std::fmt;

/// Where an infrastructure error happened
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Component that raised the error (e.g. "config")
    pub component: String,
    /// Operation in progress
    pub operation: String,
    /// Extra detail such as a file path
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new<S: Into<String>, T: Into<String>>(component: S, operation: T) -> Self {
        ErrorContext {
            component: component.into(),
            operation: operation.into(),
            details: None,
        }
    }

    pub fn with_details<S: Into<String>>(mut self, details: S) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in component '{}' during operation '{}'", self.component, self.operation)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Attach an [`ErrorContext`] to an error, keeping its variant
pub trait ErrorExt {
    fn context(self, ctx: ErrorContext) -> Error;
}

impl ErrorExt for Error {
    fn context(self, ctx: ErrorContext) -> Error {
        match self {
            Error::Config(msg) => Error::Config(format!("{} [{}]", msg, ctx)),
            Error::Logging(msg) => Error::Logging(format!("{} [{}]", msg, ctx)),
            Error::Validation(msg) => Error::Validation(format!("{} [{}]", msg, ctx)),
            Error::Internal(msg) => Error::Internal(format!("{} [{}]", msg, ctx)),
            Error::Io(err) => Error::Config(format!("{} [{}]", err, ctx)),
        }
    }
}
