//! Error types raised while building SQL.
//!
//! Every error is synchronous and raised at build time. Caller bugs and incomplete dialect
//! support are reported through distinct variants so they never look like data errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input handed to a builder (bad operand count, `*` sub-query in an insert, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation exists but the dialect cannot express it. The message names the operation.
    #[error("{0} is not supported by this DBMS.")]
    NotSupported(String),

    /// No builder is registered for the expression kind.
    #[error("Expression of type {0} has no registered builder.")]
    UnsupportedExpression(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised by [`crate::Executor`] implementations, never by the builders.
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported(operation.into())
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
