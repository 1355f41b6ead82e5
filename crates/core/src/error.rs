//! Validation errors for user-supplied alert input.

use thiserror::Error;

/// Malformed user input. Surfaced to the user as a rejection message,
/// never logged as a system error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Unknown or unsupported symbol: {0}")]
    UnknownSymbol(String),

    #[error("Invalid alert ID: {0}")]
    InvalidAlertId(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
}
