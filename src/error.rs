//! Error types for the fanout CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Delegation failures inside a batch are data (see `dispatch::BatchOutcome`),
//! so these variants only cover what stops a command as a whole.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for fanout operations.
#[derive(Error, Debug)]
pub enum FanoutError {
    /// User provided invalid arguments or input that cannot be read.
    #[error("{0}")]
    UserError(String),

    /// Configuration file is missing, unparsable, or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The operation ran but reported failures (payload already printed).
    #[error("Delegation failed: {0}")]
    DelegationFailed(String),
}

impl FanoutError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            FanoutError::UserError(_) => exit_codes::USER_ERROR,
            FanoutError::ConfigError(_) => exit_codes::USER_ERROR,
            FanoutError::DelegationFailed(_) => exit_codes::DELEGATION_FAILURE,
        }
    }
}

/// Result type alias for fanout operations.
pub type Result<T> = std::result::Result<T, FanoutError>;
