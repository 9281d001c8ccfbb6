//! Result surface handed back to the caller.
//!
//! A single delegate answers with raw text. Batch operations answer with a
//! JSON payload (`{"results", "errors"}` or `{"result", "errors"}`). Either way
//! the error flag is set when anything failed; partial results are always
//! included.

use crate::delegate::DelegateResult;
use crate::dispatch::BatchOutcome;
use crate::error::{FanoutError, Result};
use crate::reduce::Reduction;
use serde::Serialize;

/// Text payload plus an error flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn from_delegate(result: &DelegateResult) -> Self {
        Self {
            text: result.text().to_string(),
            is_error: !result.is_ok(),
        }
    }

    pub fn from_batch(outcome: &BatchOutcome) -> Result<Self> {
        Ok(Self {
            text: to_json(outcome)?,
            is_error: outcome.has_errors(),
        })
    }

    pub fn from_reduction(reduction: &Reduction) -> Result<Self> {
        Ok(Self {
            text: to_json(reduction)?,
            is_error: reduction.has_errors(),
        })
    }
}

fn to_json<T: Serialize>(payload: &T) -> Result<String> {
    serde_json::to_string_pretty(payload)
        .map_err(|e| FanoutError::UserError(format!("failed to serialize result payload: {}", e)))
}
