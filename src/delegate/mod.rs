//! Delegate channel: one request/response exchange with the external process.
//!
//! Each call starts a fresh process, writes the request on stdin followed by a
//! newline, closes stdin, and collects stdout and stderr until the process
//! exits. Failures never escape as errors: they come back as
//! [`DelegateResult::Fail`].
//!
//! The channel is a trait so orchestration code can be driven by any
//! implementation; [`ProcessDelegate`] is the one that spawns processes.

mod executor;

pub use executor::ProcessDelegate;

use std::borrow::Cow;

/// Appended to the request when a structured response is wanted.
///
/// This is a prompt-level hint; the response is still returned as raw text.
pub const STRUCTURED_DIRECTIVE: &str = "\n\nRespond using a flat key: value format, \
one entry per line, with no nesting, no markdown and no commentary.";

/// Outcome of one delegated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateResult {
    /// Process exited 0; carries stdout, or stderr when stdout was empty.
    Ok(String),
    /// Process could not start or exited non-zero.
    Fail(String),
}

impl DelegateResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, DelegateResult::Ok(_))
    }

    /// The output text or the failure message.
    pub fn text(&self) -> &str {
        match self {
            DelegateResult::Ok(text) | DelegateResult::Fail(text) => text,
        }
    }
}

/// Performs exactly one request/response exchange per call.
///
/// Implementations are shared by every worker of a batch, so calls may run
/// concurrently and must not share mutable per-call state.
pub trait Delegate: Send + Sync {
    fn delegate(&self, input: &str, force_structured: bool) -> DelegateResult;
}

/// The request text actually written to the process.
pub fn request_text(input: &str, force_structured: bool) -> Cow<'_, str> {
    if force_structured {
        Cow::Owned(format!("{}{}", input, STRUCTURED_DIRECTIVE))
    } else {
        Cow::Borrowed(input)
    }
}
