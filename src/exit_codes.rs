//! Exit code constants for the fanout CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable input, invalid config)
//! - 2: Delegation failure (the payload carries the error flag)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable items file, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Delegation failure: the single call failed, or a batch reported errors.
pub const DELEGATION_FAILURE: i32 = 2;
