//! Fanout: delegate prompts to an external completion process, singly or as
//! bounded parallel batches with an optional sequential reduce.
//!
//! This is the main entry point for the `fanout` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;
pub mod config;
pub mod delegate;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod reduce;
pub mod response;
pub mod task;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Batch payloads were already printed to stdout
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
