//! Command implementations for fanout.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each batch command prints its JSON payload to stdout even
//! when some items failed, then reports the failure through the exit code.

mod delegate;
mod items;
mod map_reduce;
mod parallel;
mod runtime;

use crate::cli::{Cli, Command, GlobalArgs};
use crate::error::Result;
use runtime::{Runtime, load_config};

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let Cli { global, command } = cli;

    match command {
        Command::Config => cmd_config(&global),
        Command::Delegate(args) => delegate::cmd_delegate(&Runtime::from_args(&global)?, args),
        Command::Parallel(args) => parallel::cmd_parallel(&Runtime::from_args(&global)?, args),
        Command::MapReduce(args) => {
            map_reduce::cmd_map_reduce(&Runtime::from_args(&global)?, args)
        }
    }
}

/// Print the effective configuration (file plus overrides) as YAML.
fn cmd_config(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}
