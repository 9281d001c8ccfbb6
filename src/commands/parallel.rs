//! Implementation of the `fanout parallel` command.

use super::items::collect_items;
use super::runtime::Runtime;
use crate::cli::ParallelArgs;
use crate::error::{FanoutError, Result};
use crate::response::ToolResponse;

/// Execute the `fanout parallel` command.
///
/// The JSON payload is printed even when items failed, so partial results
/// reach the caller before the non-zero exit.
pub fn cmd_parallel(runtime: &Runtime, args: ParallelArgs) -> Result<()> {
    let items = collect_items(&args.items)?;
    let (response, failed) = run_parallel(runtime, &args.template, &items)?;

    println!("{}", response.text);

    if response.is_error {
        return Err(FanoutError::DelegationFailed(format!(
            "{} of {} item(s) failed",
            failed,
            items.len()
        )));
    }
    Ok(())
}

/// Run the batch and return the response along with the error count.
pub fn run_parallel(
    runtime: &Runtime,
    template: &str,
    items: &[String],
) -> Result<(ToolResponse, usize)> {
    let outcome = runtime.dispatcher().run(template, items);
    let response = ToolResponse::from_batch(&outcome)?;
    Ok((response, outcome.errors.len()))
}
