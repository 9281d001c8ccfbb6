//! Implementation of the `fanout map-reduce` command.

use super::items::collect_items;
use super::runtime::Runtime;
use crate::cli::MapReduceArgs;
use crate::error::{FanoutError, Result};
use crate::reduce::map_reduce;
use crate::response::ToolResponse;

/// Execute the `fanout map-reduce` command.
pub fn cmd_map_reduce(runtime: &Runtime, args: MapReduceArgs) -> Result<()> {
    let items = collect_items(&args.items)?;
    let response = run_map_reduce(
        runtime,
        &args.map_template,
        &args.reduce_template,
        &items,
        args.initial.as_deref(),
    )?;

    println!("{}", response.text);

    if response.is_error {
        return Err(FanoutError::DelegationFailed(
            "map-reduce completed with errors".to_string(),
        ));
    }
    Ok(())
}

pub fn run_map_reduce(
    runtime: &Runtime,
    map_template: &str,
    reduce_template: &str,
    items: &[String],
    initial: Option<&str>,
) -> Result<ToolResponse> {
    let dispatcher = runtime.dispatcher();
    let reduction = map_reduce(&dispatcher, map_template, reduce_template, items, initial);
    ToolResponse::from_reduction(&reduction)
}
