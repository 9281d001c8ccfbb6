//! Implementation of the `fanout delegate` command.

use super::items::read_source;
use super::runtime::Runtime;
use crate::cli::DelegateArgs;
use crate::delegate::Delegate;
use crate::error::{FanoutError, Result};
use crate::response::ToolResponse;
use std::path::Path;

/// Execute the `fanout delegate` command.
pub fn cmd_delegate(runtime: &Runtime, args: DelegateArgs) -> Result<()> {
    let instruction = match args.instruction.as_deref() {
        None | Some("-") => read_instruction_from_stdin()?,
        Some(text) => text.to_string(),
    };

    let response = run_delegate(runtime, &instruction, args.structured)?;
    if response.is_error {
        return Err(FanoutError::DelegationFailed(response.text));
    }

    println!("{}", response.text);
    Ok(())
}

/// Delegate one instruction and wrap the outcome.
pub fn run_delegate(runtime: &Runtime, instruction: &str, structured: bool) -> Result<ToolResponse> {
    if instruction.trim().is_empty() {
        return Err(FanoutError::UserError(
            "instruction cannot be empty".to_string(),
        ));
    }

    let result = runtime.delegate().delegate(instruction, structured);
    Ok(ToolResponse::from_delegate(&result))
}

fn read_instruction_from_stdin() -> Result<String> {
    let content = read_source(Path::new("-"))?;
    Ok(content.trim_end_matches(['\n', '\r']).to_string())
}
