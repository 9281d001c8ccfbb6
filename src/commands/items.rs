//! Batch item collection from flags and item files.

use crate::cli::ItemArgs;
use crate::error::{FanoutError, Result};
use std::io::Read;
use std::path::Path;

/// Collect items: repeated `--item` values first, then the items file.
pub fn collect_items(args: &ItemArgs) -> Result<Vec<String>> {
    let mut items = args.items.clone();

    if let Some(path) = &args.items_file {
        let content = read_source(path)?;
        items.extend(split_items(&content));
    }

    Ok(items)
}

/// Split item text into items.
///
/// A JSON array yields one item per element (non-strings are rendered as
/// JSON); anything else yields one item per non-empty line.
pub fn split_items(input: &str) -> Vec<String> {
    let trimmed = input.trim();

    if trimmed.starts_with('[')
        && let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed)
    {
        return values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }

    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect()
}

/// Read a whole file, or stdin for `-`.
pub fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| FanoutError::UserError(format!("failed to read stdin: {}", e)))?;
        return Ok(content);
    }

    std::fs::read_to_string(path).map_err(|e| {
        FanoutError::UserError(format!(
            "failed to read items file '{}': {}",
            path.display(),
            e
        ))
    })
}
