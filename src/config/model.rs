//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Config file looked up in the current directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "fanout.yaml";

/// Configuration for delegated calls.
///
/// This struct represents the contents of `fanout.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command line of the external completion process.
    ///
    /// Parsed with shell quoting rules: the first word is the executable,
    /// the rest are fixed arguments passed on every call.
    #[serde(default = "default_command")]
    pub command: String,

    /// Working directory for every spawned process. Relative executables
    /// containing a path separator are resolved against it.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Concurrency ceiling for parallel and map-reduce batches.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// NDJSON diagnostic event log (disabled when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log: Option<PathBuf>,
}

/// Command-line overrides layered over the file config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub command: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub max_concurrency: Option<usize>,
    pub event_log: Option<PathBuf>,
}

// Default value functions for serde
fn default_command() -> String {
    "claude -p".to_string()
}
fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_max_concurrency() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: default_command(),
            working_dir: default_working_dir(),
            max_concurrency: default_max_concurrency(),
            event_log: None,
        }
    }
}
