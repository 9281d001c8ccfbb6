//! Configuration model for fanout.
//!
//! This module defines the Config struct that represents `fanout.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.
//! Configuration is read once at startup and never changes afterwards.

mod model;
mod operations;


// Re-export public API
pub use model::{Config, ConfigOverrides, DEFAULT_CONFIG_FILE};
pub use operations::ResolvedCommand;
