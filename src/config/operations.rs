//! Config loading, validation, and command resolution.

use super::model::{Config, ConfigOverrides};
use crate::error::{FanoutError, Result};
use std::path::{Path, PathBuf};

/// Executable and fixed arguments ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Executable path, or a bare name to be looked up on `PATH`.
    pub program: PathBuf,
    /// Fixed arguments passed on every call.
    pub args: Vec<String>,
    /// Current directory for the spawned process.
    pub working_dir: PathBuf,
}

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(FanoutError::ConfigError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            FanoutError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults if it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| FanoutError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            FanoutError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `command` must parse into at least one word
    /// - `max_concurrency` must be positive
    pub fn validate(&self) -> Result<()> {
        self.command_words()?;

        if self.max_concurrency == 0 {
            return Err(FanoutError::ConfigError(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Layer command-line overrides over this config and re-validate.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(command) = overrides.command {
            self.command = command;
        }
        if let Some(working_dir) = overrides.working_dir {
            self.working_dir = working_dir;
        }
        if let Some(max_concurrency) = overrides.max_concurrency {
            self.max_concurrency = max_concurrency;
        }
        if let Some(event_log) = overrides.event_log {
            self.event_log = Some(event_log);
        }

        self.validate()?;
        Ok(self)
    }

    fn command_words(&self) -> Result<Vec<String>> {
        let words = shell_words::split(&self.command).map_err(|e| {
            FanoutError::ConfigError(format!(
                "failed to parse command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.command, e
            ))
        })?;

        if words.is_empty() {
            return Err(FanoutError::ConfigError(format!(
                "command is empty after parsing: '{}'",
                self.command
            )));
        }

        Ok(words)
    }

    /// Split the command and resolve the executable against `working_dir`.
    ///
    /// Relative executables are looked up in the working directory first. A
    /// path with a separator (`./bin/agent`) always resolves there; a bare
    /// name (`claude`) resolves there when such a file exists and is otherwise
    /// left for `PATH` lookup. Absolute paths are kept as-is.
    pub fn resolve_command(&self) -> Result<ResolvedCommand> {
        let mut words = self.command_words()?;
        let program = PathBuf::from(words.remove(0));

        let program = if program.is_absolute() {
            program
        } else {
            let local = self.working_dir.join(&program);
            if program.components().count() > 1 || local.is_file() {
                local
            } else {
                program
            }
        };

        Ok(ResolvedCommand {
            program,
            args: words,
            working_dir: self.working_dir.clone(),
        })
    }
}
