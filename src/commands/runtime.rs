//! Wiring shared by the delegating commands: effective config, event sink,
//! and the process delegate built from them.

use crate::cli::GlobalArgs;
use crate::config::{Config, ConfigOverrides, DEFAULT_CONFIG_FILE};
use crate::delegate::ProcessDelegate;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::events::{EventSink, NdjsonSink, NullSink, StderrSink, TeeSink};
use std::sync::Arc;

/// Everything a command needs to delegate work. Built once per invocation.
pub struct Runtime {
    config: Config,
    sink: Arc<dyn EventSink>,
    delegate: ProcessDelegate,
}

impl Runtime {
    pub fn from_args(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global)?;
        let sink = build_sink(&config, global.verbose)?;
        Self::new(config, sink)
    }

    pub fn new(config: Config, sink: Arc<dyn EventSink>) -> Result<Self> {
        let delegate = ProcessDelegate::from_config(&config, Arc::clone(&sink))?;
        Ok(Self {
            config,
            sink,
            delegate,
        })
    }

    pub fn delegate(&self) -> &ProcessDelegate {
        &self.delegate
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(
            &self.delegate,
            self.sink.as_ref(),
            self.config.max_concurrency,
        )
    }
}

/// Load the config file and layer the command-line overrides on top.
///
/// An explicit `--config` must exist; the default `fanout.yaml` is optional.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let base = match &global.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(DEFAULT_CONFIG_FILE)?,
    };

    base.with_overrides(ConfigOverrides {
        command: global.exec.clone(),
        working_dir: global.working_dir.clone(),
        max_concurrency: global.max_concurrency,
        event_log: global.event_log.clone(),
    })
}

fn build_sink(config: &Config, verbose: bool) -> Result<Arc<dyn EventSink>> {
    let mut tee = TeeSink::new();
    if let Some(path) = &config.event_log {
        tee = tee.with(NdjsonSink::open(path)?);
    }
    if verbose {
        tee = tee.with(StderrSink);
    }

    if tee.is_empty() {
        Ok(Arc::new(NullSink))
    } else {
        Ok(Arc::new(tee))
    }
}
