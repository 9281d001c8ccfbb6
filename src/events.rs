//! Diagnostic event log for fanout.
//!
//! Every delegated call reports its lifecycle (spawn, each stdin/stdout/stderr
//! chunk, exit) and the orchestration layers report chunk and phase
//! transitions. Events go to an [`EventSink`], which callers inject; nothing in
//! the core writes to a fixed destination, and no sink can change what an
//! operation returns.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: What happened (spawn, stdout, exit, chunk_start, ...)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `call`: Optional delegated call id, shared by all events of one process
//! - `details`: Freeform object with action-specific details
//!
//! [`NdjsonSink`] appends one object per line to a file.

use crate::error::{FanoutError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Process started
    Spawn,
    /// Process could not be started
    SpawnFailed,
    /// Request written to the process
    Stdin,
    /// Request could not be written (process closed its input early)
    StdinFailed,
    /// Chunk of primary output
    Stdout,
    /// Chunk of diagnostic output
    Stderr,
    /// Process exited
    Exit,
    /// Dispatcher chunk submitted
    ChunkStart,
    /// Every call of a dispatcher chunk settled
    ChunkComplete,
    /// One dispatched item recorded as a failure
    ItemFailed,
    /// Reducer state transition
    Phase,
    /// Reduce step advanced the accumulator
    ReduceStep,
    /// Reduce step failed; accumulator left unchanged
    ReduceStepFailed,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Spawn => write!(f, "spawn"),
            EventAction::SpawnFailed => write!(f, "spawn_failed"),
            EventAction::Stdin => write!(f, "stdin"),
            EventAction::StdinFailed => write!(f, "stdin_failed"),
            EventAction::Stdout => write!(f, "stdout"),
            EventAction::Stderr => write!(f, "stderr"),
            EventAction::Exit => write!(f, "exit"),
            EventAction::ChunkStart => write!(f, "chunk_start"),
            EventAction::ChunkComplete => write!(f, "chunk_complete"),
            EventAction::ItemFailed => write!(f, "item_failed"),
            EventAction::Phase => write!(f, "phase"),
            EventAction::ReduceStep => write!(f, "reduce_step"),
            EventAction::ReduceStepFailed => write!(f, "reduce_step_failed"),
        }
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor running the orchestration (e.g., `user@HOST`).
    pub actor: String,

    /// Delegated call id, when the event belongs to one process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<u64>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action, stamped now.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: ACTOR.clone(),
            call: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the delegated call id for this event.
    pub fn with_call(mut self, call: u64) -> Self {
        self.call = Some(call);
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| FanoutError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

static ACTOR: LazyLock<String> = LazyLock::new(get_actor_string);

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Destination for diagnostic events.
///
/// Implementations must tolerate concurrent calls: every in-flight delegated
/// process reports through the same sink.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event);
}

/// Discards every event. Used when logging is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &Event) {}
}

/// Appends events as NDJSON lines to a file.
#[derive(Debug)]
pub struct NdjsonSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl NdjsonSink {
    /// Open (or create) the log file in append mode.
    ///
    /// The parent directory is created if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                FanoutError::UserError(format!(
                    "failed to create event log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                FanoutError::UserError(format!(
                    "failed to open event log '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    fn append(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;
        let mut file = self.file.lock().unwrap_or_else(|poison| poison.into_inner());
        writeln!(file, "{}", json_line).map_err(|e| {
            FanoutError::UserError(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl EventSink for NdjsonSink {
    fn record(&self, event: &Event) {
        if let Err(e) = self.append(event) {
            eprintln!("Warning: failed to log {} event: {}", event.action, e);
        }
    }
}

/// Prints a compact one-line trace of each event to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl EventSink for StderrSink {
    fn record(&self, event: &Event) {
        eprintln!("{}", format_trace_line(event));
    }
}

fn format_trace_line(event: &Event) -> String {
    let call = event
        .call
        .map(|c| format!(" #{}", c))
        .unwrap_or_default();
    format!(
        "[{}] {}{} {}",
        event.ts.format("%H:%M:%S%.3f"),
        event.action,
        call,
        event.details
    )
}

/// Forwards every event to each inner sink in order.
#[derive(Default)]
pub struct TeeSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl TeeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for TeeSink {
    fn record(&self, event: &Event) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

/// Keeps every event in memory, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<EventAction> {
        self.events().iter().map(|e| e.action).collect()
    }

    pub fn count(&self, action: EventAction) -> usize {
        self.events().iter().filter(|e| e.action == action).count()
    }
}

#[cfg(test)]
impl EventSink for MemorySink {
    fn record(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}
