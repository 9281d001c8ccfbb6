//! Bounded parallel dispatcher.
//!
//! Applies one instruction template to a list of items, delegating each
//! resulting task with a structured-response hint. Items are processed in
//! consecutive chunks of at most `ceiling` items: every task of a chunk runs
//! on its own scoped thread, and the next chunk starts only after the whole
//! chunk has settled. A slow item therefore delays the following chunk; peak
//! concurrency never exceeds the ceiling.
//!
//! Failures are isolated per item. A failed call or a panicking worker becomes one message in [`BatchOutcome::errors`] and never
//! stops sibling items or later chunks.

use crate::delegate::{Delegate, DelegateResult};
use crate::events::{Event, EventAction, EventSink};
use crate::task::{Composition, Task};
use serde::Serialize;
use serde_json::{Value, json};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;


/// Outputs and failure messages collected from one dispatch.
///
/// `results` is in completion order within each chunk, chunks in submission
/// order. A call that succeeds with empty output lands in neither list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<String>,
    pub errors: Vec<String>,
}

impl BatchOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Settled state of one dispatched item.
#[derive(Debug)]
enum ItemOutcome {
    Output(String),
    Empty,
    Failed(String),
}

/// Runs batches through a delegate under a concurrency ceiling.
pub struct Dispatcher<'a> {
    delegate: &'a dyn Delegate,
    sink: &'a dyn EventSink,
    ceiling: usize,
}

impl<'a> Dispatcher<'a> {
    /// A ceiling of 0 is treated as 1.
    pub fn new(delegate: &'a dyn Delegate, sink: &'a dyn EventSink, ceiling: usize) -> Self {
        Self {
            delegate,
            sink,
            ceiling: ceiling.max(1),
        }
    }

    pub(crate) fn delegate(&self) -> &'a dyn Delegate {
        self.delegate
    }

    pub(crate) fn emit(&self, action: EventAction, details: Value) {
        self.sink.record(&Event::new(action).with_details(details));
    }

    /// Dispatch `template` over `items`, choosing the composition from the template.
    pub fn run(&self, template: &str, items: &[String]) -> BatchOutcome {
        self.run_with(template, items, Composition::for_template(template))
    }

    /// Dispatch `template` over `items` with an explicit composition.
    pub fn run_with(
        &self,
        template: &str,
        items: &[String],
        composition: Composition,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        let run = panic::catch_unwind(AssertUnwindSafe(|| {
            for (index, chunk) in items.chunks(self.ceiling).enumerate() {
                self.run_chunk(index, chunk, template, composition, &mut outcome);
            }
        }));

        if let Err(payload) = run {
            outcome.errors.push(format!(
                "parallel dispatch aborted: {}",
                panic_message(payload.as_ref())
            ));
        }

        outcome
    }

    fn run_chunk(
        &self,
        index: usize,
        chunk: &[String],
        template: &str,
        composition: Composition,
        outcome: &mut BatchOutcome,
    ) {
        self.emit(
            EventAction::ChunkStart,
            json!({"chunk": index, "size": chunk.len()}),
        );

        let (tx, rx) = mpsc::channel();
        thread::scope(|s| {
            for item in chunk {
                let worker_tx = tx.clone();
                let task = Task::for_item(template, item, composition);
                let worker = thread::Builder::new()
                    .name(format!("fanout-chunk{}", index))
                    .spawn_scoped(s, move || {
                        let settled = self.run_item(&task);
                        // Receiver outlives the scope; send cannot fail here.
                        let _ = worker_tx.send((item, settled));
                    });

                if let Err(e) = worker {
                    let detail = format!("failed to start worker: {}", e);
                    let _ = tx.send((item, ItemOutcome::Failed(item_failure(item, &detail))));
                }
            }
        });
        drop(tx);

        let mut ok = 0;
        let mut failed = 0;
        for (item, settled) in rx {
            match settled {
                ItemOutcome::Output(text) => {
                    ok += 1;
                    outcome.results.push(text);
                }
                ItemOutcome::Empty => {}
                ItemOutcome::Failed(message) => {
                    failed += 1;
                    self.emit(
                        EventAction::ItemFailed,
                        json!({"chunk": index, "item": item, "error": message}),
                    );
                    outcome.errors.push(message);
                }
            }
        }

        self.emit(
            EventAction::ChunkComplete,
            json!({"chunk": index, "ok": ok, "failed": failed}),
        );
    }

    fn run_item(&self, task: &Task) -> ItemOutcome {
        let item = task.item().unwrap_or_default();

        let called = panic::catch_unwind(AssertUnwindSafe(|| {
            self.delegate.delegate(task.instruction(), true)
        }));

        match called {
            Ok(DelegateResult::Ok(text)) if text.is_empty() => ItemOutcome::Empty,
            Ok(DelegateResult::Ok(text)) => ItemOutcome::Output(text),
            Ok(DelegateResult::Fail(message)) => ItemOutcome::Failed(item_failure(item, &message)),
            Err(payload) => ItemOutcome::Failed(item_failure(
                item,
                &format!("unexpected error: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

/// Dispatch `template` over `items` with at most `ceiling` calls in flight.
pub fn dispatch_parallel(
    delegate: &dyn Delegate,
    sink: &dyn EventSink,
    template: &str,
    items: &[String],
    ceiling: usize,
) -> BatchOutcome {
    Dispatcher::new(delegate, sink, ceiling).run(template, items)
}

fn item_failure(item: &str, detail: &str) -> String {
    format!("Error processing item \"{}\": {}", item, detail)
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
