//! Sequential map-reduce.
//!
//! The map phase is a regular parallel dispatch. The reduce phase then folds
//! the map outputs, in the order the map phase returned them, into one
//! accumulator: each step substitutes `{accumulator}` and `{result}` into the
//! reduce template and delegates it. Steps run strictly one after another
//! because each depends on the previous accumulator.
//!
//! Error policy:
//! - map failures are returned in [`Reduction::errors`];
//! - a failed reduce step leaves the accumulator unchanged and is only written
//!   to the event log;
//! - a panic stops the fold and adds one error, keeping the accumulator
//!   reached so far.

use crate::delegate::DelegateResult;
use crate::dispatch::{Dispatcher, panic_message};
use crate::events::EventAction;
use crate::task::Task;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};


/// Final accumulator and the errors collected on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reduction {
    pub result: String,
    pub errors: Vec<String>,
}

impl Reduction {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Reducer progress, reported to the event log on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Mapping,
    Reducing(usize),
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Mapping => write!(f, "mapping"),
            Phase::Reducing(step) => write!(f, "reducing[{}]", step),
            Phase::Done => write!(f, "done"),
        }
    }
}

struct ReductionState<'d, 'a> {
    dispatcher: &'d Dispatcher<'a>,
    phase: Phase,
    accumulator: String,
    errors: Vec<String>,
}

impl<'d, 'a> ReductionState<'d, 'a> {
    fn enter(&mut self, phase: Phase) {
        self.dispatcher.emit(
            EventAction::Phase,
            json!({"from": self.phase.to_string(), "to": phase.to_string()}),
        );
        self.phase = phase;
    }

    fn run(&mut self, map_template: &str, reduce_template: &str, items: &[String]) {
        self.enter(Phase::Mapping);
        let mapped = self.dispatcher.run(map_template, items);
        self.errors.extend(mapped.errors);

        for (step, output) in mapped.results.iter().enumerate() {
            self.enter(Phase::Reducing(step));

            let task = Task::for_reduce(reduce_template, &self.accumulator, output);

            match self.dispatcher.delegate().delegate(task.instruction(), true) {
                DelegateResult::Ok(text) => {
                    self.dispatcher.emit(
                        EventAction::ReduceStep,
                        json!({"step": step, "bytes": text.len()}),
                    );
                    self.accumulator = text;
                }
                DelegateResult::Fail(message) => {
                    self.dispatcher.emit(
                        EventAction::ReduceStepFailed,
                        json!({"step": step, "error": message}),
                    );
                }
            }
        }

        self.enter(Phase::Done);
    }
}

/// Map `items` through `map_template`, then fold the outputs with `reduce_template`.
///
/// The accumulator starts at `initial` (empty when `None`).
pub fn map_reduce(
    dispatcher: &Dispatcher<'_>,
    map_template: &str,
    reduce_template: &str,
    items: &[String],
    initial: Option<&str>,
) -> Reduction {
    let mut state = ReductionState {
        dispatcher,
        phase: Phase::Idle,
        accumulator: initial.unwrap_or_default().to_string(),
        errors: Vec::new(),
    };

    let run = panic::catch_unwind(AssertUnwindSafe(|| {
        state.run(map_template, reduce_template, items)
    }));

    if let Err(payload) = run {
        state.errors.push(format!(
            "map-reduce aborted: unexpected error: {}",
            panic_message(payload.as_ref())
        ));
    }

    Reduction {
        result: state.accumulator,
        errors: state.errors,
    }
}
