//! Task model for delegated calls.
//!
//! A [`Task`] is one instruction destined for the external process, plus the
//! batch item it was built from (if any). Tasks are immutable once built and
//! owned by the call that creates them.
//!
//! # Composition
//!
//! Batch operations apply one instruction template to many items:
//!
//! - a template that contains the `{item}` token gets the item substituted in
//!   place ([`Composition::Substitute`]);
//! - any other template is treated as an ad-hoc prompt and the item is
//!   appended after a blank line ([`Composition::Concatenate`]).
//!
//! Reduce steps always substitute `{accumulator}` and `{result}`. Braces that
//! are not one of these tokens are sent unchanged.

mod template;

pub use template::{references, render_template, vars};

/// Placeholder for the current batch item.
pub const ITEM_VAR: &str = "item";

/// Placeholder for the running reduce value.
pub const ACCUMULATOR_VAR: &str = "accumulator";

/// Placeholder for the map output folded in by a reduce step.
pub const RESULT_VAR: &str = "result";

/// How a batch item is combined with its instruction template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// Append the item to the template, separated by a blank line.
    Concatenate,
    /// Replace `{item}` placeholders with the item.
    Substitute,
}

impl Composition {
    /// Pick the composition a template asks for.
    pub fn for_template(template: &str) -> Self {
        if references(template, ITEM_VAR) {
            Composition::Substitute
        } else {
            Composition::Concatenate
        }
    }

    /// Combine `template` and `item` into one instruction.
    pub fn compose(self, template: &str, item: &str) -> String {
        match self {
            Composition::Concatenate if template.is_empty() => item.to_string(),
            Composition::Concatenate => format!("{}\n\n{}", template, item),
            Composition::Substitute => render_template(template, &vars([(ITEM_VAR, item)])),
        }
    }
}

/// One unit of delegated work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    instruction: String,
    item: Option<String>,
}

impl Task {
    /// A standalone instruction, not tied to a batch item.
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            item: None,
        }
    }

    /// Build the task for one batch item.
    pub fn for_item(template: &str, item: &str, composition: Composition) -> Self {
        Self {
            instruction: composition.compose(template, item),
            item: Some(item.to_string()),
        }
    }

    /// Build one reduce step from the running value and the next map output.
    pub fn for_reduce(template: &str, accumulator: &str, result: &str) -> Self {
        Self::new(render_template(
            template,
            &vars([(ACCUMULATOR_VAR, accumulator), (RESULT_VAR, result)]),
        ))
    }

    /// The text written to the external process.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// The batch item this task was built from; failures are reported under it.
    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }
}
