//! Handler trait and the ordered handler registry.
//!
//! The registry is assembled once at startup. Order within each list is
//! significant: the dispatcher tries primary handlers first, in
//! registration order, then final handlers, and stops at the first one
//! that reports the input as handled.

use std::sync::Arc;

use typist_types::error::Result;

use crate::context::HandlerContext;

/// What a handler did with the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    /// Not this handler's input; dispatch moves on.
    NotHandled,
    /// Handled, with nothing further to report.
    NoResult,
}

impl Outcome {
    /// Whether dispatch should stop at this handler.
    pub fn is_handled(self) -> bool {
        !matches!(self, Outcome::NotHandled)
    }
}

impl From<bool> for Outcome {
    fn from(handled: bool) -> Self {
        if handled {
            Outcome::Handled
        } else {
            Outcome::NotHandled
        }
    }
}

impl From<()> for Outcome {
    fn from((): ()) -> Self {
        Outcome::NoResult
    }
}

/// A command handler.
pub trait Handler: Send + Sync {
    /// Unique name, used to route follow-up input to a multi-turn handler.
    fn name(&self) -> &str;

    /// Words this handler responds to. Primary handlers are matched by
    /// prefix against the whole command line; every trigger also feeds the
    /// similar-command suggestions.
    fn triggers(&self) -> &[&str] {
        &[]
    }

    /// Handle the current command.
    fn handle(&self, ctx: &mut HandlerContext<'_>) -> Result<Outcome>;
}

/// Ordered primary and final handler lists plus similarity-only triggers.
#[derive(Default)]
pub struct HandlerRegistry {
    primary: Vec<Arc<dyn Handler>>,
    finals: Vec<Arc<dyn Handler>>,
    similarity_triggers: Vec<String>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler matched by its triggers.
    pub fn register_primary(&mut self, handler: impl Handler + 'static) -> &mut Self {
        log::debug!("Registered primary handler '{}'", handler.name());
        self.primary.push(Arc::new(handler));
        self
    }

    /// Register a handler invoked for every command no primary handler took.
    pub fn register_final(&mut self, handler: impl Handler + 'static) -> &mut Self {
        log::debug!("Registered final handler '{}'", handler.name());
        self.finals.push(Arc::new(handler));
        self
    }

    /// Add a trigger used only for suggestions, such as a widget opened by
    /// name elsewhere in the application.
    pub fn register_trigger(&mut self, trigger: impl Into<String>) -> &mut Self {
        self.similarity_triggers.push(trigger.into());
        self
    }

    /// Prefix-triggered handlers, in registration order.
    pub fn primary(&self) -> &[Arc<dyn Handler>] {
        &self.primary
    }

    /// Handlers tried on every unmatched input, in registration order.
    pub fn finals(&self) -> &[Arc<dyn Handler>] {
        &self.finals
    }

    /// Look up a handler in either list by name.
    pub fn find(&self, name: &str) -> Option<&Arc<dyn Handler>> {
        self.primary
            .iter()
            .chain(&self.finals)
            .find(|h| h.name() == name)
    }

    /// Every known trigger without duplicates: primary, then final, then
    /// similarity-only.
    pub fn triggers(&self) -> Vec<&str> {
        let mut all: Vec<&str> = Vec::new();
        let declared = self
            .primary
            .iter()
            .chain(&self.finals)
            .flat_map(|h| h.triggers().iter().copied());
        let extra = self.similarity_triggers.iter().map(String::as_str);
        for trigger in declared.chain(extra) {
            if !all.contains(&trigger) {
                all.push(trigger);
            }
        }
        all
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.primary.len() + self.finals.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
