//! Test doubles for the output surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use typist_types::error::{Result, TypistError};
use typist_types::output::{Opaque, OutputSurface};

/// One call made against the surface, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert {
    Text(String),
    Component(String),
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Element {
    Text(String),
    Newline,
    Object(String),
}

#[derive(Debug, Default)]
struct Gate {
    held: bool,
    blocked: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory surface that records every insert.
///
/// Content is kept as a list of elements: runs of text, newlines, and
/// objects. Consecutive text merges into one run, so a typed-out string is
/// a single element just like an atomically inserted one.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    inserts: Mutex<Vec<Insert>>,
    elements: Mutex<Vec<Element>>,
    gate: Mutex<Gate>,
    gate_changed: Condvar,
    fail_next_text: AtomicBool,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inserts(&self) -> Vec<Insert> {
        lock(&self.inserts).clone()
    }

    /// The text of every `insert_text` call, in order.
    pub fn text_chunks(&self) -> Vec<String> {
        lock(&self.inserts)
            .iter()
            .filter_map(|insert| match insert {
                Insert::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// The whole content as a string; objects appear as their labels.
    pub fn text(&self) -> String {
        lock(&self.elements)
            .iter()
            .map(|element| match element {
                Element::Text(text) | Element::Object(text) => text.as_str(),
                Element::Newline => "\n",
            })
            .collect()
    }

    /// Make every following insert block until [`RecordingSurface::release`].
    pub fn hold(&self) {
        lock(&self.gate).held = true;
    }

    pub fn release(&self) {
        lock(&self.gate).held = false;
        self.gate_changed.notify_all();
    }

    /// Wait until an insert is blocked on the gate.
    pub fn wait_for_blocked(&self, timeout: Duration) -> bool {
        let gate = lock(&self.gate);
        let (gate, _) = self
            .gate_changed
            .wait_timeout_while(gate, timeout, |g| !g.blocked)
            .unwrap_or_else(PoisonError::into_inner);
        gate.blocked
    }

    /// Make the next `insert_text` call fail.
    pub fn fail_next_text(&self) {
        self.fail_next_text.store(true, Ordering::SeqCst);
    }

    fn pass_gate(&self) {
        let mut gate = lock(&self.gate);
        if !gate.held {
            return;
        }
        gate.blocked = true;
        self.gate_changed.notify_all();
        let mut gate = self
            .gate_changed
            .wait_while(gate, |g| g.held)
            .unwrap_or_else(PoisonError::into_inner);
        gate.blocked = false;
    }

    fn push_text(&self, text: &str) {
        let mut elements = lock(&self.elements);
        for piece in text.split_inclusive('\n') {
            let (body, newline) = match piece.strip_suffix('\n') {
                Some(body) => (body, true),
                None => (piece, false),
            };
            if !body.is_empty() {
                match elements.last_mut() {
                    Some(Element::Text(run)) => run.push_str(body),
                    _ => elements.push(Element::Text(body.to_string())),
                }
            }
            if newline {
                elements.push(Element::Newline);
            }
        }
    }
}

impl OutputSurface for RecordingSurface {
    fn insert_text(&self, text: &str) -> Result<()> {
        self.pass_gate();
        if self.fail_next_text.swap(false, Ordering::SeqCst) {
            return Err(TypistError::Surface("injected failure".into()));
        }
        lock(&self.inserts).push(Insert::Text(text.to_string()));
        self.push_text(text);
        Ok(())
    }

    fn insert_component(&self, component: &Opaque) -> Result<()> {
        self.pass_gate();
        lock(&self.inserts).push(Insert::Component(component.label().to_string()));
        lock(&self.elements).push(Element::Object(component.label().to_string()));
        Ok(())
    }

    fn insert_image(&self, image: &Opaque) -> Result<()> {
        self.pass_gate();
        lock(&self.inserts).push(Insert::Image(image.label().to_string()));
        lock(&self.elements).push(Element::Object(image.label().to_string()));
        Ok(())
    }

    fn last_rendered_line(&self) -> String {
        self.text()
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default()
            .to_string()
    }

    fn remove_last_element(&self) -> Result<bool> {
        Ok(lock(&self.elements).pop().is_some())
    }

    fn is_empty(&self) -> bool {
        lock(&self.elements).is_empty()
    }
}
