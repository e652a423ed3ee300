//! Output surface and typing sound for a plain terminal.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use typist_types::error::Result;
use typist_types::output::{Opaque, OutputSurface, TypingSound};

/// ANSI: cursor to column 0 and clear the line.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// ANSI: cursor up one line.
const CURSOR_UP: &str = "\x1b[1A";

/// Elements remembered for queries and erasure; older ones are forgotten.
const MAX_MODEL_ELEMENTS: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Element {
    Text(String),
    Newline,
    Object(String),
}

struct State<W> {
    out: W,
    elements: VecDeque<Element>,
    limit: usize,
}

impl<W> State<W> {
    fn push(&mut self, element: Element) {
        if self.elements.len() == self.limit {
            self.elements.pop_front();
        }
        self.elements.push_back(element);
    }
}

/// Writes console output to a terminal stream, keeping enough of a model
/// of what was written to answer queries and erase the last entries.
pub struct TerminalSurface<W: Write + Send> {
    state: Mutex<State<W>>,
}

impl TerminalSurface<io::Stdout> {
    /// A surface writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    /// A surface writing to `out`, starting from an empty model.
    pub fn new(out: W) -> Self {
        Self::with_limit(out, MAX_MODEL_ELEMENTS)
    }

    fn with_limit(out: W, limit: usize) -> Self {
        Self {
            state: Mutex::new(State {
                out,
                elements: VecDeque::new(),
                limit: limit.max(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(state: &mut State<W>, s: &str) -> Result<()> {
        state.out.write_all(s.as_bytes())?;
        state.out.flush()?;
        Ok(())
    }

    /// Concatenated text of everything still on screen.
    pub fn contents(&self) -> String {
        self.lock()
            .elements
            .iter()
            .map(|e| match e {
                Element::Text(s) | Element::Object(s) => s.as_str(),
                Element::Newline => "\n",
            })
            .collect()
    }

    /// Give back the underlying writer.
    #[cfg(test)]
    fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }
}

impl<W: Write + Send> OutputSurface for TerminalSurface<W> {
    fn insert_text(&self, text: &str) -> Result<()> {
        let mut state = self.lock();
        Self::write(&mut state, text)?;
        for piece in text.split_inclusive('\n') {
            let (body, newline) = match piece.strip_suffix('\n') {
                Some(body) => (body, true),
                None => (piece, false),
            };
            if !body.is_empty() {
                match state.elements.back_mut() {
                    Some(Element::Text(run)) => run.push_str(body),
                    _ => state.push(Element::Text(body.to_string())),
                }
            }
            if newline {
                state.push(Element::Newline);
            }
        }
        Ok(())
    }

    fn insert_component(&self, component: &Opaque) -> Result<()> {
        let mut state = self.lock();
        let shown = format!("[{}]", component.label());
        Self::write(&mut state, &shown)?;
        state.push(Element::Object(shown));
        Ok(())
    }

    fn insert_image(&self, image: &Opaque) -> Result<()> {
        let mut state = self.lock();
        let shown = format!("[image: {}]", image.label());
        Self::write(&mut state, &shown)?;
        state.push(Element::Object(shown));
        Ok(())
    }

    fn last_rendered_line(&self) -> String {
        self.contents()
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default()
            .to_string()
    }

    fn remove_last_element(&self) -> Result<bool> {
        let mut state = self.lock();
        let Some(removed) = state.elements.pop_back() else {
            return Ok(false);
        };
        match removed {
            Element::Newline => Self::write(&mut state, CURSOR_UP)?,
            Element::Text(_) | Element::Object(_) => Self::write(&mut state, CLEAR_LINE)?,
        }
        Ok(true)
    }

    fn is_empty(&self) -> bool {
        self.lock().elements.is_empty()
    }
}

/// Rings the terminal bell as the typing sound.
pub struct BellSound;

impl TypingSound for BellSound {
    fn play(&self) {
        let mut out = io::stdout();
        if let Err(e) = out.write_all(b"\x07").and_then(|()| out.flush()) {
            log::trace!("Could not ring bell: {e}");
        }
    }
}
