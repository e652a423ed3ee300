//! Output queues and the typing-animation worker.
//!
//! Producers append to one of two FIFO queues. A single background worker
//! is started lazily on the first append and drains the priority queue
//! completely before touching the standard queue, re-checking priority
//! after every item. When both queues are empty the worker exits; the next
//! append starts a new one.
//!
//! Standard-queue text is typed out one character at a time when the
//! animation is enabled. Priority text, components, images, and anything
//! rendered while the finish flag is set go to the surface in one call.
//! The finish flag stays raised until the worker finds both queues empty.
//!
//! Locks, each held only for its own critical section:
//! - `queues`: both queues plus the worker-running flag.
//! - `unit_lock`: keeps a whole printed unit (an item and its newline, or a
//!   batch of lines) contiguous in the standard queue.
//! - `pane_lock`: one render or entity removal on the surface at a time.
//! - the redirection sink's own lock.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use typist_types::config::ConsoleConfig;
use typist_types::error::Result;
use typist_types::output::{OutputItem, OutputSurface, TypingSound};

use crate::redirect::{REDIRECTION_WRITE_FAILED, Redirected, RedirectionSink};

/// Name of the animation worker thread.
pub const WORKER_THREAD_NAME: &str = "console-printing-animation";

/// How output text is animated. Re-read by the worker before every item.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSettings {
    pub typing_animation: bool,
    pub typing_sound: bool,
    pub caps_mode: bool,
    pub char_delay: Duration,
    pub line_delay: Duration,
    /// Characters typed between sound effects.
    pub sound_frequency: usize,
}

impl AnimationSettings {
    /// Animation settings taken from the console configuration.
    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self {
            typing_animation: config.typing_animation,
            typing_sound: config.typing_sound,
            caps_mode: config.caps_mode,
            char_delay: config.char_delay(),
            line_delay: config.line_delay(),
            sound_frequency: config.sound_frequency.max(1),
        }
    }

    /// Settings that render everything at once.
    pub fn instant() -> Self {
        Self {
            typing_animation: false,
            typing_sound: false,
            caps_mode: false,
            char_delay: Duration::ZERO,
            line_delay: Duration::ZERO,
            sound_frequency: 1,
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self::from_config(&ConsoleConfig::default())
    }
}

/// Which queue an item goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Drained first, never animated.
    Priority,
    Standard,
}

#[derive(Debug, Default)]
struct Queues {
    priority: VecDeque<OutputItem>,
    standard: VecDeque<OutputItem>,
    running: bool,
}

impl Queues {
    fn len(&self) -> usize {
        self.priority.len() + self.standard.len()
    }

    fn next(&mut self) -> Option<(Lane, OutputItem)> {
        if let Some(item) = self.priority.pop_front() {
            return Some((Lane::Priority, item));
        }
        self.standard.pop_front().map(|item| (Lane::Standard, item))
    }
}

struct Shared {
    queues: Mutex<Queues>,
    idle: Condvar,
    unit_lock: Mutex<()>,
    pane_lock: Mutex<()>,
    finish: AtomicBool,
    settings: RwLock<AnimationSettings>,
    redirect: RedirectionSink,
    surface: Arc<dyn OutputSurface>,
    sound: Option<Arc<dyn TypingSound>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Producer handle for console output. Cheap to clone and `Send`, so
/// background workers can print too.
#[derive(Clone)]
pub struct Printer {
    shared: Arc<Shared>,
}

impl Printer {
    /// A printer rendering onto `surface`. No worker runs until the first
    /// item is queued.
    pub fn new(
        surface: Arc<dyn OutputSurface>,
        sound: Option<Arc<dyn TypingSound>>,
        settings: AnimationSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queues: Mutex::new(Queues::default()),
                idle: Condvar::new(),
                unit_lock: Mutex::new(()),
                pane_lock: Mutex::new(()),
                finish: AtomicBool::new(false),
                settings: RwLock::new(settings),
                redirect: RedirectionSink::new(),
                surface,
                sound,
            }),
        }
    }

    // -- Producers --

    /// Queue `item` on the standard lane, typed out when animation is on.
    pub fn print(&self, item: impl Into<OutputItem>) {
        let _unit = lock(&self.shared.unit_lock);
        self.enqueue(Lane::Standard, vec![item.into()]);
    }

    /// Print `item` followed by a newline. No other writer's output can
    /// land between the two.
    pub fn println(&self, item: impl Into<OutputItem>) {
        let _unit = lock(&self.shared.unit_lock);
        self.enqueue(Lane::Standard, vec![item.into(), OutputItem::newline()]);
    }

    /// Print each line followed by a newline, as one contiguous unit.
    pub fn printlns<I, T>(&self, lines: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<OutputItem>,
    {
        let items: Vec<OutputItem> = lines
            .into_iter()
            .flat_map(|line| [line.into(), OutputItem::newline()])
            .collect();
        let _unit = lock(&self.shared.unit_lock);
        self.enqueue(Lane::Standard, items);
    }

    /// Queue `item` ahead of all standard output. Never animated.
    pub fn print_priority(&self, item: impl Into<OutputItem>) {
        self.enqueue(Lane::Priority, vec![item.into()]);
    }

    /// [`Printer::print_priority`] followed by a newline.
    pub fn println_priority(&self, item: impl Into<OutputItem>) {
        self.enqueue(Lane::Priority, vec![item.into(), OutputItem::newline()]);
    }

    /// Append items to a queue, diverting them to the redirection file when
    /// one is armed, and start the worker if it is not running.
    fn enqueue(&self, lane: Lane, items: Vec<OutputItem>) {
        let items = self.divert(items);
        if items.is_empty() {
            return;
        }

        let start = {
            let mut queues = lock(&self.shared.queues);
            match lane {
                Lane::Priority => queues.priority.extend(items),
                Lane::Standard => queues.standard.extend(items),
            }
            !std::mem::replace(&mut queues.running, true)
        };
        if start {
            self.start_worker();
        }
    }

    fn divert(&self, items: Vec<OutputItem>) -> Vec<OutputItem> {
        let mut live = Vec::with_capacity(items.len());
        for item in items {
            match self.shared.redirect.offer(&item) {
                Redirected::Inactive => live.push(item),
                Redirected::Written => {},
                Redirected::Failed(_) => {
                    live.push(OutputItem::text(REDIRECTION_WRITE_FAILED));
                    live.push(OutputItem::newline());
                    live.push(item);
                },
            }
        }
        live
    }

    fn start_worker(&self) {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(&shared));
        if let Err(e) = spawned {
            log::error!("Failed to start the printing animation worker: {e}");
            lock(&self.shared.queues).running = false;
            self.shared.idle.notify_all();
        }
    }

    // -- Control --

    /// Render everything still queued, and the rest of any item being
    /// typed, without delay. Cleared once both queues have drained.
    pub fn finish_now(&self) {
        self.shared.finish.store(true, Ordering::Release);
    }

    /// Whether queued output is being flushed without animation.
    pub fn is_finishing(&self) -> bool {
        self.shared.finishing()
    }

    /// A snapshot of the current animation settings.
    pub fn settings(&self) -> AnimationSettings {
        self.shared.settings()
    }

    /// Replace the animation settings. The worker picks them up at its
    /// next item.
    pub fn set_settings(&self, settings: AnimationSettings) {
        *self
            .shared
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// The sink that diverts output to a file while armed.
    pub fn redirection(&self) -> &RedirectionSink {
        &self.shared.redirect
    }

    /// Items waiting in either queue.
    pub fn pending(&self) -> usize {
        lock(&self.shared.queues).len()
    }

    /// Whether the animation worker thread is alive.
    pub fn is_worker_running(&self) -> bool {
        lock(&self.shared.queues).running
    }

    /// Drop everything still queued. Returns how many items were discarded.
    pub fn clear(&self) -> usize {
        let mut queues = lock(&self.shared.queues);
        let discarded = queues.len();
        queues.priority.clear();
        queues.standard.clear();
        if !queues.running {
            self.shared.finish.store(false, Ordering::Release);
        }
        discarded
    }

    /// Block until the worker has drained both queues and stopped.
    pub fn wait_idle(&self) {
        let queues = lock(&self.shared.queues);
        let _idle = self
            .shared
            .idle
            .wait_while(queues, |q| q.running)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like [`Printer::wait_idle`] with an upper bound. Returns `true` if
    /// the worker went idle in time.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let queues = lock(&self.shared.queues);
        let (queues, _) = self
            .shared
            .idle
            .wait_timeout_while(queues, timeout, |q| q.running)
            .unwrap_or_else(PoisonError::into_inner);
        !queues.running
    }

    // -- Surface queries --

    /// Remove the most recent entry and the newline after it, then restore
    /// a trailing newline if anything is left.
    pub fn remove_last_entity(&self) -> Result<()> {
        let restore = {
            let _pane = lock(&self.shared.pane_lock);
            self.shared.surface.remove_last_element()?;
            self.shared.surface.remove_last_element()?;
            !self.shared.surface.is_empty()
        };
        if restore {
            self.print(OutputItem::newline());
        }
        Ok(())
    }

    /// The last non-blank line on the surface.
    pub fn last_text_line(&self) -> String {
        self.shared.surface.last_rendered_line()
    }
}

/// Clears the running flag if the worker exits without doing so itself.
struct RunningGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(&self.shared.queues).running = false;
            self.shared.idle.notify_all();
        }
    }
}

fn run_worker(shared: &Shared) {
    let mut guard = RunningGuard {
        shared,
        armed: true,
    };
    loop {
        let next = {
            let mut queues = lock(&shared.queues);
            match queues.next() {
                Some(next) => next,
                None => {
                    shared.finish.store(false, Ordering::Release);
                    queues.running = false;
                    guard.armed = false;
                    shared.idle.notify_all();
                    return;
                },
            }
        };

        let (lane, item) = next;
        log::trace!("Console out: {item:?}");
        match panic::catch_unwind(AssertUnwindSafe(|| shared.render(lane, &item))) {
            Ok(Ok(())) => {},
            Ok(Err(e)) => log::error!("Failed to render console output: {e}"),
            Err(_) => log::error!("Output surface panicked while rendering {item:?}"),
        }
    }
}

impl Shared {
    fn finishing(&self) -> bool {
        self.finish.load(Ordering::Acquire)
    }

    fn settings(&self) -> AnimationSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn render(&self, lane: Lane, item: &OutputItem) -> Result<()> {
        let settings = self.settings();
        let animated = {
            let _pane = lock(&self.pane_lock);
            match item {
                OutputItem::Text(text) => {
                    let text = if settings.caps_mode {
                        Cow::Owned(text.to_uppercase())
                    } else {
                        Cow::Borrowed(text.as_str())
                    };
                    if lane == Lane::Standard && settings.typing_animation && !self.finishing() {
                        self.type_out(&text, &settings)?;
                        true
                    } else {
                        self.surface.insert_text(&text)?;
                        false
                    }
                },
                OutputItem::Component(component) => {
                    self.surface.insert_component(component)?;
                    false
                },
                OutputItem::Image(image) => {
                    self.surface.insert_image(image)?;
                    false
                },
            }
        };

        if animated && !self.finishing() && !settings.line_delay.is_zero() {
            thread::sleep(settings.line_delay);
        }
        Ok(())
    }

    /// Type `text` one character at a time. If the finish flag is raised
    /// part-way, the remainder is inserted in one call.
    fn type_out(&self, text: &str, settings: &AnimationSettings) -> Result<()> {
        let mut since_sound = 0usize;
        let mut buf = [0u8; 4];
        for (idx, ch) in text.char_indices() {
            if self.finishing() {
                return self.surface.insert_text(&text[idx..]);
            }
            self.surface.insert_text(ch.encode_utf8(&mut buf))?;

            if settings.typing_sound
                && let Some(sound) = &self.sound
            {
                since_sound += 1;
                if since_sound >= settings.sound_frequency {
                    sound.play();
                    since_sound = 0;
                }
            }

            if !settings.char_delay.is_zero() {
                thread::sleep(settings.char_delay);
            }
        }
        Ok(())
    }
}
