//! The console façade: input handling, dispatch, fallback, and escape.
//!
//! A [`Console`] owns the handler registry, the output printer, and the
//! per-command session. [`Console::handle`] runs one line of input through
//! the pipeline:
//!
//! 1. reset the previous command and any redirection,
//! 2. drop blank input and reject blocked words,
//! 3. parse, arming redirection for a trailing `> filename`,
//! 4. route to the active multi-turn handler, then primary handlers by
//!    trigger prefix, then final handlers unconditionally,
//! 5. on a miss, suggest or auto-invoke a similar command, or hand the
//!    command to the native shell.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use typist_types::config::ConsoleConfig;
use typist_types::error::{Result, TypistError};
use typist_types::output::{LabelStyle, OutputItem, OutputSurface, TypingSound};

use crate::context::{HandlerContext, Session};
use crate::filter::BlockedWords;
use crate::labels::PrintedLabels;
use crate::parser;
use crate::printer::{AnimationSettings, Printer};
use crate::redirect::REDIRECTION_SETUP_FAILED;
use crate::registry::{Handler, HandlerRegistry, Outcome};
use crate::shell::{self, UNKNOWN_COMMAND};
use crate::similarity;
use crate::workers::Workers;

/// Maximum number of history entries to retain.
const MAX_HISTORY: usize = 100;

/// Printed by [`Console::escape`].
pub const ESCAPED: &str = "Escaped";

/// Prefix of the line printed when handling an input fails.
pub const COMMAND_FAILED: &str = "Command failed";

/// Host-provided collaborators for a console.
pub struct ConsoleContext {
    pub surface: Arc<dyn OutputSurface>,
    pub sound: Option<Arc<dyn TypingSound>>,
    pub config: ConsoleConfig,
}

/// Where an input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Typed by the user.
    User,
    /// A similar command invoked in place of an unknown one, `depth` links
    /// into the chain.
    Similar { depth: usize },
}

/// How an input was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Blank input; nothing happened.
    Empty,
    Blocked { word: String },
    Handled { handler: String },
    /// The verb equals a known trigger, yet nothing handled it.
    ExactMatchDeclined { trigger: String },
    Suggested { trigger: String, score: f64 },
    AutoTriggered {
        trigger: String,
        result: Box<Dispatch>,
    },
    ShellPassthrough,
    Unknown,
    /// A handler failed or panicked.
    Failed { reason: String },
}

/// Terminal-style command interpreter.
pub struct Console {
    registry: Arc<HandlerRegistry>,
    printer: Printer,
    workers: Workers,
    session: Session,
    config: ConsoleConfig,
    filter: BlockedWords,
    labels: PrintedLabels,
    history: Vec<String>,
}

impl Console {
    /// Build a console over the host's surface. Fails if `config` does not
    /// validate or its label colours do not parse.
    pub fn new(context: ConsoleContext, registry: HandlerRegistry) -> Result<Self> {
        let ConsoleContext {
            surface,
            sound,
            config,
        } = context;
        config.validate()?;

        let printer = Printer::new(surface, sound, AnimationSettings::from_config(&config));
        let labels = PrintedLabels::new(LabelStyle::from_config(&config)?);
        log::info!(
            "Console ready for {} with {} handlers",
            config.username,
            registry.len()
        );
        Ok(Self {
            registry: Arc::new(registry),
            printer,
            workers: Workers::new(),
            session: Session::default(),
            filter: BlockedWords::new(&config.blocked_words),
            labels,
            config,
            history: Vec::new(),
        })
    }

    // -- Accessors --

    /// The output printer; clone it to print from another thread.
    pub fn printer(&self) -> &Printer {
        &self.printer
    }

    /// Background workers started by handlers and the shell passthrough.
    pub fn workers(&self) -> &Workers {
        &self.workers
    }

    /// Registered handlers and triggers.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Labels printed by handlers.
    pub fn labels(&self) -> &PrintedLabels {
        &self.labels
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// The command being dispatched and the active multi-turn handler.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// User inputs, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Swap the configuration. Animation, filter and label style changes
    /// take effect immediately.
    pub fn set_config(&mut self, config: ConsoleConfig) -> Result<()> {
        config.validate()?;
        let style = LabelStyle::from_config(&config)?;
        self.printer.set_settings(AnimationSettings::from_config(&config));
        self.filter = BlockedWords::new(&config.blocked_words);
        self.labels.restyle(style);
        self.config = config;
        Ok(())
    }

    // -- Output façade --

    /// Queue `item` on the standard output lane.
    pub fn print(&self, item: impl Into<OutputItem>) {
        self.printer.print(item);
    }

    /// Queue `item` and a newline as one unit.
    pub fn println(&self, item: impl Into<OutputItem>) {
        self.printer.println(item);
    }

    // -- Input --

    /// Handle one line of user input.
    ///
    /// Never fails: a handler error or panic is logged, reported with one
    /// line of output, and leaves the console ready for the next input.
    /// A handler that never returns blocks this call too.
    pub fn handle(&mut self, input: &str) -> Dispatch {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_handle(input)));
        match outcome {
            Ok(Ok(dispatch)) => dispatch,
            Ok(Err(e)) => self.recover(e.to_string()),
            Err(payload) => self.recover(panic_message(payload.as_ref())),
        }
    }

    /// Like [`Console::handle`], but handler failures are returned.
    pub fn try_handle(&mut self, input: &str) -> Result<Dispatch> {
        self.dispatch_input(input, InputSource::User)
    }

    fn recover(&mut self, reason: String) -> Dispatch {
        log::error!("Failed to handle input: {reason}");
        self.session.reset_handlers();
        self.printer.redirection().disarm();
        self.printer.println_priority(format!("{COMMAND_FAILED}: {reason}"));
        Dispatch::Failed { reason }
    }

    fn dispatch_input(&mut self, input: &str, source: InputSource) -> Result<Dispatch> {
        self.session.clear_command();
        self.printer.redirection().disarm();

        let line = input.trim();
        if line.is_empty() {
            log::debug!("Ignoring empty input");
            return Ok(Dispatch::Empty);
        }

        match source {
            InputSource::User => {
                log::info!("[Client] {line}");
                self.push_history(line);
            },
            InputSource::Similar { .. } => log::info!("[Similar Command] {line}"),
        }

        if self.config.filter_chat
            && let Some(word) = self.filter.check(line)
        {
            let word = word.to_string();
            self.printer.println(format!(
                "Sorry, {}, but that language is prohibited, word: \"{word}\"",
                self.config.username
            ));
            return Ok(Dispatch::Blocked { word });
        }

        let parsed = parser::parse(line)?;
        if let Some(filename) = parsed.redirect.as_deref() {
            self.arm_redirection(filename);
        }
        self.session.load(parsed);

        if let Some(handler) = self.dispatch_handlers()? {
            return Ok(Dispatch::Handled { handler });
        }
        self.unknown_input(source)
    }

    fn arm_redirection(&self, filename: &str) {
        let dir = Path::new(&self.config.redirection_dir);
        if let Err(e) = self.printer.redirection().arm(dir, filename) {
            log::warn!("Could not redirect output to '{filename}': {e}");
            self.printer.println(REDIRECTION_SETUP_FAILED);
        }
    }

    /// Try the active handler, then primary, then final handlers. Returns
    /// the name of the handler that took the command.
    fn dispatch_handlers(&mut self) -> Result<Option<String>> {
        let registry = Arc::clone(&self.registry);

        if let Some(active) = self.session.active().map(|a| a.handler.clone()) {
            match registry.find(&active) {
                Some(handler) => {
                    if self.invoke(handler.as_ref())?.is_handled() {
                        return Ok(Some(active));
                    }
                },
                None => {
                    log::warn!("Active handler '{active}' is not registered");
                    self.session.reset_handlers();
                },
            }
        }

        let line = self.session.command_and_args().to_lowercase();
        for handler in registry.primary() {
            let triggered = handler
                .triggers()
                .iter()
                .any(|t| line.starts_with(&t.to_lowercase()));
            if triggered && self.invoke(handler.as_ref())?.is_handled() {
                return Ok(Some(handler.name().to_string()));
            }
        }

        for handler in registry.finals() {
            if self.invoke(handler.as_ref())?.is_handled() {
                return Ok(Some(handler.name().to_string()));
            }
        }
        Ok(None)
    }

    fn invoke(&mut self, handler: &dyn Handler) -> Result<Outcome> {
        log::debug!("Invoking handler '{}'", handler.name());
        let mut ctx = HandlerContext::new(
            &mut self.session,
            &self.printer,
            &self.workers,
            &self.registry,
            &self.labels,
            &self.config,
        );
        handler.handle(&mut ctx).map_err(|e| TypistError::Handler {
            handler: handler.name().to_string(),
            source: Box::new(e),
        })
    }

    fn unknown_input(&mut self, source: InputSource) -> Result<Dispatch> {
        let verb = self.session.command().to_string();
        let similar = similarity::most_similar(&verb, self.registry.triggers());
        log::debug!(
            "Most similar trigger to '{verb}': {:?} ({:.3})",
            similar.best_trigger,
            similar.score
        );

        if similar.is_exact()
            && let Some(trigger) = &similar.best_trigger
        {
            return Ok(Dispatch::ExactMatchDeclined {
                trigger: trigger.clone(),
            });
        }

        if self.config.wrap_shell {
            let args = self.session.args().to_vec();
            if let Err(e) = shell::passthrough(&self.printer, &self.workers, &verb, &args) {
                log::warn!("Could not start shell passthrough: {e}");
                self.printer.println(UNKNOWN_COMMAND);
                return Ok(Dispatch::Unknown);
            }
            return Ok(Dispatch::ShellPassthrough);
        }

        match similar.best_trigger {
            Some(trigger) if similar.score >= self.config.suggestion_threshold => {
                let depth = match source {
                    InputSource::User => 0,
                    InputSource::Similar { depth } => depth,
                };
                if self.config.auto_trigger_similar
                    && similar.score >= self.config.auto_trigger_threshold
                    && depth < self.config.max_auto_trigger_chain
                {
                    self.printer.println(format!(
                        "Unknown command; invoking similar command: \"{trigger}\""
                    ));
                    let result = self.dispatch_input(
                        &trigger,
                        InputSource::Similar { depth: depth + 1 },
                    )?;
                    return Ok(Dispatch::AutoTriggered {
                        trigger,
                        result: Box::new(result),
                    });
                }
                self.printer.println(format!(
                    "Unknown command; most similar command: \"{trigger}\""
                ));
                Ok(Dispatch::Suggested {
                    trigger,
                    score: similar.score,
                })
            },
            _ => {
                self.printer.println(UNKNOWN_COMMAND);
                Ok(Dispatch::Unknown)
            },
        }
    }

    fn push_history(&mut self, line: &str) {
        if self.history.last().is_none_or(|last| last != line) {
            self.history.push(line.to_string());
            if self.history.len() > MAX_HISTORY {
                self.history.remove(0);
            }
        }
    }

    // -- Cancellation --

    /// Stop background workers, flush pending output without animation,
    /// and start the next command from a clean slate.
    pub fn escape(&mut self) {
        let cancelled = self.workers.cancel_all();
        self.printer.finish_now();
        self.printer.redirection().disarm();
        self.session.reset_handlers();
        log::debug!("Escape signalled {cancelled} workers");
        self.printer.println_priority(ESCAPED);
    }

    /// Cancel background workers and discard output that has not been
    /// rendered yet.
    pub fn shutdown(&mut self) {
        let cancelled = self.workers.cancel_all();
        self.printer.finish_now();
        let discarded = self.printer.clear();
        self.printer.redirection().disarm();
        self.session.reset_handlers();
        log::info!("Console shut down ({cancelled} workers cancelled, {discarded} items discarded)");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
