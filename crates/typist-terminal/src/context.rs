//! Per-command state and the context handed to handlers.

use typist_types::config::ConsoleConfig;
use typist_types::error::Result;
use typist_types::output::OutputItem;

use crate::labels::PrintedLabels;
use crate::parser::ParsedCommand;
use crate::printer::Printer;
use crate::registry::HandlerRegistry;
use crate::workers::{CancelToken, Workers};

/// A multi-turn handler that receives the next input directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveHandler {
    pub handler: String,
    pub iteration: usize,
}

/// The command being dispatched and any handler awaiting follow-up input.
#[derive(Debug, Clone, Default)]
pub struct Session {
    command: String,
    args: Vec<String>,
    active: Option<ActiveHandler>,
}

impl Session {
    /// Forget the previous command. The active handler survives.
    pub fn clear_command(&mut self) {
        self.command.clear();
        self.args.clear();
    }

    /// Make `parsed` the current command.
    pub fn load(&mut self, parsed: ParsedCommand) {
        self.command = parsed.verb;
        self.args = parsed.args;
    }

    /// The lower-cased verb of the current command.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments of the current command, case preserved.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Verb and arguments joined by single spaces.
    pub fn command_and_args(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }

    /// The handler that receives the next input, if any.
    pub fn active(&self) -> Option<&ActiveHandler> {
        self.active.as_ref()
    }

    /// Route the next input to `handler`. The iteration counter is kept if
    /// the same handler is already active and restarts at zero otherwise.
    pub fn set_active(&mut self, handler: &str) {
        if self.active.as_ref().is_some_and(|a| a.handler == handler) {
            return;
        }
        self.active = Some(ActiveHandler {
            handler: handler.to_string(),
            iteration: 0,
        });
    }

    /// Stop routing input to the active handler.
    pub fn reset_handlers(&mut self) {
        self.active = None;
    }
}

/// Everything a handler may touch while handling one command.
pub struct HandlerContext<'a> {
    session: &'a mut Session,
    printer: &'a Printer,
    workers: &'a Workers,
    registry: &'a HandlerRegistry,
    labels: &'a PrintedLabels,
    config: &'a ConsoleConfig,
}

impl<'a> HandlerContext<'a> {
    /// A context over one dispatch of the current command.
    pub fn new(
        session: &'a mut Session,
        printer: &'a Printer,
        workers: &'a Workers,
        registry: &'a HandlerRegistry,
        labels: &'a PrintedLabels,
        config: &'a ConsoleConfig,
    ) -> Self {
        Self {
            session,
            printer,
            workers,
            registry,
            labels,
            config,
        }
    }

    // -- Command queries --

    /// The lower-cased verb.
    pub fn command(&self) -> &str {
        self.session.command()
    }

    /// Whether the verb equals `name`, ignoring case.
    pub fn command_is(&self, name: &str) -> bool {
        self.session.command().eq_ignore_ascii_case(name)
    }

    /// The argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.session.args().get(index).map(String::as_str)
    }

    /// All arguments, case preserved.
    pub fn args(&self) -> &[String] {
        self.session.args()
    }

    /// Number of arguments.
    pub fn args_len(&self) -> usize {
        self.session.args().len()
    }

    /// Whether the command has no arguments.
    pub fn no_args(&self) -> bool {
        self.session.args().is_empty()
    }

    /// Whether exactly `expected` arguments were given.
    pub fn check_args_length(&self, expected: usize) -> bool {
        self.args_len() == expected
    }

    /// Arguments joined by single spaces.
    pub fn args_to_string(&self) -> String {
        self.session.args().join(" ")
    }

    /// Verb and arguments joined by single spaces.
    pub fn command_and_args_to_string(&self) -> String {
        self.session.command_and_args()
    }

    /// Whether the input with all whitespace removed equals any of
    /// `candidates`, ignoring case.
    pub fn input_ignoring_spaces_matches(&self, candidates: &[&str]) -> bool {
        let input = squash(&self.command_and_args_to_string());
        candidates.iter().any(|c| squash(c) == input)
    }

    /// Whether the input, without whitespace and ignoring case, starts with
    /// `prefix` treated the same way.
    pub fn input_ignoring_spaces_and_case_starts_with(&self, prefix: &str) -> bool {
        squash(&self.command_and_args_to_string()).starts_with(&squash(prefix))
    }

    // -- Output --

    /// Queue `item` on the standard lane.
    pub fn print(&self, item: impl Into<OutputItem>) {
        self.printer.print(item);
    }

    /// Queue `item` and a newline as one unit.
    pub fn println(&self, item: impl Into<OutputItem>) {
        self.printer.println(item);
    }

    /// Queue `item` ahead of all standard output.
    pub fn print_priority(&self, item: impl Into<OutputItem>) {
        self.printer.print_priority(item);
    }

    /// Queue `item` and a newline ahead of all standard output.
    pub fn println_priority(&self, item: impl Into<OutputItem>) {
        self.printer.println_priority(item);
    }

    /// Queue each line with its newline as one contiguous unit.
    pub fn printlns<I, T>(&self, lines: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<OutputItem>,
    {
        self.printer.printlns(lines);
    }

    /// Erase the last entry on the surface and the newline after it.
    pub fn remove_last_entity(&self) -> Result<()> {
        self.printer.remove_last_entity()
    }

    /// The last non-blank line on the surface.
    pub fn last_text_line(&self) -> String {
        self.printer.last_text_line()
    }

    /// A printer handle that can be moved into a background worker.
    pub fn printer(&self) -> &Printer {
        self.printer
    }

    // -- Multi-turn handlers --

    /// Route the next input straight to the handler named `handler`.
    pub fn set_redirection_handler(&mut self, handler: &str) {
        self.session.set_active(handler);
    }

    /// Stop routing input to this or any other handler.
    pub fn reset_handlers(&mut self) {
        self.session.reset_handlers();
    }

    /// Iteration counter of the active handler, zero if none is active.
    pub fn iteration(&self) -> usize {
        self.session.active().map_or(0, |a| a.iteration)
    }

    /// Set the active handler's iteration counter. No-op when none is active.
    pub fn set_iteration(&mut self, iteration: usize) {
        if let Some(active) = self.session.active.as_mut() {
            active.iteration = iteration;
        }
    }

    // -- Background work --

    /// Start a cancellable background worker.
    pub fn spawn_worker<F>(&self, name: &str, work: F) -> Result<CancelToken>
    where
        F: FnOnce(CancelToken) + Send + 'static,
    {
        self.workers.spawn(name, work)
    }

    /// Signal every background worker to stop.
    pub fn escape_threads(&self) -> usize {
        self.workers.cancel_all()
    }

    // -- Environment --

    /// Name used to address the user.
    pub fn username(&self) -> &str {
        &self.config.username
    }

    /// The console configuration.
    pub fn config(&self) -> &ConsoleConfig {
        self.config
    }

    /// Every registered trigger, duplicates removed.
    pub fn triggers(&self) -> Vec<&str> {
        self.registry.triggers()
    }

    /// Labels this console has printed and still tracks.
    pub fn labels(&self) -> &PrintedLabels {
        self.labels
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::printer::AnimationSettings;
    use crate::test_utils::RecordingSurface;
    use typist_types::output::LabelStyle;

    struct Fixture {
        session: Session,
        printer: Printer,
        workers: Workers,
        registry: HandlerRegistry,
        labels: PrintedLabels,
        config: ConsoleConfig,
    }

    impl Fixture {
        fn new(input: &str) -> Self {
            let config = ConsoleConfig::default();
            let mut session = Session::default();
            session.load(parse(input).unwrap());
            Self {
                session,
                printer: Printer::new(RecordingSurface::new(), None, AnimationSettings::instant()),
                workers: Workers::new(),
                registry: HandlerRegistry::new(),
                labels: PrintedLabels::new(LabelStyle::from_config(&config).unwrap()),
                config,
            }
        }

        fn ctx(&mut self) -> HandlerContext<'_> {
            HandlerContext::new(
                &mut self.session,
                &self.printer,
                &self.workers,
                &self.registry,
                &self.labels,
                &self.config,
            )
        }
    }

    #[test]
    fn argument_queries() {
        let mut fixture = Fixture::new("Pixelate 10 Blue");
        let ctx = fixture.ctx();
        assert_eq!(ctx.command(), "pixelate");
        assert!(ctx.command_is("PIXELATE"));
        assert_eq!(ctx.arg(0), Some("10"));
        assert_eq!(ctx.arg(1), Some("Blue"));
        assert_eq!(ctx.arg(2), None);
        assert_eq!(ctx.args_len(), 2);
        assert!(ctx.check_args_length(2));
        assert!(!ctx.no_args());
        assert_eq!(ctx.args_to_string(), "10 Blue");
        assert_eq!(ctx.command_and_args_to_string(), "pixelate 10 Blue");
    }

    #[test]
    fn whitespace_insensitive_matching() {
        let mut fixture = Fixture::new("what is  the Time");
        let ctx = fixture.ctx();
        assert!(ctx.input_ignoring_spaces_matches(&["whatisthetime", "time"]));
        assert!(!ctx.input_ignoring_spaces_matches(&["time"]));
        assert!(ctx.input_ignoring_spaces_and_case_starts_with("What Is"));
        assert!(!ctx.input_ignoring_spaces_and_case_starts_with("who"));
    }

    #[test]
    fn redirection_handler_keeps_counter_for_same_handler() {
        let mut fixture = Fixture::new("quiz");
        let mut ctx = fixture.ctx();
        assert_eq!(ctx.iteration(), 0);
        ctx.set_redirection_handler("quiz");
        ctx.set_iteration(3);
        ctx.set_redirection_handler("quiz");
        assert_eq!(ctx.iteration(), 3);
        ctx.set_redirection_handler("other");
        assert_eq!(ctx.iteration(), 0);
        ctx.reset_handlers();
        assert!(fixture.session.active().is_none());
    }

    #[test]
    fn clear_command_keeps_active_handler() {
        let mut session = Session::default();
        session.load(parse("quiz start").unwrap());
        session.set_active("quiz");
        session.clear_command();
        assert_eq!(session.command(), "");
        assert!(session.args().is_empty());
        assert_eq!(session.active().map(|a| a.handler.as_str()), Some("quiz"));
    }
}
