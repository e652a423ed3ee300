//! Built-in handlers.

use typist_types::error::Result;

use crate::context::HandlerContext;
use crate::registry::{Handler, HandlerRegistry, Outcome};

/// Register the built-in handlers into a registry.
///
/// Applications register their own primary handlers after these, and
/// their own final handlers before [`GreetingHandler`] if they want them
/// to see unclaimed input first.
pub fn register_builtins(reg: &mut HandlerRegistry) {
    reg.register_primary(HelpHandler);
    reg.register_primary(EchoHandler);
    reg.register_final(GreetingHandler);
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpHandler;
impl Handler for HelpHandler {
    fn name(&self) -> &str {
        "help"
    }
    fn triggers(&self) -> &[&str] {
        &["help"]
    }
    fn handle(&self, ctx: &mut HandlerContext<'_>) -> Result<Outcome> {
        if !ctx.command_is("help") {
            return Ok(Outcome::NotHandled);
        }
        let mut triggers = ctx.triggers();
        triggers.sort_unstable();
        let lines: Vec<String> = triggers.into_iter().map(|t| format!("  {t}")).collect();
        ctx.println("Known commands:");
        ctx.printlns(lines);
        Ok(Outcome::Handled)
    }
}

// ---------------------------------------------------------------------------
// echo / print
// ---------------------------------------------------------------------------

struct EchoHandler;
impl Handler for EchoHandler {
    fn name(&self) -> &str {
        "echo"
    }
    fn triggers(&self) -> &[&str] {
        &["echo", "print"]
    }
    fn handle(&self, ctx: &mut HandlerContext<'_>) -> Result<Outcome> {
        if !(ctx.command_is("echo") || ctx.command_is("print")) {
            return Ok(Outcome::NotHandled);
        }
        if ctx.no_args() {
            ctx.println(format!("Usage: {} <text>", ctx.command()));
        } else {
            ctx.println(ctx.args_to_string());
        }
        Ok(Outcome::Handled)
    }
}

// ---------------------------------------------------------------------------
// hello
// ---------------------------------------------------------------------------

/// Final handler that answers greetings by name.
pub struct GreetingHandler;
impl Handler for GreetingHandler {
    fn name(&self) -> &str {
        "greeting"
    }
    fn triggers(&self) -> &[&str] {
        &["hello", "hi", "hey"]
    }
    fn handle(&self, ctx: &mut HandlerContext<'_>) -> Result<Outcome> {
        let greeted = self.triggers().iter().any(|t| ctx.command_is(t));
        if greeted {
            ctx.println(format!("Hello, {}.", ctx.username()));
        }
        Ok(greeted.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Console, ConsoleContext, Dispatch};
    use crate::test_utils::RecordingSurface;
    use std::sync::Arc;
    use std::time::Duration;
    use typist_types::config::ConsoleConfig;

    fn console() -> (Console, Arc<RecordingSurface>) {
        let surface = RecordingSurface::new();
        let mut registry = HandlerRegistry::new();
        register_builtins(&mut registry);
        let config = ConsoleConfig {
            username: "Ada".into(),
            typing_animation: false,
            ..ConsoleConfig::default()
        };
        let console = Console::new(
            ConsoleContext {
                surface: surface.clone(),
                sound: None,
                config,
            },
            registry,
        )
        .unwrap();
        (console, surface)
    }

    fn output(console: &Console, surface: &RecordingSurface) -> String {
        assert!(console.printer().wait_idle_timeout(Duration::from_secs(10)));
        surface.text()
    }

    #[test]
    fn echo_prints_arguments() {
        let (mut console, surface) = console();
        console.handle("echo Hello  World");
        assert_eq!(output(&console, &surface), "Hello World\n");
    }

    #[test]
    fn echo_without_arguments_prints_usage() {
        let (mut console, surface) = console();
        console.handle("print");
        assert_eq!(output(&console, &surface), "Usage: print <text>\n");
    }

    #[test]
    fn echo_ignores_longer_verbs() {
        let (mut console, _surface) = console();
        // "printer" starts with the "print" trigger but is not an echo.
        let dispatch = console.handle("printer");
        assert!(matches!(dispatch, Dispatch::Suggested { .. } | Dispatch::Unknown));
    }

    #[test]
    fn help_lists_triggers() {
        let (mut console, surface) = console();
        console.handle("help");
        assert_eq!(
            output(&console, &surface),
            "Known commands:\n  echo\n  hello\n  help\n  hey\n  hi\n  print\n"
        );
    }

    #[test]
    fn greeting_is_a_final_handler() {
        let (mut console, surface) = console();
        assert_eq!(
            console.handle("Hey there"),
            Dispatch::Handled {
                handler: "greeting".into()
            }
        );
        assert_eq!(output(&console, &surface), "Hello, Ada.\n");
    }
}
