//! typist desktop entry point.
//!
//! Reads commands from stdin one line at a time and types the answers to
//! stdout. Enter `:esc` (or a bare ESC character) to escape the running
//! output, `exit` or `quit` to leave.

mod surface;

use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use surface::{BellSound, TerminalSurface};
use typist_terminal::{Console, ConsoleContext, HandlerRegistry, register_builtins};
use typist_types::config::ConsoleConfig;
use typist_types::output::TypingSound;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Resolve config from CLI arg, TYPIST_CONFIG env var, or defaults.
    let config = match std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TYPIST_CONFIG").ok())
    {
        Some(path) => ConsoleConfig::load(Path::new(&path))?,
        None => ConsoleConfig::default(),
    };
    log::info!("Starting typist for {}", config.username);

    let mut registry = HandlerRegistry::new();
    register_builtins(&mut registry);

    let sound: Arc<dyn TypingSound> = Arc::new(BellSound);
    let mut console = Console::new(
        ConsoleContext {
            surface: Arc::new(TerminalSurface::stdout()),
            sound: Some(sound),
            config,
        },
        registry,
    )?;
    console.println(format!("Welcome, {}.", console.config().username));

    for line in io::stdin().lock().lines() {
        let line = line?;
        match line.trim() {
            "exit" | "quit" => break,
            "\u{1b}" | ":esc" => {
                console.escape();
                continue;
            },
            _ => {},
        }
        let dispatch = console.handle(&line);
        log::debug!("Dispatch result: {dispatch:?}");
    }

    console.printer().wait_idle();
    console.shutdown();
    log::info!("Goodbye");
    Ok(())
}
