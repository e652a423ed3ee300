//! Command interpreter and animated output for the typist console.
//!
//! Input lines are parsed into a verb and arguments, routed through an
//! ordered handler registry, and answered through a printer whose
//! background worker types text onto the host's output surface.

mod commands;
pub mod context;
pub mod filter;
mod interpreter;
pub mod labels;
pub mod parser;
pub mod printer;
pub mod redirect;
pub mod registry;
pub mod shell;
pub mod similarity;
pub mod workers;

#[cfg(test)]
mod test_utils;

/// Register the built-in handlers (help, echo, greeting) into a registry.
pub use commands::register_builtins;
/// Per-command view handed to handlers.
pub use context::HandlerContext;
/// The console façade and its construction inputs.
pub use interpreter::{Console, ConsoleContext, Dispatch, InputSource};
/// Output producer handle.
pub use printer::{AnimationSettings, Printer};
/// Handler trait, outcome, and the ordered registry.
pub use registry::{Handler, HandlerRegistry, Outcome};
/// Cancellation handle for background workers.
pub use workers::CancelToken;
