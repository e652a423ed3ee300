//! Error types for typist.

use std::io;

/// Errors produced by the console interpreter and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum TypistError {
    /// The input was blank after trimming.
    #[error("empty input")]
    EmptyInput,

    #[error("redirection error: {0}")]
    Redirection(String),

    /// Raised by handler code.
    #[error("command error: {0}")]
    Command(String),

    /// A registered handler failed; fatal for the current command only.
    #[error("handler '{handler}' failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: Box<TypistError>,
    },

    /// The native shell could not run a passthrough command.
    #[error("shell error: {0}")]
    Shell(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("label error: {0}")]
    Label(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TypistError>;
