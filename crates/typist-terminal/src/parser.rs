//! Command line parsing: verb/argument split, redirection suffix, and
//! filename validation.

use typist_types::error::{Result, TypistError};

/// Token that introduces an output redirection (`cmd args > file`).
pub const REDIRECTION_TOKEN: &str = ">";

/// Filenames rejected on every platform (Windows device names).
const RESERVED_FILENAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Characters that may not appear in a redirection filename.
const INVALID_FILENAME_CHARS: &[char] = &['/', '\\', '<', '>', '|', '&', ':', '*', '?', '"', '\0'];

/// A command split into its routing verb and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// First token, lower-cased.
    pub verb: String,
    /// Remaining tokens in original case, redirection suffix removed.
    pub args: Vec<String>,
    /// Filename requested via a trailing `> filename`, not yet validated.
    pub redirect: Option<String>,
}

/// Split raw input into a [`ParsedCommand`].
///
/// Fails with [`TypistError::EmptyInput`] when the input holds no tokens.
pub fn parse(input: &str) -> Result<ParsedCommand> {
    let mut tokens = input.split_whitespace();
    let verb = tokens.next().ok_or(TypistError::EmptyInput)?.to_lowercase();
    let mut args: Vec<String> = tokens.map(str::to_string).collect();
    let redirect = split_redirection(&mut args);
    Ok(ParsedCommand {
        verb,
        args,
        redirect,
    })
}

/// Strip a trailing `> filename` pair from `args`, returning the filename.
///
/// Only the exact shape "second-to-last token is `>`" counts; a `>` in any
/// other position stays an ordinary argument.
pub fn split_redirection(args: &mut Vec<String>) -> Option<String> {
    let len = args.len();
    if len < 2 || args[len - 2] != REDIRECTION_TOKEN {
        return None;
    }
    let filename = args.pop();
    args.pop();
    filename
}

/// Whether `name` is safe to create inside the redirection directory.
///
/// Path separators, shell metacharacters, relative components and device
/// names are rejected on every platform.
pub fn is_valid_filename(name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." || name.ends_with('.') {
        return false;
    }
    if name.chars().any(|c| INVALID_FILENAME_CHARS.contains(&c) || c.is_control()) {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    !lower
        .split('.')
        .any(|part| RESERVED_FILENAMES.contains(&part))
}
