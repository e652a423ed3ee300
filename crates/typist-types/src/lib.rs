//! Foundation types for typist.
//!
//! This crate holds the pieces shared by the interpreter core and its
//! embedders: the error taxonomy, console configuration, the output item
//! model, and the traits the host UI implements to receive rendered output.

pub mod config;
pub mod error;
pub mod output;
