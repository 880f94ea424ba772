//! A small interactive command shell.
//!
//! The crate is organized around a single interpretation pipeline: a raw
//! input line is scanned for `>>` append-redirection ([`parser`]), tokenized
//! into an argument vector ([`lexer`]), and dispatched through a registry of
//! built-in commands ([`Interpreter`]). Commands write exclusively through
//! an [`sink::OutputSink`], which either prints styled lines to the terminal
//! or captures them for redirection to a file. The `calc` builtin is backed
//! by a recursive-descent arithmetic evaluator ([`eval`]).
//!
//! The main entry point is [`Interpreter`]; `Interpreter::default().repl()`
//! runs the interactive loop with the full built-in command set.

pub mod builtin;
pub mod command;
pub mod env;
pub mod eval;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod sink;

pub use interpreter::{Interpreter, Registry};
