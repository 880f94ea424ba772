use std::env as stdenv;
use std::path::PathBuf;

/// Mutable shell state shared with every command invocation.
#[derive(Debug, Clone)]
pub struct Environment {
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment`.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { current_dir }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
