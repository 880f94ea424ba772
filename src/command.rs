use crate::env::Environment;
use crate::sink::OutputSink;
use anyhow::Result;

/// A single executable command.
///
/// Implementations receive the full argument vector (command name at
/// index 0), the shell environment, and the sink all user-facing text must
/// go through. Errors returned here are caught at the dispatch boundary and
/// reported; they never terminate the shell.
pub trait Command {
    fn execute(
        &self,
        argv: &[String],
        env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) -> Result<()>;
}

/// Registered metadata and handler for one command.
///
/// Aliases are plain data resolved once at registry build time; an alias
/// that collides with an already-registered key is dropped there.
pub struct Descriptor {
    /// Primary name of the command, e.g. "dir".
    pub name: &'static str,
    /// One-line description for `help`.
    pub description: &'static str,
    /// Additional names that resolve to the same command, e.g. "ls".
    pub aliases: &'static [&'static str],
    /// The unit of behavior invoked when the name resolves.
    pub handler: Box<dyn Command>,
}
