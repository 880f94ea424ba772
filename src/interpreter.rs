//! Command registry, dispatch, and the interactive loop.

use crate::builtin;
use crate::command::Descriptor;
use crate::env::Environment;
use crate::parser::{ParsedCommand, split_redirection};
use crate::sink::{ConsoleSink, OutputSink};
use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;

/// Mapping from case-insensitive command names and aliases to descriptors.
///
/// Built once at startup and read-only afterwards.
pub struct Registry {
    descriptors: Vec<Descriptor>,
    keys: HashMap<String, usize>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            keys: HashMap::new(),
        }
    }

    /// Register a descriptor under its primary name and aliases.
    ///
    /// Keys are lower-cased. A name or alias that collides with an
    /// already-present key is skipped, never overwritten — first
    /// registration wins.
    pub fn register(&mut self, descriptor: Descriptor) {
        let index = self.descriptors.len();
        self.keys
            .entry(descriptor.name.to_ascii_lowercase())
            .or_insert(index);
        for alias in descriptor.aliases {
            self.keys.entry(alias.to_ascii_lowercase()).or_insert(index);
        }
        self.descriptors.push(descriptor);
    }

    /// Case-insensitive lookup of a command name or alias.
    pub fn resolve(&self, name: &str) -> Option<&Descriptor> {
        self.keys
            .get(&name.to_ascii_lowercase())
            .map(|&index| &self.descriptors[index])
    }

    /// All registered descriptors, in registration order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Execute a parsed command: resolve, capture if redirected, invoke.
    ///
    /// Every failure path is reported through the sink; nothing here is
    /// fatal to the caller's loop. When a redirection target is present the
    /// handler's output is captured and appended to the file, even if the
    /// handler itself fails partway through.
    pub fn dispatch(
        &self,
        parsed: &ParsedCommand,
        env: &mut Environment,
        sink: &mut dyn OutputSink,
    ) {
        let Some(name) = parsed.args.first() else {
            return;
        };
        let Some(descriptor) = self.resolve(name) else {
            sink.error(&format!("Unknown command: {}", name.to_ascii_lowercase()));
            sink.warn("Type 'help' for available commands");
            return;
        };

        log::debug!(
            "dispatching {:?} (redirect: {:?})",
            parsed.args,
            parsed.output_target
        );

        let result = match &parsed.output_target {
            Some(target) => {
                sink.start_capture();
                let result = descriptor.handler.execute(&parsed.args, env, sink);
                let captured = sink.stop_capture();
                if let Err(e) = append_to_file(target, &captured) {
                    log::warn!("redirection flush to {target} failed: {e:#}");
                    sink.error(&format!("Cannot write to {target}: {e:#}"));
                }
                result
            }
            None => descriptor.handler.execute(&parsed.args, env, sink),
        };

        if let Err(e) = result {
            sink.error(&format!("{}: {e:#}", descriptor.name));
        }
    }
}

impl Default for Registry {
    /// Registry pre-populated with the built-in commands.
    fn default() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin::descriptors() {
            registry.register(descriptor);
        }
        registry
    }
}

/// Append captured output to a file, creating it if absent. UTF-8 text.
fn append_to_file(path: &str, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("can't open {path}"))?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// Whether a meta-command consumed the line, and what the loop should do.
enum MetaAction {
    Quit,
    Handled,
    NotMeta,
}

/// The interactive shell: registry, environment, and input history.
pub struct Interpreter {
    registry: Registry,
    env: Environment,
    history: Vec<String>,
}

impl Interpreter {
    /// Create an interpreter around a pre-built registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            env: Environment::new(),
            history: Vec::new(),
        }
    }

    /// Interpret one trimmed, non-empty input line.
    ///
    /// Meta-commands (`help`, `exit`/`quit`, `clear`, `version`, `history`)
    /// are handled here and never reach the tokenizer or dispatcher.
    /// Returns `false` when the loop should stop.
    pub fn interpret(&mut self, line: &str, sink: &mut dyn OutputSink) -> bool {
        self.history.push(line.to_string());
        match self.handle_meta(line, sink) {
            MetaAction::Quit => false,
            MetaAction::Handled => true,
            MetaAction::NotMeta => {
                let parsed = split_redirection(line);
                self.registry.dispatch(&parsed, &mut self.env, sink);
                true
            }
        }
    }

    /// Run the Read-Eval-Print Loop until `exit`/`quit` or end of input.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut sink = ConsoleSink::new();
        sink.info("Welcome to the rsh REPL! Type help for available commands or exit to quit.");

        loop {
            let prompt = format!("rsh {}> ", self.env.current_dir.display());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line)?;
                    if !self.interpret(line, &mut sink) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    sink.error(&format!("readline: {e}"));
                    break;
                }
            }
        }

        sink.info("Goodbye!");
        Ok(())
    }

    fn handle_meta(&mut self, line: &str, sink: &mut dyn OutputSink) -> MetaAction {
        let first = line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match first.as_str() {
            "exit" | "quit" => MetaAction::Quit,
            "clear" => {
                if let Err(e) = console::Term::stdout().clear_screen() {
                    log::warn!("can't clear screen: {e}");
                }
                MetaAction::Handled
            }
            "help" => {
                self.print_help(sink);
                MetaAction::Handled
            }
            "version" => {
                sink.info(&format!(
                    "{} v{}",
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_VERSION")
                ));
                MetaAction::Handled
            }
            "history" => {
                self.print_history(sink);
                MetaAction::Handled
            }
            _ => MetaAction::NotMeta,
        }
    }

    fn print_help(&self, sink: &mut dyn OutputSink) {
        sink.write_line(&format!("{:<18} {}", "Command", "Description"));
        for (name, description) in [
            ("help", "Show this help message"),
            ("exit/quit", "Exit the REPL"),
            ("clear", "Clear the screen"),
            ("version", "Show version information"),
            ("history", "Show command history"),
        ] {
            sink.write_line(&format!("{name:<18} {description}"));
        }
        for descriptor in self.registry.descriptors() {
            let name = if descriptor.aliases.is_empty() {
                descriptor.name.to_string()
            } else {
                format!("{}/{}", descriptor.name, descriptor.aliases.join("/"))
            };
            sink.write_line(&format!("{name:<18} {}", descriptor.description));
        }
    }

    fn print_history(&self, sink: &mut dyn OutputSink) {
        if self.history.is_empty() {
            sink.warn("No commands in history");
            return;
        }
        for (i, entry) in self.history.iter().enumerate() {
            sink.write_line(&format!("{:>4}  {}", i + 1, entry));
        }
    }
}

impl Default for Interpreter {
    /// Interpreter with the default set of built-in commands.
    fn default() -> Self {
        Self::new(Registry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::sink::MemorySink;

    /// Test command that writes its tag, for resolution checks.
    struct Tag(&'static str);

    impl Command for Tag {
        fn execute(
            &self,
            _argv: &[String],
            _env: &mut Environment,
            sink: &mut dyn OutputSink,
        ) -> Result<()> {
            sink.write_line(self.0);
            Ok(())
        }
    }

    /// Test command that writes two lines.
    struct TwoLines;

    impl Command for TwoLines {
        fn execute(
            &self,
            _argv: &[String],
            _env: &mut Environment,
            sink: &mut dyn OutputSink,
        ) -> Result<()> {
            sink.write_line("first");
            sink.write_line("second");
            Ok(())
        }
    }

    /// Test command that writes one line, then fails.
    struct FailAfterOne;

    impl Command for FailAfterOne {
        fn execute(
            &self,
            _argv: &[String],
            _env: &mut Environment,
            sink: &mut dyn OutputSink,
        ) -> Result<()> {
            sink.write_line("partial");
            Err(anyhow::anyhow!("boom"))
        }
    }

    fn descriptor(
        name: &'static str,
        aliases: &'static [&'static str],
        handler: Box<dyn Command>,
    ) -> Descriptor {
        Descriptor {
            name,
            description: "test command",
            aliases,
            handler,
        }
    }

    fn parsed(args: &[&str], target: Option<&str>) -> ParsedCommand {
        ParsedCommand {
            args: args.iter().map(|s| s.to_string()).collect(),
            output_target: target.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let mut registry = Registry::new();
        registry.register(descriptor("dir", &["ls"], Box::new(Tag("dir"))));
        assert!(registry.resolve("DIR").is_some());
        assert!(registry.resolve("Ls").is_some());
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_alias_collision_keeps_first_registration() {
        let mut registry = Registry::new();
        registry.register(descriptor("dir", &["ls"], Box::new(Tag("one"))));
        registry.register(descriptor("list", &["ls", "dir"], Box::new(Tag("two"))));

        // The colliding alias keys still point at the first descriptor.
        assert_eq!(registry.resolve("ls").unwrap().name, "dir");
        assert_eq!(registry.resolve("dir").unwrap().name, "dir");
        // The second descriptor stays reachable under its own name.
        assert_eq!(registry.resolve("list").unwrap().name, "list");
    }

    #[test]
    fn test_dispatch_unknown_command_reports_and_continues() {
        let registry = Registry::new();
        let mut env = Environment::new();
        let mut sink = MemorySink::new();
        registry.dispatch(&parsed(&["NoSuch"], None), &mut env, &mut sink);
        assert_eq!(
            sink.lines,
            vec![
                "Error: Unknown command: nosuch",
                "Warning: Type 'help' for available commands"
            ]
        );
    }

    #[test]
    fn test_dispatch_without_redirection_writes_to_terminal() {
        let mut registry = Registry::new();
        registry.register(descriptor("two", &[], Box::new(TwoLines)));
        let mut env = Environment::new();
        let mut sink = MemorySink::new();
        registry.dispatch(&parsed(&["two"], None), &mut env, &mut sink);
        assert_eq!(sink.lines, vec!["first", "second"]);
    }

    #[test]
    fn test_dispatch_with_redirection_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let target_str = target.to_string_lossy().into_owned();

        let mut registry = Registry::new();
        registry.register(descriptor("two", &[], Box::new(TwoLines)));
        let mut env = Environment::new();
        let mut sink = MemorySink::new();

        registry.dispatch(&parsed(&["two"], Some(&target_str)), &mut env, &mut sink);
        assert!(sink.lines.is_empty(), "redirected output reached terminal");
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "first\nsecond\n");

        // A second invocation appends rather than truncating.
        registry.dispatch(&parsed(&["two"], Some(&target_str)), &mut env, &mut sink);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "first\nsecond\nfirst\nsecond\n"
        );
    }

    #[test]
    fn test_dispatch_without_redirection_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");

        let mut registry = Registry::new();
        registry.register(descriptor("two", &[], Box::new(TwoLines)));
        let mut env = Environment::new();
        let mut sink = MemorySink::new();
        registry.dispatch(&parsed(&["two"], None), &mut env, &mut sink);

        assert!(!target.exists());
    }

    #[test]
    fn test_dispatch_reports_handler_failure() {
        let mut registry = Registry::new();
        registry.register(descriptor("fail", &[], Box::new(FailAfterOne)));
        let mut env = Environment::new();
        let mut sink = MemorySink::new();
        registry.dispatch(&parsed(&["fail"], None), &mut env, &mut sink);
        assert_eq!(sink.lines, vec!["partial", "Error: fail: boom"]);
    }

    #[test]
    fn test_handler_failure_still_flushes_capture() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let target_str = target.to_string_lossy().into_owned();

        let mut registry = Registry::new();
        registry.register(descriptor("fail", &[], Box::new(FailAfterOne)));
        let mut env = Environment::new();
        let mut sink = MemorySink::new();
        registry.dispatch(&parsed(&["fail"], Some(&target_str)), &mut env, &mut sink);

        // Partial output reached the file; the error reached the terminal.
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "partial\n");
        assert_eq!(sink.lines, vec!["Error: fail: boom"]);
    }

    #[test]
    fn test_dispatch_reports_unwritable_target() {
        let mut registry = Registry::new();
        registry.register(descriptor("two", &[], Box::new(TwoLines)));
        let mut env = Environment::new();
        let mut sink = MemorySink::new();
        registry.dispatch(
            &parsed(&["two"], Some("no/such/dir/out.txt")),
            &mut env,
            &mut sink,
        );
        assert_eq!(sink.lines.len(), 1);
        assert!(sink.lines[0].starts_with("Error: Cannot write to no/such/dir/out.txt"));
    }

    #[test]
    fn test_dispatch_empty_args_is_a_no_op() {
        let registry = Registry::new();
        let mut env = Environment::new();
        let mut sink = MemorySink::new();
        registry.dispatch(&parsed(&[], None), &mut env, &mut sink);
        assert!(sink.lines.is_empty());
    }

    #[test]
    fn test_interpret_dispatches_regular_commands() {
        let mut interpreter = Interpreter::default();
        let mut sink = MemorySink::new();
        assert!(interpreter.interpret("echo hello world", &mut sink));
        assert_eq!(sink.lines, vec!["hello world"]);
    }

    #[test]
    fn test_interpret_exit_and_quit_stop_the_loop() {
        let mut interpreter = Interpreter::default();
        let mut sink = MemorySink::new();
        assert!(!interpreter.interpret("exit", &mut sink));
        assert!(!interpreter.interpret("QUIT", &mut sink));
        assert!(sink.lines.is_empty());
    }

    #[test]
    fn test_interpret_version_is_intercepted() {
        let mut interpreter = Interpreter::default();
        let mut sink = MemorySink::new();
        assert!(interpreter.interpret("version", &mut sink));
        assert_eq!(sink.lines.len(), 1);
        assert!(sink.lines[0].contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_interpret_history_lists_prior_lines() {
        let mut interpreter = Interpreter::default();
        let mut sink = MemorySink::new();
        interpreter.interpret("echo one", &mut sink);
        sink.lines.clear();
        interpreter.interpret("history", &mut sink);
        assert_eq!(sink.lines.len(), 2);
        assert!(sink.lines[0].ends_with("echo one"));
        assert!(sink.lines[1].ends_with("history"));
    }

    #[test]
    fn test_interpret_help_lists_builtins_and_aliases() {
        let mut interpreter = Interpreter::default();
        let mut sink = MemorySink::new();
        interpreter.interpret("help", &mut sink);
        let joined = sink.lines.join("\n");
        assert!(joined.contains("dir/ls"));
        assert!(joined.contains("calc"));
        assert!(joined.contains("exit/quit"));
    }

    #[test]
    fn test_meta_match_is_on_first_word_only() {
        let mut interpreter = Interpreter::default();
        let mut sink = MemorySink::new();
        // "versions" is not a meta-command and falls through to dispatch.
        interpreter.interpret("versions", &mut sink);
        assert!(sink.lines[0].starts_with("Error: Unknown command"));
    }
}
