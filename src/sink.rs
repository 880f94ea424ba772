//! User-facing output: styled console writing and capture-to-buffer.

use console::style;

/// Destination for all user-facing text produced by commands.
///
/// Handlers never print directly; they write through a sink, which either
/// emits to the terminal or, while a capture is active, accumulates plain
/// text in a single-slot buffer for redirection to a file. Styling is the
/// sink's concern — callers pass unstyled text.
pub trait OutputSink {
    /// Write one plain line.
    fn write_line(&mut self, text: &str);

    /// Write an informational line.
    fn info(&mut self, text: &str) {
        self.write_line(text);
    }

    /// Write a success line.
    fn success(&mut self, text: &str) {
        self.write_line(&format!("\u{2713} {text}"));
    }

    /// Write a warning line.
    fn warn(&mut self, text: &str) {
        self.write_line(&format!("Warning: {text}"));
    }

    /// Write an error line.
    fn error(&mut self, text: &str) {
        self.write_line(&format!("Error: {text}"));
    }

    /// Begin capturing output into a fresh buffer, replacing any stale one.
    fn start_capture(&mut self);

    /// Stop capturing and return the accumulated text.
    fn stop_capture(&mut self) -> String;
}

/// Sink that writes styled lines to the terminal.
pub struct ConsoleSink {
    capture: Option<String>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { capture: None }
    }

    /// Route a line to the capture buffer (plain) or the terminal (styled).
    fn emit(&mut self, plain: &str, styled: String) {
        match self.capture.as_mut() {
            Some(buffer) => {
                buffer.push_str(plain);
                buffer.push('\n');
            }
            None => println!("{styled}"),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for ConsoleSink {
    fn write_line(&mut self, text: &str) {
        self.emit(text, text.to_string());
    }

    fn info(&mut self, text: &str) {
        self.emit(text, style(text).green().to_string());
    }

    fn success(&mut self, text: &str) {
        let line = format!("\u{2713} {text}");
        let styled = style(&line).green().to_string();
        self.emit(&line, styled);
    }

    fn warn(&mut self, text: &str) {
        let line = format!("Warning: {text}");
        let styled = style(&line).yellow().to_string();
        self.emit(&line, styled);
    }

    fn error(&mut self, text: &str) {
        let line = format!("Error: {text}");
        let styled = style(&line).red().to_string();
        self.emit(&line, styled);
    }

    fn start_capture(&mut self) {
        self.capture = Some(String::new());
    }

    fn stop_capture(&mut self) -> String {
        self.capture.take().unwrap_or_default()
    }
}

/// Memory-backed sink that records every emitted line.
///
/// Used by tests and by embedders that want to collect command output
/// without a terminal. Capture semantics match [`ConsoleSink`]: while a
/// capture is active, lines go to the buffer instead of `lines`.
pub struct MemorySink {
    pub lines: Vec<String>,
    capture: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            capture: None,
        }
    }

    fn emit(&mut self, line: String) {
        match self.capture.as_mut() {
            Some(buffer) => {
                buffer.push_str(&line);
                buffer.push('\n');
            }
            None => self.lines.push(line),
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for MemorySink {
    fn write_line(&mut self, text: &str) {
        self.emit(text.to_string());
    }

    fn info(&mut self, text: &str) {
        self.emit(text.to_string());
    }

    fn success(&mut self, text: &str) {
        self.emit(format!("\u{2713} {text}"));
    }

    fn warn(&mut self, text: &str) {
        self.emit(format!("Warning: {text}"));
    }

    fn error(&mut self, text: &str) {
        self.emit(format!("Error: {text}"));
    }

    fn start_capture(&mut self) {
        self.capture = Some(String::new());
    }

    fn stop_capture(&mut self) -> String {
        self.capture.take().unwrap_or_default()
    }
}
