//! Splitting a raw input line into a command and an optional `>>` target.

use crate::lexer::tokenize;

/// A tokenized command line with an optional append-redirection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The argument vector; element 0 is the command name.
    pub args: Vec<String>,
    /// Path the command's output should be appended to, if `>>` was present.
    pub output_target: Option<String>,
}

/// Split an input line at the first unquoted `>>` marker.
///
/// The text before the marker is tokenized as the command; the trimmed text
/// after it becomes the target path. A `>>` inside quotes is literal, as is
/// a trailing `>>` with nothing after it — in both cases the whole line is
/// tokenized verbatim with no target. Only the first marker is significant;
/// any later `>>` belongs to the path.
pub fn split_redirection(input: &str) -> ParsedCommand {
    let mut quote: Option<char> = None;
    let mut marker = None;
    let mut chars = input.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '>' if matches!(chars.peek(), Some((_, '>'))) => {
                    marker = Some(i);
                    break;
                }
                _ => {}
            },
        }
    }

    let Some(pos) = marker else {
        return ParsedCommand {
            args: tokenize(input),
            output_target: None,
        };
    };

    let command_part = input[..pos].trim();
    let file_part = input[pos + 2..].trim();

    if file_part.is_empty() {
        // ">>" with no path after it is literal text, not a redirection.
        return ParsedCommand {
            args: tokenize(input),
            output_target: None,
        };
    }

    ParsedCommand {
        args: tokenize(command_part),
        output_target: Some(file_part.to_string()),
    }
}
