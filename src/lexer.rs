//! Lexical analysis of raw input lines.

/// Split a raw input line into argument tokens, honoring quoting.
///
/// Whitespace outside quotes separates tokens; runs of whitespace produce no
/// empty tokens. A `"` or `'` opens a quoted region closed by the same
/// character; the delimiter itself is consumed, and the other quote
/// character is passed through as literal text. A quote left open at the end
/// of the input is treated as if it were closed there.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                c => current.push(c),
            },
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
