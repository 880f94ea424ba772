//! Arithmetic expression evaluation for the `calc` builtin.
//!
//! Grammar, with left-associative binary operators and right-associative
//! unary sign:
//!
//! ```text
//! Expr   := Term (('+' | '-') Term)*
//! Term   := Factor (('*' | '/') Factor)*
//! Factor := '+' Factor | '-' Factor | '(' Expr ')' | NUMBER
//! ```

use thiserror::Error;

/// Errors produced while parsing or evaluating an expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A token that is neither an operator nor a valid numeric literal.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The divisor evaluated to exactly zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// A `(` was never matched by a `)`.
    #[error("Missing closing parenthesis")]
    MissingClosingParen,

    /// The input ended where a factor was expected.
    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    /// A complete expression was parsed but input remained.
    #[error("Unexpected token after expression: {0}")]
    TrailingToken(String),
}

/// Parse and evaluate an arithmetic expression in one pass.
///
/// The whole input must be consumed; anything left over after a complete
/// expression (e.g. the `(` in `2 (3+4)`) is an error.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let mut parser = Parser {
        tokens: scan(expression),
        pos: 0,
    };
    let value = parser.parse_expr()?;
    match parser.peek() {
        Some(extra) => Err(EvalError::TrailingToken(extra.to_string())),
        None => Ok(value),
    }
}

/// Split an expression into operator, parenthesis, and literal tokens.
///
/// This is independent of the command-line tokenizer: it splits on
/// whitespace and the single-character operators, and any other run of
/// characters becomes a numeric-literal candidate.
fn scan(expression: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in expression.chars() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else if "+-*/()".contains(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(ch.to_string());
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn consume(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.parse_term()?;
        while let Some(op) = self.peek() {
            match op {
                "+" => {
                    self.pos += 1;
                    value += self.parse_term()?;
                }
                "-" => {
                    self.pos += 1;
                    value -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.parse_factor()?;
        while let Some(op) = self.peek() {
            match op {
                "*" => {
                    self.pos += 1;
                    value *= self.parse_factor()?;
                }
                "/" => {
                    self.pos += 1;
                    let divisor = self.parse_factor()?;
                    if divisor == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_factor(&mut self) -> Result<f64, EvalError> {
        let token = self.consume().ok_or(EvalError::UnexpectedEnd)?;
        match token.as_str() {
            "+" => self.parse_factor(),
            "-" => Ok(-self.parse_factor()?),
            "(" => {
                let value = self.parse_expr()?;
                match self.consume() {
                    Some(t) if t == ")" => Ok(value),
                    _ => Err(EvalError::MissingClosingParen),
                }
            }
            _ => token
                .parse::<f64>()
                .map_err(|_| EvalError::InvalidToken(token)),
        }
    }
}
