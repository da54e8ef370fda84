//! Hand-written lexer for the PostgreSQL-flavored SQL dialect.
//!
//! The lexer turns a UTF-8 SQL string into a stream of [`Token`]s, each
//! carrying the 1-origin line/column of its first character. It does not
//! know about keywords: `SELECT` and `users` both come out as
//! [`TokenKind::Word`], and keyword recognition happens in the parser.

mod location;
mod token;
mod tokenizer;

pub use location::Location;
pub use token::{Token, TokenKind};
pub use tokenizer::{lex, tokenize, Lexer};

use thiserror::Error;

/// An unrecoverable scanning failure: unterminated string or quoted
/// identifier, malformed number, or a bare `$`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lex error at {location}: {message}")]
pub struct LexError {
    /// Where the lexer was when it gave up.
    pub location: Location,
    /// What the lexer was looking for.
    pub message: String,
}

impl LexError {
    /// Creates a new lex error.
    #[must_use]
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}
