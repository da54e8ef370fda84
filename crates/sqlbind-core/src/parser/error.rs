//! Parser error type.

use core::fmt;

use crate::lexer::{Location, Token};
use crate::stream::ReadTimeout;

/// A parse failure: an unexpected token or end of input at a required
/// position. The parser stops at the first one; no recovery is
/// attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Location of the offending token, when there was one.
    pub location: Option<Location>,
}

impl ParseError {
    /// Creates an error with no particular location (for example, an
    /// unexpected end of input).
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Creates an "expected X, found Y" error anchored at `found`.
    #[must_use]
    pub fn unexpected(expected: &str, found: &Token) -> Self {
        Self {
            message: format!("expected {expected}, found {}", found.kind),
            location: Some(found.location),
        }
    }

    /// Creates an "expected X, found end of input" error.
    #[must_use]
    pub fn unexpected_eof(expected: &str) -> Self {
        Self::new(format!("expected {expected}, found end of input"))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "parse error at {location}: {}", self.message),
            None => write!(f, "parse error: {}", self.message),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ReadTimeout> for ParseError {
    fn from(err: ReadTimeout) -> Self {
        Self::new(err.to_string())
    }
}
