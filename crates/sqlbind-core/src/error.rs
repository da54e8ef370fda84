//! The crate-level error type.
//!
//! Each pipeline stage has its own error family; this enum unifies
//! them for the exported entry points. Every error is fatal for its
//! containing unit and propagates to the caller unchanged.

use thiserror::Error;

use crate::lexer::LexError;
use crate::model::ModelError;
use crate::parser::ParseError;
use crate::shape::ShapeError;

/// Any failure from the analysis core.
#[derive(Debug, Error)]
pub enum Error {
    /// The lexer hit an unrecoverable condition.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// The parser hit an unexpected token or end of input.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A DDL statement violated a catalog invariant.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// A query could not be typed against the model.
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// An I/O failure from a collaborator, passed through unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
