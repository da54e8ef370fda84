//! Error types for the generator CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Failures from directory loading, code emission, or migration
/// execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// The migrations directory does not exist.
    #[error("migrations directory not found: {}", .0.display())]
    MigrationsDirNotFound(PathBuf),

    /// The queries directory does not exist.
    #[error("queries directory not found: {}", .0.display())]
    QueriesDirNotFound(PathBuf),

    /// A file failed analysis; the path says which one.
    #[error("in {}: {source}", path.display())]
    Analysis {
        /// The offending file.
        path: PathBuf,
        /// The underlying core error.
        #[source]
        source: sqlbind_core::Error,
    },

    /// A core failure outside any particular file.
    #[error(transparent)]
    Core(#[from] sqlbind_core::Error),

    /// A parameter never compared or assigned to a typed column.
    #[error("cannot infer a SQL type for parameter '${0}'")]
    UntypedParameter(String),

    /// Database error during migration execution.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error reading inputs or writing the generated file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
