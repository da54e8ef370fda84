//! The `sqlbind` tool around the analysis core: directory loading,
//! bindings emission, and migration execution.
//!
//! The core (`sqlbind-core`) never touches the filesystem or a
//! database; everything that does lives here.

pub mod codegen;
pub mod error;
pub mod executor;
pub mod loader;
pub mod render;

pub use error::{CliError, Result};
