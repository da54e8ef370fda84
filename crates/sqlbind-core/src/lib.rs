//! # sqlbind-core
//!
//! The static SQL analysis core behind the `sqlbind` binding
//! generator. Given the ordered up-SQL of a migration directory and
//! the text of parameterized query files, it answers the one question
//! the code emitter needs: *what comes out of each query?*
//!
//! The pipeline is `sql text → tokens → AST → (model | shape)`:
//!
//! - [`lexer`] — a hand-written scanner for a PostgreSQL-flavored
//!   dialect, tracking 1-origin line/column per token;
//! - [`stream`] — a bounded token buffer with one-token lookahead; the
//!   lexer produces on its own thread and the parser consumes;
//! - [`parser`] — recursive descent to a typed AST with
//!   precedence-correct expression trees and de-duplicated `$name`
//!   parameters;
//! - [`model`] — a catalog built by folding DDL statements in
//!   migration order;
//! - [`shape`] — per-statement output columns and a cardinality class
//!   (`many-rows`, `one-row`, or `command`), including a
//!   constraint-propagation analysis that proves single-row results
//!   from unique constraints, join equalities, and `WHERE`/`ON`
//!   predicates.
//!
//! Reading directories, emitting generated source, and executing
//! migrations live in the `sqlbind` CLI crate; this crate never
//! touches the filesystem or a database.
//!
//! ## Example
//!
//! ```
//! use sqlbind_core::shape::Cardinality;
//! use sqlbind_core::{batch_from_query, model_from_migrations, Migration};
//!
//! let migrations = vec![Migration {
//!     name: "0001_create_users".into(),
//!     up_sql: "CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(200) NOT NULL)".into(),
//!     down_sql: String::new(),
//! }];
//! let model = model_from_migrations(&migrations)?;
//!
//! let batch = batch_from_query(
//!     "get_user",
//!     "SELECT id, email FROM users WHERE id = $user_id",
//!     &model,
//! )?;
//!
//! assert_eq!(batch.shapes[0].cardinality, Cardinality::OneRow);
//! assert_eq!(batch.shapes[0].columns[1].name, "email");
//! assert_eq!(batch.parameters[0].name, "user_id");
//! # Ok::<(), sqlbind_core::Error>(())
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod migration;
pub mod model;
pub mod parser;
pub mod query;
pub mod shape;
pub mod stream;

pub use ast::{Program, Parameter};
pub use error::{Error, Result};
pub use migration::Migration;
pub use model::{model_from_migrations, Model, ModelBuilder, ModelError, Table};
pub use parser::{parse, ParseError};
pub use query::{batch_from_query, QueryBatch};
pub use shape::{shape, Cardinality, Shape, ShapeError};
