//! Query batches: the per-file unit handed to the emitter.

use crate::ast::{Parameter, Statement};
use crate::error::Result;
use crate::model::Model;
use crate::parser::parse;
use crate::shape::{shape, Shape};

/// Everything the generator needs to know about one query file.
#[derive(Debug, Clone)]
pub struct QueryBatch {
    /// Batch name, derived from the file stem.
    pub name: String,
    /// The raw SQL of the whole file.
    pub sql: String,
    /// Parsed statements, in order.
    pub statements: Vec<Statement>,
    /// One shape per statement.
    pub shapes: Vec<Shape>,
    /// Distinct parameters across all statements, in first-encountered
    /// order.
    pub parameters: Vec<Parameter>,
}

/// Parses one query file's SQL and computes the shape of every
/// statement in it.
///
/// # Errors
///
/// Propagates lex, parse, and shape errors; any failure is fatal for
/// the whole file.
pub fn batch_from_query(name: &str, sql: &str, model: &Model) -> Result<QueryBatch> {
    let program = parse(sql)?;

    let mut shapes = Vec::with_capacity(program.statements.len());
    for statement in &program.statements {
        shapes.push(shape(statement, model)?);
    }

    Ok(QueryBatch {
        name: name.to_string(),
        sql: sql.to_string(),
        statements: program.statements,
        shapes,
        parameters: program.parameters,
    })
}
