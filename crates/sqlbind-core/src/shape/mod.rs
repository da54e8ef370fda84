//! Result-shape inference: the ordered output columns and cardinality
//! class of each query.

mod cardinality;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::ast::{ColumnDefinition, ColumnRef, DataType, Expr, Field, Select, Statement, TableTarget};
use crate::model::Model;

/// The coarse count-class of a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Zero or more rows.
    ManyRows,
    /// At most one row.
    OneRow,
    /// No rows at all (e.g. a plain `INSERT`).
    Command,
}

/// The ordered output columns and cardinality of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    /// Output columns in the left-to-right order of the field list.
    pub columns: Vec<ColumnDefinition>,
    /// How many rows the statement can produce.
    pub cardinality: Cardinality,
}

/// A query that cannot be typed against the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// A `FROM` or join target names a table the model does not have.
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    /// Two sources resolve to the same alias or table key.
    #[error("duplicate table or alias '{0}'")]
    DuplicateKey(String),
    /// A qualified column names an alias that is not in scope.
    #[error("no table or alias '{0}' in scope")]
    UnknownKey(String),
    /// A qualified column does not exist on its source.
    #[error("column '{column}' not found on '{table}'")]
    UnknownQualifiedColumn {
        /// The alias or table key.
        table: String,
        /// The missing column.
        column: String,
    },
    /// An unqualified column matches no source.
    #[error("column '{0}' not found in any source")]
    UnknownColumn(String),
    /// An unqualified column matches more than one source.
    #[error("ambiguous column '{0}'")]
    AmbiguousColumn(String),
    /// A function without a registered return type.
    #[error("function '{0}' is not supported")]
    UnknownFunction(String),
    /// An output expression the subset cannot type.
    #[error("expression cannot be typed as an output column")]
    UnsupportedExpression,
    /// Only `SELECT` and `INSERT` have shapes.
    #[error("only SELECT and INSERT statements have a result shape")]
    UnsupportedStatement,
}

/// The columns each source contributes, keyed by alias or table name.
type AvailableColumns = BTreeMap<String, Vec<ColumnDefinition>>;

/// Computes the shape of one statement against the model.
///
/// # Errors
///
/// Returns a [`ShapeError`] when the statement references unknown
/// tables, columns, or functions, or is not a shape-bearing statement.
pub fn shape(statement: &Statement, model: &Model) -> Result<Shape, ShapeError> {
    match statement {
        Statement::Select(select) => select_shape(select, model),
        // Without RETURNING (not in the dialect) an INSERT yields no rows.
        Statement::Insert(_) => Ok(Shape {
            columns: Vec::new(),
            cardinality: Cardinality::Command,
        }),
        _ => Err(ShapeError::UnsupportedStatement),
    }
}

fn select_shape(query: &Select, model: &Model) -> Result<Shape, ShapeError> {
    let available = available_columns(query, model)?;

    let mut columns = Vec::with_capacity(query.fields.len());
    for field in &query.fields {
        columns.push(field_column(field, &available)?);
    }

    let cardinality = cardinality::select_cardinality(query, model, &available)?;

    Ok(Shape {
        columns,
        cardinality,
    })
}

/// Builds the map from source key (alias or table name) to that
/// source's columns, visiting the `FROM` target and every join target.
fn available_columns(query: &Select, model: &Model) -> Result<AvailableColumns, ShapeError> {
    let mut available = AvailableColumns::new();
    add_target(&mut available, model, &query.from)?;
    for join in &query.joins {
        add_target(&mut available, model, &join.target)?;
    }
    Ok(available)
}

fn add_target(
    available: &mut AvailableColumns,
    model: &Model,
    target: &TableTarget,
) -> Result<(), ShapeError> {
    let key = target.key().to_string();
    if available.contains_key(&key) {
        return Err(ShapeError::DuplicateKey(key));
    }
    let columns = match target {
        TableTarget::Table { name, .. } => model
            .table(name)
            .ok_or_else(|| ShapeError::UnknownTable(name.clone()))?
            .columns
            .clone(),
        TableTarget::Subquery { query, .. } => select_shape(query, model)?.columns,
    };
    available.insert(key, columns);
    Ok(())
}

/// Resolves one output field to a column definition, applying its
/// alias as the output name.
fn field_column(field: &Field, available: &AvailableColumns) -> Result<ColumnDefinition, ShapeError> {
    let mut column = match &field.expr {
        Expr::Column(col) => find_column(col, available)?,
        Expr::Function { name, .. } => function_return_type(name)?,
        _ => return Err(ShapeError::UnsupportedExpression),
    };
    if let Some(alias) = &field.alias {
        alias.clone_into(&mut column.name);
    }
    Ok(column)
}

fn find_column(
    col: &ColumnRef,
    available: &AvailableColumns,
) -> Result<ColumnDefinition, ShapeError> {
    match &col.table {
        Some(table) => {
            let defs = available
                .get(table)
                .ok_or_else(|| ShapeError::UnknownKey(table.clone()))?;
            defs.iter()
                .find(|d| d.name == col.name)
                .cloned()
                .ok_or_else(|| ShapeError::UnknownQualifiedColumn {
                    table: table.clone(),
                    column: col.name.clone(),
                })
        }
        None => {
            let mut found: Option<&ColumnDefinition> = None;
            for defs in available.values() {
                for def in defs {
                    if def.name == col.name {
                        if found.is_some() {
                            return Err(ShapeError::AmbiguousColumn(col.name.clone()));
                        }
                        found = Some(def);
                    }
                }
            }
            found
                .cloned()
                .ok_or_else(|| ShapeError::UnknownColumn(col.name.clone()))
        }
    }
}

/// The function return-type registry. Deliberately small; grows with
/// the dialect.
fn function_return_type(name: &str) -> Result<ColumnDefinition, ShapeError> {
    let data_type = match name.to_ascii_uppercase().as_str() {
        "COUNT" => DataType::BigInt,
        "NOW" => DataType::TimestampTz,
        _ => return Err(ShapeError::UnknownFunction(name.to_string())),
    };
    let mut column = ColumnDefinition::new(name.to_ascii_lowercase(), data_type);
    column.nullable = false;
    Ok(column)
}
