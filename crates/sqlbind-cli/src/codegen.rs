//! Emits the generated bindings source: one row struct per query
//! shape and one async client method per statement, executing over a
//! `sqlx` PostgreSQL pool.

use std::collections::BTreeMap;
use std::fmt::Write;

use sqlbind_core::ast::{
    ColumnDefinition, ColumnRef, Condition, DataType, Expr, Select, Statement, TableTarget,
};
use sqlbind_core::model::Table;
use sqlbind_core::shape::Cardinality;
use sqlbind_core::{Model, QueryBatch};

use crate::error::{CliError, Result};
use crate::render;

/// Generates the complete bindings source file for the given batches.
///
/// # Errors
///
/// Fails when a parameter's SQL type cannot be inferred from the
/// column it is compared or assigned to.
pub fn generate(batches: &[QueryBatch], model: &Model) -> Result<String> {
    let mut structs = String::new();
    let mut methods = String::new();
    let mut needs_row_trait = false;

    for batch in batches {
        let numbered = batch.statements.len() > 1;
        for (index, (statement, shape)) in
            batch.statements.iter().zip(&batch.shapes).enumerate()
        {
            let method_name = if numbered {
                format!("{}_{}", snake_case(&batch.name), index + 1)
            } else {
                snake_case(&batch.name)
            };
            let struct_name = if numbered {
                format!("{}Row{}", pascal_case(&batch.name), index + 1)
            } else {
                format!("{}Row", pascal_case(&batch.name))
            };

            let params = statement_parameters(statement);
            let types = parameter_types(statement, model);
            let mut args = Vec::with_capacity(params.len());
            for name in &params {
                let Some(data_type) = types.get(name) else {
                    return Err(CliError::UntypedParameter(name.clone()));
                };
                args.push((snake_case(name), param_rust_type(*data_type)));
            }

            let sql = match statement {
                Statement::Select(select) => render::render_select(select, &params),
                Statement::Insert(insert) => render::render_insert(insert, &params),
                // Shape analysis admits only SELECT and INSERT into batches.
                _ => continue,
            };

            match shape.cardinality {
                Cardinality::Command => {
                    emit_command_method(&mut methods, &batch.name, &method_name, &sql, &args);
                }
                Cardinality::OneRow => {
                    needs_row_trait = true;
                    emit_row_struct(&mut structs, &struct_name, &shape.columns);
                    emit_fetch_method(
                        &mut methods,
                        &batch.name,
                        &method_name,
                        &struct_name,
                        &sql,
                        &args,
                        &shape.columns,
                        true,
                    );
                }
                Cardinality::ManyRows => {
                    needs_row_trait = true;
                    emit_row_struct(&mut structs, &struct_name, &shape.columns);
                    emit_fetch_method(
                        &mut methods,
                        &batch.name,
                        &method_name,
                        &struct_name,
                        &sql,
                        &args,
                        &shape.columns,
                        false,
                    );
                }
            }
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "// Generated by sqlbind. Do not edit by hand.");
    let _ = writeln!(out);
    let _ = writeln!(out, "use sqlx::postgres::PgPool;");
    if needs_row_trait {
        let _ = writeln!(out, "use sqlx::Row;");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "/// A typed client over the generated queries.");
    let _ = writeln!(out, "#[derive(Debug, Clone)]");
    let _ = writeln!(out, "pub struct Client {{");
    let _ = writeln!(out, "    pool: PgPool,");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "impl Client {{");
    let _ = writeln!(out, "    /// Wraps an existing connection pool.");
    let _ = writeln!(out, "    pub fn new(pool: PgPool) -> Self {{");
    let _ = writeln!(out, "        Self {{ pool }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    /// Connects to the database and wraps the new pool.");
    let _ = writeln!(
        out,
        "    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {{"
    );
    let _ = writeln!(out, "        Ok(Self {{");
    let _ = writeln!(out, "            pool: PgPool::connect(url).await?,");
    let _ = writeln!(out, "        }})");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    out.push_str(&structs);
    let _ = writeln!(out);
    let _ = writeln!(out, "impl Client {{");
    out.push_str(&methods);
    let _ = writeln!(out, "}}");
    Ok(out)
}

fn emit_row_struct(out: &mut String, name: &str, columns: &[ColumnDefinition]) {
    let _ = writeln!(out);
    let _ = writeln!(out, "/// One row of `{name}` results.");
    let _ = writeln!(out, "#[derive(Debug, Clone)]");
    let _ = writeln!(out, "pub struct {name} {{");
    for column in columns {
        let _ = writeln!(
            out,
            "    pub {}: {},",
            snake_case(&column.name),
            row_rust_type(column)
        );
    }
    let _ = writeln!(out, "}}");
}

#[allow(clippy::too_many_arguments)]
fn emit_fetch_method(
    out: &mut String,
    batch_name: &str,
    method_name: &str,
    struct_name: &str,
    sql: &str,
    args: &[(String, &'static str)],
    columns: &[ColumnDefinition],
    one_row: bool,
) {
    let arg_list = render_arg_list(args);
    let binds = render_binds(args);
    let sql_lit = rust_string_literal(sql);

    let _ = writeln!(out);
    let _ = writeln!(out, "    /// Runs the query from `{batch_name}.sql`.");
    if one_row {
        let _ = writeln!(
            out,
            "    pub async fn {method_name}(&self{arg_list}) -> Result<Option<{struct_name}>, sqlx::Error> {{"
        );
        let _ = writeln!(out, "        let row = sqlx::query({sql_lit}){binds}");
        let _ = writeln!(out, "            .fetch_optional(&self.pool)");
        let _ = writeln!(out, "            .await?;");
        let _ = writeln!(out, "        row.map(|row| {{");
        let _ = writeln!(out, "            Ok({struct_name} {{");
        for (index, column) in columns.iter().enumerate() {
            let _ = writeln!(
                out,
                "                {}: row.try_get({index})?,",
                snake_case(&column.name)
            );
        }
        let _ = writeln!(out, "            }})");
        let _ = writeln!(out, "        }})");
        let _ = writeln!(out, "        .transpose()");
    } else {
        let _ = writeln!(
            out,
            "    pub async fn {method_name}(&self{arg_list}) -> Result<Vec<{struct_name}>, sqlx::Error> {{"
        );
        let _ = writeln!(out, "        let rows = sqlx::query({sql_lit}){binds}");
        let _ = writeln!(out, "            .fetch_all(&self.pool)");
        let _ = writeln!(out, "            .await?;");
        let _ = writeln!(out, "        rows.into_iter()");
        let _ = writeln!(out, "            .map(|row| {{");
        let _ = writeln!(out, "                Ok({struct_name} {{");
        for (index, column) in columns.iter().enumerate() {
            let _ = writeln!(
                out,
                "                    {}: row.try_get({index})?,",
                snake_case(&column.name)
            );
        }
        let _ = writeln!(out, "                }})");
        let _ = writeln!(out, "            }})");
        let _ = writeln!(out, "            .collect()");
    }
    let _ = writeln!(out, "    }}");
}

fn emit_command_method(
    out: &mut String,
    batch_name: &str,
    method_name: &str,
    sql: &str,
    args: &[(String, &'static str)],
) {
    let arg_list = render_arg_list(args);
    let binds = render_binds(args);
    let sql_lit = rust_string_literal(sql);

    let _ = writeln!(out);
    let _ = writeln!(out, "    /// Runs the command from `{batch_name}.sql`.");
    let _ = writeln!(
        out,
        "    pub async fn {method_name}(&self{arg_list}) -> Result<u64, sqlx::Error> {{"
    );
    let _ = writeln!(out, "        let result = sqlx::query({sql_lit}){binds}");
    let _ = writeln!(out, "            .execute(&self.pool)");
    let _ = writeln!(out, "            .await?;");
    let _ = writeln!(out, "        Ok(result.rows_affected())");
    let _ = writeln!(out, "    }}");
}

fn render_arg_list(args: &[(String, &'static str)]) -> String {
    let mut out = String::new();
    for (name, rust_type) in args {
        let _ = write!(out, ", {name}: {rust_type}");
    }
    out
}

fn render_binds(args: &[(String, &'static str)]) -> String {
    let mut out = String::new();
    for (name, _) in args {
        let _ = write!(out, "\n            .bind({name})");
    }
    out
}

// ----- parameter discovery ------------------------------------------------

/// The parameters of one statement, in the order they first appear in
/// the rendered SQL. This order defines the positional placeholders.
fn statement_parameters(statement: &Statement) -> Vec<String> {
    let mut params = Vec::new();
    match statement {
        Statement::Select(select) => walk_select(select, &mut params),
        Statement::Insert(insert) => {
            for value in &insert.values {
                walk_expr(value, &mut params);
            }
        }
        _ => {}
    }
    params
}

fn walk_select(select: &Select, params: &mut Vec<String>) {
    for field in &select.fields {
        walk_expr(&field.expr, params);
    }
    walk_target(&select.from, params);
    for join in &select.joins {
        walk_target(&join.target, params);
        if let Some(on) = &join.on {
            walk_condition(on, params);
        }
    }
    if let Some(cond) = &select.where_clause {
        walk_condition(cond, params);
    }
    if let Some(cond) = &select.having {
        walk_condition(cond, params);
    }
    for entry in &select.order_by {
        walk_expr(&entry.expr, params);
    }
}

fn walk_target(target: &TableTarget, params: &mut Vec<String>) {
    if let TableTarget::Subquery { query, .. } = target {
        walk_select(query, params);
    }
}

fn walk_condition(cond: &Condition, params: &mut Vec<String>) {
    match cond {
        Condition::Compare { left, right, .. } => {
            walk_expr(left, params);
            walk_expr(right, params);
        }
        Condition::Logical { left, right, .. } => {
            walk_condition(left, params);
            walk_condition(right, params);
        }
    }
}

fn walk_expr(expr: &Expr, params: &mut Vec<String>) {
    match expr {
        Expr::Parameter { name } => {
            if !params.iter().any(|p| p == name) {
                params.push(name.clone());
            }
        }
        Expr::Function { args, .. } => {
            for arg in args {
                walk_expr(arg, params);
            }
        }
        Expr::Binary { left, right, .. } => {
            walk_expr(left, params);
            walk_expr(right, params);
        }
        Expr::Unary { operand, .. } => walk_expr(operand, params),
        Expr::Column(_) | Expr::StringLit(_) | Expr::NumberLit(_) => {}
    }
}

// ----- parameter typing ---------------------------------------------------

/// Maps parameters to the SQL type of a column they are compared or
/// assigned to.
fn parameter_types(statement: &Statement, model: &Model) -> BTreeMap<String, DataType> {
    let mut types = BTreeMap::new();
    match statement {
        Statement::Select(select) => collect_select_types(select, model, &mut types),
        Statement::Insert(insert) => {
            let TableTarget::Table { name, .. } = &insert.target else {
                return types;
            };
            let Some(table) = model.table(name) else {
                return types;
            };
            for (column, value) in insert.columns.iter().zip(&insert.values) {
                if let Expr::Parameter { name: param } = value {
                    if let Some(def) = table.column(&column.name) {
                        types.entry(param.clone()).or_insert(def.data_type);
                    }
                }
            }
        }
        _ => {}
    }
    types
}

fn collect_select_types(
    select: &Select,
    model: &Model,
    types: &mut BTreeMap<String, DataType>,
) {
    let mut scope: Vec<(&str, &Table)> = Vec::new();
    let targets = std::iter::once(&select.from).chain(select.joins.iter().map(|j| &j.target));
    for target in targets {
        match target {
            TableTarget::Table { name, alias } => {
                if let Some(table) = model.table(name) {
                    scope.push((alias.as_deref().unwrap_or(name), table));
                }
            }
            TableTarget::Subquery { query, .. } => collect_select_types(query, model, types),
        }
    }

    let mut conditions = Vec::new();
    if let Some(cond) = &select.where_clause {
        conditions.push(cond);
    }
    if let Some(cond) = &select.having {
        conditions.push(cond);
    }
    for join in &select.joins {
        if let Some(cond) = &join.on {
            conditions.push(cond);
        }
    }
    for cond in conditions {
        collect_condition_types(cond, &scope, types);
    }
}

fn collect_condition_types(
    cond: &Condition,
    scope: &[(&str, &Table)],
    types: &mut BTreeMap<String, DataType>,
) {
    match cond {
        Condition::Compare { left, right, .. } => {
            type_from_pair(left, right, scope, types);
            type_from_pair(right, left, scope, types);
        }
        Condition::Logical { left, right, .. } => {
            collect_condition_types(left, scope, types);
            collect_condition_types(right, scope, types);
        }
    }
}

fn type_from_pair(
    param_side: &Expr,
    column_side: &Expr,
    scope: &[(&str, &Table)],
    types: &mut BTreeMap<String, DataType>,
) {
    let Expr::Parameter { name } = param_side else {
        return;
    };
    let Expr::Column(col) = column_side else {
        return;
    };
    if let Some(data_type) = column_type(col, scope) {
        types.entry(name.clone()).or_insert(data_type);
    }
}

fn column_type(col: &ColumnRef, scope: &[(&str, &Table)]) -> Option<DataType> {
    match &col.table {
        Some(key) => scope
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, table)| table.column(&col.name))
            .map(|c| c.data_type),
        None => scope
            .iter()
            .find_map(|(_, table)| table.column(&col.name))
            .map(|c| c.data_type),
    }
}

// ----- type mapping and case conversion -----------------------------------

const fn base_rust_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::SmallInt => "i16",
        DataType::Integer | DataType::Serial => "i32",
        DataType::BigInt | DataType::BigSerial => "i64",
        DataType::Real => "f32",
        DataType::Decimal | DataType::Numeric => "sqlx::types::BigDecimal",
        DataType::Char | DataType::VarChar | DataType::Text => "String",
        DataType::Boolean => "bool",
        DataType::Date => "chrono::NaiveDate",
        DataType::Timestamp => "chrono::NaiveDateTime",
        DataType::TimestampTz => "chrono::DateTime<chrono::Utc>",
        DataType::Uuid => "uuid::Uuid",
        DataType::Json | DataType::Jsonb => "serde_json::Value",
    }
}

/// The Rust type a row field decodes to. Nullable columns wrap in
/// `Option`.
fn row_rust_type(column: &ColumnDefinition) -> String {
    let base = base_rust_type(column.data_type);
    if column.nullable {
        format!("Option<{base}>")
    } else {
        base.to_string()
    }
}

/// The Rust type a method accepts for a parameter. Text-like values
/// are borrowed.
const fn param_rust_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Char | DataType::VarChar | DataType::Text => "&str",
        DataType::Json | DataType::Jsonb => "&serde_json::Value",
        DataType::Decimal | DataType::Numeric => "&sqlx::types::BigDecimal",
        other => base_rust_type(other),
    }
}

fn pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize = true;
    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            capitalize = true;
        } else if capitalize {
            out.extend(c.to_uppercase());
            capitalize = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

fn rust_string_literal(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
