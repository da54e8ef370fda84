//! Renders analyzed statements back to PostgreSQL text.
//!
//! The emitter does not reuse the raw query file text because the
//! wire protocol wants positional placeholders: every `$name`
//! parameter is rewritten to `$N`, numbered by the parameter's index
//! in the statement's own first-appearance order. Binary expressions
//! and logical conditions are parenthesized, which keeps the rendered
//! text faithful to the parsed tree without tracking precedence here.

use sqlbind_core::ast::{
    Condition, Expr, Insert, OrderDirection, Select, TableTarget,
};

/// Renders a `SELECT`, rewriting parameters positionally per `params`.
pub fn render_select(select: &Select, params: &[String]) -> String {
    let fields: Vec<String> = select
        .fields
        .iter()
        .map(|field| match &field.alias {
            Some(alias) => format!("{} AS {alias}", render_expr(&field.expr, params)),
            None => render_expr(&field.expr, params),
        })
        .collect();

    let mut sql = format!(
        "SELECT {} FROM {}",
        fields.join(", "),
        render_target(&select.from, params)
    );

    for join in &select.joins {
        sql.push_str(&format!(
            " {} {}",
            join.join_type.as_str(),
            render_target(&join.target, params)
        ));
        if let Some(on) = &join.on {
            sql.push_str(&format!(" ON {}", render_condition(on, params)));
        }
    }
    if let Some(where_clause) = &select.where_clause {
        sql.push_str(&format!(" WHERE {}", render_condition(where_clause, params)));
    }
    if let Some(having) = &select.having {
        sql.push_str(&format!(" HAVING {}", render_condition(having, params)));
    }
    if !select.order_by.is_empty() {
        let entries: Vec<String> = select
            .order_by
            .iter()
            .map(|entry| match entry.direction {
                OrderDirection::Asc => render_expr(&entry.expr, params),
                OrderDirection::Desc => {
                    format!("{} DESC", render_expr(&entry.expr, params))
                }
            })
            .collect();
        sql.push_str(&format!(" ORDER BY {}", entries.join(", ")));
    }
    if let Some(limit) = select.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    sql
}

/// Renders an `INSERT`, rewriting parameters positionally per
/// `params`. Column qualification added during parsing stays internal;
/// the emitted list uses bare column names.
pub fn render_insert(insert: &Insert, params: &[String]) -> String {
    let table = match &insert.target {
        TableTarget::Table { name, .. } => name.clone(),
        TableTarget::Subquery { alias, .. } => alias.clone(),
    };
    let columns: Vec<&str> = insert.columns.iter().map(|c| c.name.as_str()).collect();
    let values: Vec<String> = insert
        .values
        .iter()
        .map(|value| render_expr(value, params))
        .collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        values.join(", ")
    )
}

fn render_target(target: &TableTarget, params: &[String]) -> String {
    match target {
        TableTarget::Table { name, alias: None } => name.clone(),
        TableTarget::Table {
            name,
            alias: Some(alias),
        } => format!("{name} {alias}"),
        TableTarget::Subquery { query, alias } => {
            format!("({}) {alias}", render_select(query, params))
        }
    }
}

fn render_condition(cond: &Condition, params: &[String]) -> String {
    match cond {
        Condition::Compare { left, op, right } => format!(
            "{} {} {}",
            render_expr(left, params),
            op.as_str(),
            render_expr(right, params)
        ),
        Condition::Logical { left, op, right } => format!(
            "({} {} {})",
            render_condition(left, params),
            op.as_str(),
            render_condition(right, params)
        ),
    }
}

fn render_expr(expr: &Expr, params: &[String]) -> String {
    match expr {
        Expr::Column(col) => col.to_string(),
        Expr::Parameter { name } => match params.iter().position(|p| p == name) {
            Some(index) => format!("${}", index + 1),
            None => format!("${name}"),
        },
        Expr::Function { name, args } => {
            let args: Vec<String> = args.iter().map(|a| render_expr(a, params)).collect();
            format!("{name}({})", args.join(", "))
        }
        Expr::Binary { left, op, right } => format!(
            "({} {} {})",
            render_expr(left, params),
            op.as_str(),
            render_expr(right, params)
        ),
        Expr::Unary { op, operand } => {
            format!("{}{}", op.as_str(), render_expr(operand, params))
        }
        Expr::StringLit(value) => format!("'{value}'"),
        Expr::NumberLit(text) => text.clone(),
    }
}
