//! Result-cardinality analysis: proving a query returns at most one
//! row.
//!
//! The engine is a small constraint propagation over `(source, column)`
//! pairs. An `=` against a literal or parameter fixes a column; an `=`
//! between two column refs entangles them; `AND` unions what its
//! children establish and `OR` keeps only what both branches
//! establish. A source is single-row when one of its unique
//! constraints is entirely fixed, transitively through entanglement.

use std::collections::BTreeSet;

use crate::ast::{CompareOp, Condition, Expr, LogicalOp, Select, TableConstraint, TableTarget};
use crate::model::Model;

use super::{select_shape, AvailableColumns, Cardinality, ShapeError};

/// A column pinned to its owning source: the source's scope key plus
/// the column name.
type ColumnKey = (String, String);

pub(super) fn select_cardinality(
    query: &Select,
    model: &Model,
    available: &AvailableColumns,
) -> Result<Cardinality, ShapeError> {
    // An explicit LIMIT 1 settles it. Other limits are recorded on the
    // AST but do not change the class.
    if query.limit == Some(1) {
        return Ok(Cardinality::OneRow);
    }

    // One combined analysis over WHERE and every ON: the equivalence
    // relation deliberately spans join equalities.
    let mut analysis = Analysis::default();
    if let Some(cond) = &query.where_clause {
        analysis = analysis.and(analyze(cond, available));
    }
    for join in &query.joins {
        if let Some(cond) = &join.on {
            analysis = analysis.and(analyze(cond, available));
        }
    }
    let fixed = analysis.closure();

    // Every source must be proven to contribute at most one row.
    let targets = std::iter::once(&query.from).chain(query.joins.iter().map(|j| &j.target));
    for target in targets {
        if !single_row(target, model, &fixed)? {
            return Ok(Cardinality::ManyRows);
        }
    }
    Ok(Cardinality::OneRow)
}

/// Whether some unique constraint of the target is entirely fixed.
fn single_row(
    target: &TableTarget,
    model: &Model,
    fixed: &BTreeSet<ColumnKey>,
) -> Result<bool, ShapeError> {
    let key = target.key();
    let constraints = match target {
        TableTarget::Table { name, .. } => model
            .table(name)
            .ok_or_else(|| ShapeError::UnknownTable(name.clone()))?
            .constraints
            .clone(),
        TableTarget::Subquery { query, .. } => derived_constraints(query, model)?,
    };
    Ok(constraints.iter().any(|constraint| {
        constraint.is_unique()
            && constraint
                .columns
                .iter()
                .all(|column| fixed.contains(&(key.to_string(), column.clone())))
    }))
}

/// What a condition tree establishes: directly fixed columns plus
/// equivalence edges between columns.
#[derive(Debug, Clone, Default)]
struct Analysis {
    fixed: BTreeSet<ColumnKey>,
    edges: Vec<(ColumnKey, ColumnKey)>,
}

impl Analysis {
    /// Conjunction: both children's facts hold.
    fn and(mut self, other: Self) -> Self {
        self.fixed.extend(other.fixed);
        self.edges.extend(other.edges);
        self
    }

    /// Disjunction: only columns fixed (transitively) by both branches
    /// survive, and branch-local equivalences do not escape.
    fn or(self, other: Self) -> Self {
        let left = self.closure();
        let right = other.closure();
        Self {
            fixed: left.intersection(&right).cloned().collect(),
            edges: Vec::new(),
        }
    }

    /// Saturates the fixed set over the equivalence edges: a column
    /// equivalent to a fixed column is fixed.
    fn closure(&self) -> BTreeSet<ColumnKey> {
        let mut fixed = self.fixed.clone();
        loop {
            let mut grew = false;
            for (a, b) in &self.edges {
                if fixed.contains(a) && !fixed.contains(b) {
                    fixed.insert(b.clone());
                    grew = true;
                }
                if fixed.contains(b) && !fixed.contains(a) {
                    fixed.insert(a.clone());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        fixed
    }
}

fn analyze(cond: &Condition, available: &AvailableColumns) -> Analysis {
    match cond {
        Condition::Compare {
            left,
            op: CompareOp::Eq,
            right,
        } => analyze_equality(left, right, available),
        // Inequalities, IS, and anything else establish nothing.
        Condition::Compare { .. } => Analysis::default(),
        Condition::Logical { left, op, right } => {
            let l = analyze(left, available);
            let r = analyze(right, available);
            match op {
                LogicalOp::And => l.and(r),
                LogicalOp::Or => l.or(r),
            }
        }
    }
}

fn analyze_equality(left: &Expr, right: &Expr, available: &AvailableColumns) -> Analysis {
    let mut analysis = Analysis::default();
    match (resolve(left, available), resolve(right, available)) {
        (Some(a), Some(b)) => analysis.edges.push((a, b)),
        (Some(column), None) if is_fixing_value(right) => {
            analysis.fixed.insert(column);
        }
        (None, Some(column)) if is_fixing_value(left) => {
            analysis.fixed.insert(column);
        }
        _ => {}
    }
    analysis
}

/// Literals and parameters pin a column to a single value.
fn is_fixing_value(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::StringLit(_) | Expr::NumberLit(_) | Expr::Parameter { .. }
    )
}

/// Resolves a column ref to its owning source. Unqualified names that
/// match zero or several sources contribute nothing; output-column
/// resolution reports those separately.
fn resolve(expr: &Expr, available: &AvailableColumns) -> Option<ColumnKey> {
    let Expr::Column(col) = expr else { return None };
    match &col.table {
        Some(table) if available.contains_key(table) => {
            Some((table.clone(), col.name.clone()))
        }
        Some(_) => None,
        None => {
            let mut owner = None;
            for (key, defs) in available {
                if defs.iter().any(|d| d.name == col.name) {
                    if owner.is_some() {
                        return None;
                    }
                    owner = Some(key.clone());
                }
            }
            owner.map(|key| (key, col.name.clone()))
        }
    }
}

/// Derives virtual unique constraints for a subselect source.
///
/// A subselect that is itself provably one row is unique on the empty
/// column set. A join-free subselect over a table inherits each unique
/// constraint whose columns it projects as plain column refs, renamed
/// to the projected output names. Joined subselects derive nothing
/// (conservative).
fn derived_constraints(
    query: &Select,
    model: &Model,
) -> Result<Vec<TableConstraint>, ShapeError> {
    let shape = select_shape(query, model)?;
    if shape.cardinality == Cardinality::OneRow {
        return Ok(vec![TableConstraint::unique(Vec::new())]);
    }
    if !query.joins.is_empty() {
        return Ok(Vec::new());
    }
    let TableTarget::Table {
        name: table_name, ..
    } = &query.from
    else {
        // Nested subselects propagate nothing further.
        return Ok(Vec::new());
    };
    let from_key = query.from.key();
    let Some(table) = model.table(table_name) else {
        return Err(ShapeError::UnknownTable(table_name.clone()));
    };

    // Underlying column name -> projected output name, for fields that
    // are plain refs to the from source.
    let mut projected = std::collections::BTreeMap::new();
    for field in &query.fields {
        if let Expr::Column(col) = &field.expr {
            if col.table.as_deref().map_or(true, |t| t == from_key) {
                let output = field.alias.clone().unwrap_or_else(|| col.name.clone());
                projected.insert(col.name.clone(), output);
            }
        }
    }

    let mut derived = Vec::new();
    for constraint in &table.constraints {
        if !constraint.is_unique() {
            continue;
        }
        let outputs: Option<Vec<String>> = constraint
            .columns
            .iter()
            .map(|c| projected.get(c).cloned())
            .collect();
        if let Some(columns) = outputs {
            derived.push(TableConstraint {
                kind: constraint.kind,
                columns,
            });
        }
    }
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ColumnDefinition, DataType, Statement};
    use crate::model::{model_from_migrations, Table};
    use crate::migration::Migration;
    use crate::shape::shape;

    fn users_model() -> Model {
        let migrations = vec![Migration {
            name: "0001_users".into(),
            up_sql: "CREATE TABLE users (id int primary key, email varchar(200))".into(),
            down_sql: String::new(),
        }];
        model_from_migrations(&migrations).unwrap()
    }

    fn cardinality_of(sql: &str, model: &Model) -> Cardinality {
        let program = crate::parser::parse(sql).unwrap();
        shape(&program.statements[0], model).unwrap().cardinality
    }

    #[test]
    fn test_plain_select_is_many_rows() {
        let model = users_model();
        assert_eq!(
            cardinality_of("SELECT id, email FROM users", &model),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_limit_one_is_one_row() {
        let model = users_model();
        assert_eq!(
            cardinality_of("SELECT id, email FROM users LIMIT 1", &model),
            Cardinality::OneRow
        );
        assert_eq!(
            cardinality_of("SELECT id, email FROM users LIMIT 2", &model),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_fixed_primary_key_is_one_row() {
        let model = users_model();
        assert_eq!(
            cardinality_of("SELECT id, email FROM users WHERE id=$id", &model),
            Cardinality::OneRow
        );
    }

    #[test]
    fn test_fixed_non_unique_column_is_many_rows() {
        let model = users_model();
        assert_eq!(
            cardinality_of("SELECT id, email FROM users WHERE email=$email", &model),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_literal_fixes_like_parameter() {
        let model = users_model();
        assert_eq!(
            cardinality_of("SELECT email FROM users WHERE id = 42", &model),
            Cardinality::OneRow
        );
    }

    #[test]
    fn test_inequality_fixes_nothing() {
        let model = users_model();
        assert_eq!(
            cardinality_of("SELECT email FROM users WHERE id > 42", &model),
            Cardinality::ManyRows
        );
    }

    fn two_table_model() -> Model {
        let migrations = vec![Migration {
            name: "0001_init".into(),
            up_sql: "CREATE TABLE users (id int primary key, email varchar(200));\n\
                     CREATE TABLE profiles (user_id int primary key, bio text);\n\
                     CREATE TABLE events (id int, user_id int);"
                .into(),
            down_sql: String::new(),
        }];
        model_from_migrations(&migrations).unwrap()
    }

    #[test]
    fn test_join_entanglement_proves_both_sides() {
        let model = two_table_model();
        assert_eq!(
            cardinality_of(
                "SELECT u.email, p.bio FROM users u \
                 JOIN profiles p ON p.user_id = u.id \
                 WHERE u.id = $id",
                &model
            ),
            Cardinality::OneRow
        );
    }

    #[test]
    fn test_unproven_join_side_forces_many_rows() {
        let model = two_table_model();
        assert_eq!(
            cardinality_of(
                "SELECT u.email, e.id FROM users u \
                 JOIN events e ON e.user_id = u.id \
                 WHERE u.id = $id",
                &model
            ),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_and_unions_fixed_columns() {
        let model = two_table_model();
        assert_eq!(
            cardinality_of(
                "SELECT u.email, p.bio FROM users u \
                 JOIN profiles p ON p.user_id = u.id \
                 WHERE u.id = $id AND p.bio = 'x'",
                &model
            ),
            Cardinality::OneRow
        );
    }

    #[test]
    fn test_or_intersects_fixed_columns() {
        let model = users_model();
        // Both branches fix id, so the disjunction still does.
        assert_eq!(
            cardinality_of(
                "SELECT email FROM users WHERE id = $a OR id = $b",
                &model
            ),
            Cardinality::OneRow
        );
        // Only one branch fixes id.
        assert_eq!(
            cardinality_of(
                "SELECT email FROM users WHERE id = $a OR email = $e",
                &model
            ),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_or_keeps_equivalences_local() {
        let model = two_table_model();
        // The entanglement lives in one OR branch only, so it cannot
        // help fix profiles outside it.
        assert_eq!(
            cardinality_of(
                "SELECT u.email, p.bio FROM users u \
                 JOIN profiles p ON p.user_id = p.user_id \
                 WHERE u.id = $id OR p.user_id = u.id",
                &model
            ),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_cross_join_is_many_rows() {
        let model = two_table_model();
        assert_eq!(
            cardinality_of(
                "SELECT u.email, p.bio FROM users u CROSS JOIN profiles p \
                 WHERE u.id = $id",
                &model
            ),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_subselect_inherits_unique_constraint() {
        let model = users_model();
        assert_eq!(
            cardinality_of(
                "SELECT sub.uid FROM (SELECT id AS uid, email FROM users) sub \
                 WHERE sub.uid = $id",
                &model
            ),
            Cardinality::OneRow
        );
    }

    #[test]
    fn test_subselect_dropping_key_column_is_many_rows() {
        let model = users_model();
        assert_eq!(
            cardinality_of(
                "SELECT sub.email FROM (SELECT email FROM users) sub \
                 WHERE sub.email = $e",
                &model
            ),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_limit_one_subselect_is_trivially_unique() {
        let model = users_model();
        assert_eq!(
            cardinality_of(
                "SELECT sub.email FROM (SELECT email FROM users LIMIT 1) sub",
                &model
            ),
            Cardinality::OneRow
        );
    }

    #[test]
    fn test_joined_subselect_derives_nothing() {
        let model = two_table_model();
        assert_eq!(
            cardinality_of(
                "SELECT sub.id FROM (SELECT u.id FROM users u \
                 JOIN profiles p ON p.user_id = u.id) sub \
                 WHERE sub.id = $id",
                &model
            ),
            Cardinality::ManyRows
        );
    }

    #[test]
    fn test_unique_column_constraint_counts() {
        let mut model = Model::default();
        let mut sku = ColumnDefinition::new("sku", DataType::VarChar);
        sku.nullable = false;
        model.tables.insert(
            "products".into(),
            Table {
                name: "products".into(),
                columns: vec![sku, ColumnDefinition::new("label", DataType::Text)],
                constraints: vec![TableConstraint::unique(vec!["sku".into()])],
            },
        );
        let program =
            crate::parser::parse("SELECT label FROM products WHERE sku = $sku").unwrap();
        let Statement::Select(ref select) = program.statements[0] else {
            panic!("expected SELECT");
        };
        let shape = select_shape(select, &model).unwrap();
        assert_eq!(shape.cardinality, Cardinality::OneRow);
    }
}
