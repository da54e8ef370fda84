//! Statement AST types.

use core::fmt;

use super::expression::{ColumnRef, Condition, Expr};
use super::types::{ColumnDefinition, TableConstraint};

/// A parsed top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `SELECT ...`
    Select(Select),
    /// `INSERT INTO ... VALUES ...`
    Insert(Insert),
    /// `CREATE TABLE ...`
    CreateTable(CreateTable),
    /// `ALTER TABLE ... ADD COLUMN ...`
    AddColumn(AddColumn),
    /// `ALTER TABLE ... DROP COLUMN ...`
    DropColumn(DropColumn),
    /// `DROP TABLE ...`
    DropTable(DropTable),
    /// `ALTER TABLE ... RENAME TO ...`
    RenameTable(RenameTable),
    /// `ALTER TABLE ... RENAME COLUMN ... TO ...`
    RenameColumn(RenameColumn),
}

/// How a joined table relates to the rows on its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// `INNER JOIN` (or bare `JOIN`).
    Inner,
    /// `LEFT [OUTER] JOIN`
    LeftOuter,
    /// `RIGHT [OUTER] JOIN`
    RightOuter,
    /// `FULL [OUTER] JOIN`
    FullOuter,
    /// `CROSS JOIN`
    Cross,
}

impl JoinType {
    /// Returns the SQL spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::LeftOuter => "LEFT OUTER JOIN",
            Self::RightOuter => "RIGHT OUTER JOIN",
            Self::FullOuter => "FULL OUTER JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table expression in a `FROM` clause or join: either a named table
/// or an aliased subselect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableTarget {
    /// A table by name, optionally aliased.
    Table {
        /// Table name.
        name: String,
        /// Alias, if one was written.
        alias: Option<String>,
    },
    /// A parenthesized subselect. Subselects must be aliased.
    Subquery {
        /// The inner query.
        query: Box<Select>,
        /// The required alias.
        alias: String,
    },
}

impl TableTarget {
    /// A plain, unaliased table target.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table {
            name: name.into(),
            alias: None,
        }
    }

    /// The name other clauses use to refer to this target: the alias
    /// when present, otherwise the table name.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Table {
                alias: Some(alias), ..
            }
            | Self::Subquery { alias, .. } => alias,
            Self::Table { name, .. } => name,
        }
    }
}

/// One join in a `SELECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// The kind of join.
    pub join_type: JoinType,
    /// The joined table or subselect.
    pub target: TableTarget,
    /// The `ON` condition. Only `CROSS JOIN` has none.
    pub on: Option<Condition>,
}

/// A selected output expression, optionally renamed with `AS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The expression to evaluate.
    pub expr: Expr,
    /// The output name, if aliased.
    pub alias: Option<String>,
}

/// Sort direction in `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending (the default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The sort expression.
    pub expr: Expr,
    /// The direction.
    pub direction: OrderDirection,
}

/// A `SELECT` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    /// Output fields, left to right.
    pub fields: Vec<Field>,
    /// The `FROM` target. Exactly one.
    pub from: TableTarget,
    /// Joins, in written order. May be empty.
    pub joins: Vec<Join>,
    /// The `WHERE` condition, if any.
    pub where_clause: Option<Condition>,
    /// The `HAVING` condition, if any.
    pub having: Option<Condition>,
    /// `ORDER BY` entries, in written order.
    pub order_by: Vec<OrderBy>,
    /// The `LIMIT` row count. `None` means no limit (including
    /// `LIMIT ALL`). Any written number is recorded, though only
    /// `LIMIT 1` affects cardinality classification.
    pub limit: Option<u64>,
}

/// An `INSERT INTO ... VALUES ...` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    /// The target table. Never a subselect.
    pub target: TableTarget,
    /// Target columns. Unqualified names are rewritten to carry the
    /// target's alias (or table name) during parsing.
    pub columns: Vec<ColumnRef>,
    /// The inserted value expressions.
    pub values: Vec<Expr>,
}

/// A `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    /// Table name.
    pub name: String,
    /// Columns, in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Table-level constraints contributed by inline `PRIMARY KEY` and
    /// `UNIQUE` column constraints.
    pub constraints: Vec<TableConstraint>,
}

/// An `ALTER TABLE ... ADD COLUMN` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddColumn {
    /// Table to alter.
    pub table: String,
    /// The new column.
    pub column: ColumnDefinition,
}

/// An `ALTER TABLE ... DROP COLUMN` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropColumn {
    /// Table to alter.
    pub table: String,
    /// Column to remove.
    pub column: String,
}

/// A `DROP TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    /// Table to remove.
    pub table: String,
}

/// An `ALTER TABLE ... RENAME TO` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTable {
    /// Current name.
    pub from: String,
    /// New name.
    pub to: String,
}

/// An `ALTER TABLE ... RENAME COLUMN ... TO ...` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameColumn {
    /// Table to alter.
    pub table: String,
    /// Current column name.
    pub from: String,
    /// New column name.
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_key_prefers_alias() {
        let plain = TableTarget::table("users");
        assert_eq!(plain.key(), "users");

        let aliased = TableTarget::Table {
            name: "users".into(),
            alias: Some("u".into()),
        };
        assert_eq!(aliased.key(), "u");
    }

    #[test]
    fn test_join_type_display() {
        assert_eq!(JoinType::LeftOuter.to_string(), "LEFT OUTER JOIN");
        assert_eq!(JoinType::Inner.to_string(), "INNER JOIN");
    }
}
