//! SQL data types, column definitions, and table constraints.

use core::fmt;

/// A SQL data type from the recognized dialect subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// `SMALLINT`
    SmallInt,
    /// `INT` / `INTEGER`
    Integer,
    /// `BIGINT`
    BigInt,
    /// `SERIAL`
    Serial,
    /// `BIGSERIAL`
    BigSerial,
    /// `DECIMAL`
    Decimal,
    /// `NUMERIC`
    Numeric,
    /// `REAL`
    Real,
    /// `CHAR`
    Char,
    /// `VARCHAR`
    VarChar,
    /// `TEXT`
    Text,
    /// `BOOLEAN`
    Boolean,
    /// `DATE`
    Date,
    /// `TIMESTAMP`
    Timestamp,
    /// `TIMESTAMPTZ`
    TimestampTz,
    /// `UUID`
    Uuid,
    /// `JSON`
    Json,
    /// `JSONB`
    Jsonb,
}

impl DataType {
    /// Attempts to parse a type name (case-insensitive).
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "SMALLINT" => Some(Self::SmallInt),
            "INT" | "INTEGER" => Some(Self::Integer),
            "BIGINT" => Some(Self::BigInt),
            "SERIAL" => Some(Self::Serial),
            "BIGSERIAL" => Some(Self::BigSerial),
            "DECIMAL" => Some(Self::Decimal),
            "NUMERIC" => Some(Self::Numeric),
            "REAL" => Some(Self::Real),
            "CHAR" => Some(Self::Char),
            "VARCHAR" => Some(Self::VarChar),
            "TEXT" => Some(Self::Text),
            "BOOLEAN" | "BOOL" => Some(Self::Boolean),
            "DATE" => Some(Self::Date),
            "TIMESTAMP" => Some(Self::Timestamp),
            "TIMESTAMPTZ" => Some(Self::TimestampTz),
            "UUID" => Some(Self::Uuid),
            "JSON" => Some(Self::Json),
            "JSONB" => Some(Self::Jsonb),
            _ => None,
        }
    }

    /// Returns the canonical SQL name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Serial => "SERIAL",
            Self::BigSerial => "BIGSERIAL",
            Self::Decimal => "DECIMAL",
            Self::Numeric => "NUMERIC",
            Self::Real => "REAL",
            Self::Char => "CHAR",
            Self::VarChar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::TimestampTz => "TIMESTAMPTZ",
            Self::Uuid => "UUID",
            Self::Json => "JSON",
            Self::Jsonb => "JSONB",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a table or of a query's result shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// SQL type.
    pub data_type: DataType,
    /// First numeric type modifier, e.g. the 200 of `VARCHAR(200)`.
    pub param1: Option<u32>,
    /// Second numeric type modifier, e.g. the scale of `DECIMAL(10, 2)`.
    pub param2: Option<u32>,
    /// Whether the column admits NULL. Defaults to true.
    pub nullable: bool,
    /// Raw text of a `DEFAULT` clause, if present.
    pub default: Option<String>,
}

impl ColumnDefinition {
    /// Creates a nullable column of the given type with no modifiers.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            param1: None,
            param2: None,
            nullable: true,
            default: None,
        }
    }
}

/// The kind of a table-level constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `PRIMARY KEY`
    PrimaryKey,
    /// `UNIQUE`
    Unique,
}

/// A table-level constraint over a set of columns.
///
/// The shape analysis only ever asks one question of a constraint:
/// [`is_unique`](TableConstraint::is_unique).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConstraint {
    /// What the constraint enforces.
    pub kind: ConstraintKind,
    /// The columns it covers.
    pub columns: Vec<String>,
}

impl TableConstraint {
    /// A primary-key constraint over the given columns.
    #[must_use]
    pub fn primary_key(columns: Vec<String>) -> Self {
        Self {
            kind: ConstraintKind::PrimaryKey,
            columns,
        }
    }

    /// A unique constraint over the given columns.
    #[must_use]
    pub fn unique(columns: Vec<String>) -> Self {
        Self {
            kind: ConstraintKind::Unique,
            columns,
        }
    }

    /// Whether rows are unique per value combination of the covered
    /// columns. True for primary keys and unique constraints.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey | ConstraintKind::Unique)
    }
}
