//! The schema catalog, built by folding DDL statements in order.
//!
//! The model exists in two phases: mutable inside [`ModelBuilder`]
//! while the fold runs, immutable once [`model_from_migrations`]
//! returns it. Shape inference only ever reads it.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::ast::{
    AddColumn, ColumnDefinition, CreateTable, DropColumn, DropTable, RenameColumn, RenameTable,
    Statement, TableConstraint,
};
use crate::migration::Migration;
use crate::parser::parse;

/// A DDL statement that violates a catalog invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// `CREATE TABLE` (or a rename) collided with an existing table.
    #[error("a table named '{0}' already exists")]
    DuplicateTable(String),
    /// The statement targets a table that is not in the catalog.
    #[error("no table named '{0}'")]
    UnknownTable(String),
    /// An added or renamed column collided with an existing one.
    #[error("table '{table}' already has a column '{column}'")]
    DuplicateColumn {
        /// The table being altered.
        table: String,
        /// The colliding column name.
        column: String,
    },
    /// The statement targets a column that does not exist.
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn {
        /// The table being altered.
        table: String,
        /// The missing column name.
        column: String,
    },
}

/// One table of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name, case-sensitive as written.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Table-level constraints.
    pub constraints: Vec<TableConstraint>,
}

impl Table {
    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The catalog state a query sees: every table by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    /// Tables by name. Keys are unique and case-sensitive.
    pub tables: BTreeMap<String, Table>,
}

impl Model {
    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

/// Folds DDL statements into a [`Model`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: Model,
}

impl ModelBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one statement. Non-DDL statements are ignored; they may
    /// appear in migration files but do not shape the catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] when the statement violates a catalog
    /// invariant.
    pub fn apply(&mut self, statement: &Statement) -> Result<(), ModelError> {
        match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::AddColumn(add) => self.add_column(add),
            Statement::DropColumn(drop) => self.drop_column(drop),
            Statement::DropTable(drop) => self.drop_table(drop),
            Statement::RenameTable(rename) => self.rename_table(rename),
            Statement::RenameColumn(rename) => self.rename_column(rename),
            Statement::Select(_) | Statement::Insert(_) => Ok(()),
        }
    }

    /// Returns the finished, now read-only model.
    #[must_use]
    pub fn finish(self) -> Model {
        self.model
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, ModelError> {
        self.model
            .tables
            .get_mut(name)
            .ok_or_else(|| ModelError::UnknownTable(name.to_string()))
    }

    fn create_table(&mut self, create: &CreateTable) -> Result<(), ModelError> {
        if self.model.tables.contains_key(&create.name) {
            return Err(ModelError::DuplicateTable(create.name.clone()));
        }
        self.model.tables.insert(
            create.name.clone(),
            Table {
                name: create.name.clone(),
                columns: create.columns.clone(),
                constraints: create.constraints.clone(),
            },
        );
        Ok(())
    }

    fn add_column(&mut self, add: &AddColumn) -> Result<(), ModelError> {
        let table = self.table_mut(&add.table)?;
        if table.column(&add.column.name).is_some() {
            return Err(ModelError::DuplicateColumn {
                table: add.table.clone(),
                column: add.column.name.clone(),
            });
        }
        table.columns.push(add.column.clone());
        Ok(())
    }

    fn drop_column(&mut self, drop: &DropColumn) -> Result<(), ModelError> {
        let table = self.table_mut(&drop.table)?;
        let Some(index) = table.columns.iter().position(|c| c.name == drop.column) else {
            return Err(ModelError::UnknownColumn {
                table: drop.table.clone(),
                column: drop.column.clone(),
            });
        };
        table.columns.remove(index);
        // A constraint cannot outlive a column it covers.
        table
            .constraints
            .retain(|c| !c.columns.contains(&drop.column));
        Ok(())
    }

    fn drop_table(&mut self, drop: &DropTable) -> Result<(), ModelError> {
        if self.model.tables.remove(&drop.table).is_none() {
            return Err(ModelError::UnknownTable(drop.table.clone()));
        }
        Ok(())
    }

    fn rename_table(&mut self, rename: &RenameTable) -> Result<(), ModelError> {
        if self.model.tables.contains_key(&rename.to) {
            return Err(ModelError::DuplicateTable(rename.to.clone()));
        }
        let Some(mut table) = self.model.tables.remove(&rename.from) else {
            return Err(ModelError::UnknownTable(rename.from.clone()));
        };
        table.name = rename.to.clone();
        self.model.tables.insert(rename.to.clone(), table);
        Ok(())
    }

    fn rename_column(&mut self, rename: &RenameColumn) -> Result<(), ModelError> {
        let table = self.table_mut(&rename.table)?;
        if table.column(&rename.to).is_some() {
            return Err(ModelError::DuplicateColumn {
                table: rename.table.clone(),
                column: rename.to.clone(),
            });
        }
        let Some(column) = table.columns.iter_mut().find(|c| c.name == rename.from) else {
            return Err(ModelError::UnknownColumn {
                table: rename.table.clone(),
                column: rename.from.clone(),
            });
        };
        column.name = rename.to.clone();
        for constraint in &mut table.constraints {
            for covered in &mut constraint.columns {
                if *covered == rename.from {
                    rename.to.clone_into(covered);
                }
            }
        }
        Ok(())
    }
}

/// Parses every migration's up-SQL in the given order and folds the
/// DDL into a model.
///
/// # Errors
///
/// Propagates parse errors and catalog violations from any migration.
pub fn model_from_migrations(migrations: &[Migration]) -> crate::error::Result<Model> {
    let mut builder = ModelBuilder::new();
    for migration in migrations {
        let program = parse(&migration.up_sql)?;
        for statement in &program.statements {
            builder.apply(statement)?;
        }
    }
    Ok(builder.finish())
}
