//! Applies pending up-migrations to a PostgreSQL database.

use sqlx::postgres::PgPool;
use tracing::{debug, info};

use sqlbind_core::Migration;

use crate::error::Result;

/// SQL for creating the migrations tracking table.
pub const TRACKING_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS _sqlbind_migrations \
     (key VARCHAR(200) PRIMARY KEY, at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP)";

/// SQL for recording an applied migration.
pub const RECORD_MIGRATION_SQL: &str =
    "INSERT INTO _sqlbind_migrations (key, at) VALUES ($1, CURRENT_TIMESTAMP)";

/// SQL for checking whether a migration is recorded.
pub const CHECK_MIGRATION_SQL: &str = "SELECT 1 FROM _sqlbind_migrations WHERE key = $1";

/// Executes migrations against a database, one transaction each.
pub struct MigrationExecutor {
    pool: PgPool,
}

impl MigrationExecutor {
    /// Creates an executor over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensures the tracking table exists.
    ///
    /// # Errors
    ///
    /// Propagates database errors.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(TRACKING_TABLE_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Whether the migration has already been recorded.
    ///
    /// # Errors
    ///
    /// Propagates database errors.
    pub async fn is_applied(&self, migration: &Migration) -> Result<bool> {
        let row = sqlx::query(CHECK_MIGRATION_SQL)
            .bind(&migration.name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Applies one migration and records it, atomically. A failure
    /// rolls back both the DDL and the record.
    ///
    /// # Errors
    ///
    /// Propagates database errors.
    pub async fn apply(&self, migration: &Migration) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::raw_sql(&migration.up_sql).execute(&mut *tx).await?;
        sqlx::query(RECORD_MIGRATION_SQL)
            .bind(&migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Applies every migration not yet recorded, in the given order.
    /// Returns how many were applied.
    ///
    /// # Errors
    ///
    /// Propagates database errors; the failing migration is rolled
    /// back and later ones are not attempted.
    pub async fn run(&self, migrations: &[Migration]) -> Result<usize> {
        self.init().await?;

        let mut applied = 0;
        for migration in migrations {
            if self.is_applied(migration).await? {
                debug!(name = %migration.name, "already applied, skipping");
                continue;
            }
            info!(name = %migration.name, "applying migration");
            self.apply(migration).await?;
            applied += 1;
        }
        Ok(applied)
    }
}
