//! Filesystem conventions: loading migration and query directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use sqlbind_core::migration::{file_stem, is_up_migration};
use sqlbind_core::{batch_from_query, Migration, Model, QueryBatch};

use crate::error::{CliError, Result};

/// Reads every migration in `dir`, pairing `<stem>.sql` forward files
/// with optional `<stem>.down.sql` reverse files. The result is sorted
/// lexicographically by stem, the order the model builder applies.
///
/// # Errors
///
/// Fails when the directory is missing or a file cannot be read.
pub fn read_migrations_dir(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.is_dir() {
        return Err(CliError::MigrationsDirNotFound(dir.to_path_buf()));
    }

    let mut by_name: BTreeMap<String, Migration> = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let sql = fs::read_to_string(&path)?;
        let name = file_stem(file_name);

        let migration = by_name.entry(name.to_string()).or_insert_with(|| Migration {
            name: name.to_string(),
            ..Migration::default()
        });
        if is_up_migration(file_name) {
            migration.up_sql = sql;
        } else {
            migration.down_sql = sql;
        }
        debug!(file = %path.display(), "loaded migration file");
    }

    Ok(by_name.into_values().collect())
}

/// Reads one query batch per file in `dir`; the batch name is the file
/// stem. Files are processed in lexicographic order.
///
/// # Errors
///
/// Fails when the directory is missing, a file cannot be read, or a
/// file fails analysis (the error names the file).
pub fn read_queries_dir(dir: &Path, model: &Model) -> Result<Vec<QueryBatch>> {
    if !dir.is_dir() {
        return Err(CliError::QueriesDirNotFound(dir.to_path_buf()));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut batches = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let sql = fs::read_to_string(&path)?;
        let batch = batch_from_query(file_stem(file_name), &sql, model)
            .map_err(|source| CliError::Analysis {
                path: path.clone(),
                source,
            })?;
        debug!(file = %path.display(), statements = batch.statements.len(), "analyzed query file");
        batches.push(batch);
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbind_core::model_from_migrations;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_migrations_paired_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "0002_add_phone.sql",
            "ALTER TABLE users ADD COLUMN phone varchar(200)",
        );
        write(
            dir.path(),
            "0001_create_users.sql",
            "CREATE TABLE users (id int primary key, email varchar(200) not null)",
        );
        write(dir.path(), "0001_create_users.down.sql", "DROP TABLE users");

        let migrations = read_migrations_dir(dir.path()).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].name, "0001_create_users");
        assert!(migrations[0].up_sql.starts_with("CREATE TABLE"));
        assert!(migrations[0].down_sql.starts_with("DROP TABLE"));
        assert_eq!(migrations[1].name, "0002_add_phone");
        assert!(migrations[1].down_sql.is_empty());

        let model = model_from_migrations(&migrations).unwrap();
        let users = model.table("users").unwrap();
        assert_eq!(users.columns.len(), 3);
        assert_eq!(users.columns[2].name, "phone");
        assert!(users.columns[2].nullable);
    }

    #[test]
    fn test_missing_directory_fails() {
        let err = read_migrations_dir(Path::new("/does/not/exist")).unwrap_err();
        assert!(matches!(err, CliError::MigrationsDirNotFound(_)));
    }

    #[test]
    fn test_query_batches_named_by_stem() {
        let migrations_dir = tempfile::tempdir().unwrap();
        write(
            migrations_dir.path(),
            "0001_init.sql",
            "CREATE TABLE users (id int primary key, email varchar(200) not null)",
        );
        let model =
            model_from_migrations(&read_migrations_dir(migrations_dir.path()).unwrap()).unwrap();

        let queries_dir = tempfile::tempdir().unwrap();
        write(queries_dir.path(), "get_users.sql", "SELECT id, email FROM users");
        write(
            queries_dir.path(),
            "get_user.sql",
            "SELECT id, email FROM users WHERE id = $user_id",
        );

        let batches = read_queries_dir(queries_dir.path(), &model).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].name, "get_user");
        assert_eq!(batches[1].name, "get_users");
    }

    #[test]
    fn test_bad_query_file_is_named_in_error() {
        let migrations_dir = tempfile::tempdir().unwrap();
        write(migrations_dir.path(), "0001_init.sql", "CREATE TABLE t (a int)");
        let model =
            model_from_migrations(&read_migrations_dir(migrations_dir.path()).unwrap()).unwrap();

        let queries_dir = tempfile::tempdir().unwrap();
        write(queries_dir.path(), "broken.sql", "SELECT missing FROM t");

        let err = read_queries_dir(queries_dir.path(), &model).unwrap_err();
        assert!(err.to_string().contains("broken.sql"));
    }
}
