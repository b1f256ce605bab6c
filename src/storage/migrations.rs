//! Versioned schema migrations.
//!
//! Applied versions are recorded in `schema_migrations`; each migration runs
//! in its own transaction and is rolled back as a whole on failure.

use rusqlite::{params, Connection};

use crate::storage::{StorageError, StorageResult};

pub const CURRENT_SCHEMA_VERSION: i32 = 2;

const INIT_SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i32,
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(version: i32, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Ordered by version.
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "initial schema", INIT_SCHEMA),
        Migration::new(
            2,
            "query indexes",
            r#"
            CREATE INDEX IF NOT EXISTS idx_stats_user_domain
                ON item_stats(user_id, domain, scoped, scope_id);

            CREATE INDEX IF NOT EXISTS idx_attempts_user_domain
                ON attempts(user_id, domain, scoped, scope_id, asked_at);
            "#,
        ),
    ]
}

fn ensure_migrations_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| StorageError::Migration(format!("failed to create migrations table: {e}")))
}

pub fn get_current_version(conn: &Connection) -> StorageResult<i32> {
    ensure_migrations_table(conn)?;
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn get_applied_versions(conn: &Connection) -> StorageResult<Vec<i32>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<i32>, _>>()?;
    Ok(versions)
}

/// Brings the database up to [`CURRENT_SCHEMA_VERSION`] and returns the
/// resulting version.
pub fn run_migrations(conn: &Connection) -> StorageResult<i32> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_versions(conn)?;
    let mut version = get_current_version(conn)?;

    tracing::debug!(current = version, latest = CURRENT_SCHEMA_VERSION, "checking schema");

    for migration in get_migrations() {
        if applied.contains(&migration.version) {
            continue;
        }

        tracing::info!(version = migration.version, migration = %migration.name, "applying migration");
        if let Err(e) = execute_in_transaction(conn, &migration) {
            tracing::error!(version = migration.version, error = %e, "migration failed");
            return Err(e);
        }
        version = migration.version;
    }

    Ok(version)
}

fn execute_in_transaction(conn: &Connection, migration: &Migration) -> StorageResult<()> {
    conn.execute_batch("BEGIN IMMEDIATE")?;

    let result = conn.execute_batch(&migration.sql).and_then(|_| {
        conn.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.name,
                chrono::Utc::now().to_rfc3339()
            ],
        )
    });

    match result {
        Ok(_) => {
            conn.execute_batch("COMMIT")?;
            Ok(())
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK").ok();
            Err(StorageError::Migration(format!(
                "migration v{} failed: {e}",
                migration.version
            )))
        }
    }
}
