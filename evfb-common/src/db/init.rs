//! Database initialization
//!
//! Opens (creating if needed) the service's SQLite file and creates the
//! form/submission tables. Table creation is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every connection
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL lets readers proceed while a step is being written
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Each connection to `sqlite::memory:` is a separate database, so the pool
/// is capped at one connection.
pub async fn open_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_forms_table(pool).await?;
    create_form_fields_table(pool).await?;
    create_submissions_table(pool).await?;
    create_submission_responses_table(pool).await?;
    Ok(())
}

async fn create_forms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS forms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            multi_step INTEGER NOT NULL DEFAULT 0,
            published INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_form_fields_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS form_fields (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            form_id INTEGER NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
            step INTEGER NOT NULL DEFAULT 1 CHECK (step >= 1),
            field_order INTEGER NOT NULL,
            kind TEXT NOT NULL,
            label TEXT NOT NULL,
            placeholder TEXT NOT NULL DEFAULT '',
            options TEXT NOT NULL DEFAULT '[]',
            required INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_form_fields_form_step ON form_fields(form_id, step, field_order)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            submission_key TEXT NOT NULL UNIQUE,
            form_id INTEGER NOT NULL REFERENCES forms(id),
            status TEXT NOT NULL DEFAULT 'in_progress'
                CHECK (status IN ('in_progress', 'completed')),
            current_step INTEGER NOT NULL DEFAULT 1 CHECK (current_step >= 1),
            started_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_submission_responses_table(pool: &SqlitePool) -> Result<()> {
    // UNIQUE(submission_id, field_id): one answer per field per session
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submission_responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            submission_id INTEGER NOT NULL REFERENCES submissions(id),
            field_id INTEGER NOT NULL REFERENCES form_fields(id) ON DELETE CASCADE,
            response TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (submission_id, field_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_schema_created() {
        let pool = open_in_memory().await.unwrap();

        for table in ["forms", "form_fields", "submissions", "submission_responses"] {
            assert!(table_exists(&pool, table).await, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_create_schema_idempotent() {
        let pool = open_in_memory().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_response_rejected_by_constraint() {
        let pool = open_in_memory().await.unwrap();

        sqlx::query("INSERT INTO forms (title, created_at) VALUES ('F', '2024-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO form_fields (form_id, step, field_order, kind, label) VALUES (1, 1, 1, 'text', 'A')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO submissions (submission_key, form_id, started_at) VALUES ('k', 1, '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let insert = "INSERT INTO submission_responses (submission_id, field_id, response, updated_at) \
                      VALUES (1, 1, 'x', '2024-01-01T00:00:00Z')";
        sqlx::query(insert).execute(&pool).await.unwrap();
        let second = sqlx::query(insert).execute(&pool).await;

        assert!(second.is_err(), "second answer for the same field must violate UNIQUE");
    }
}
