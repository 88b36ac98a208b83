//! Ledger store initialization: connection pragmas and schema.

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Tables every ledger process expects after migration.
pub const LEDGER_TABLES: [&str; 6] = [
    "ledger_sequence",
    "wallets",
    "transactions",
    "projects",
    "investments",
    "commissions",
];

/// Open (creating if needed) the ledger database and bring its schema up to date.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_connection(conn).await }))
        .connect_with(options)
        .await?;

    let applied = run_migrations(&pool).await?;
    verify_schema(&pool).await?;

    info!(path = %db_path, statements = applied, "Ledger database initialized");
    Ok(pool)
}

/// Apply `schema.sql` in one transaction. Every statement is idempotent.
async fn run_migrations(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut applied = 0;
    for statement in include_str!("schema.sql").split(';') {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            continue;
        }
        sqlx::query(trimmed).execute(&mut *tx).await?;
        applied += 1;
    }
    tx.commit().await?;

    debug!(statements = applied, "Ledger schema applied");
    Ok(applied)
}

async fn verify_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for table in LEDGER_TABLES {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(pool)
                .await?;
        if found.is_none() {
            return Err(sqlx::Error::Protocol(format!(
                "ledger table {} missing after migration",
                table
            )));
        }
    }
    Ok(())
}

/// Per-connection pragmas.
///
/// `busy_timeout` lets concurrent units of work queue on the write lock
/// instead of failing with `SQLITE_BUSY`.
async fn configure_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    use sqlx::Row;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode reports the mode actually in effect
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    debug!(journal_mode = %journal_mode, "SQLite journal mode");

    for pragma in ["PRAGMA busy_timeout = 5000", "PRAGMA synchronous = FULL"] {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }

    Ok(())
}
