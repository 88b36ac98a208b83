//! Repository layer for ledger persistence.
//!
//! Query functions are organized across submodules by entity and take a
//! `&mut SqliteConnection`, so the same query runs against a pooled connection
//! for reads or inside a unit-of-work transaction for writes:
//! - `wallets.rs` - Wallet balances and the transaction trail
//! - `projects.rs` - Project rows and guarded state writes
//! - `investments.rs` - Investment records
//! - `commissions.rs` - Commission records

pub mod commissions;
pub mod investments;
pub mod projects;
pub mod wallets;

use crate::domain::{
    Commission, Decimal, Investment, Project, ProjectId, ProjectStatus, TimeMs, Transaction,
    UserId, Wallet,
};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

/// Open unit of work holding the ledger write lock.
pub type LedgerTx = sqlx::Transaction<'static, Sqlite>;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn conn(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    /// Begin a unit of work that owns the ledger write lock.
    ///
    /// The first statement is a write, so SQLite takes the write lock before any
    /// read in this transaction. Concurrent units queue on `busy_timeout` and
    /// every read inside observes the latest committed state.
    pub async fn begin_write(&self) -> Result<LedgerTx, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE ledger_sequence SET seq = seq + 1 WHERE id = 1")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Begin a read-only unit. Under WAL every read inside sees one committed
    /// snapshot, even while writers commit.
    pub async fn begin_read(&self) -> Result<LedgerTx, sqlx::Error> {
        self.pool.begin().await
    }

    /// Number of committed units of work.
    pub async fn ledger_sequence(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT seq FROM ledger_sequence WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("seq"))
    }

    // =========================================================================
    // Reads outside a unit of work
    // =========================================================================

    pub async fn wallet(&self, owner_id: &UserId) -> Result<Option<Wallet>, sqlx::Error> {
        wallets::fetch(&mut *self.conn().await?, owner_id).await
    }

    pub async fn transactions(&self, owner_id: &UserId) -> Result<Vec<Transaction>, sqlx::Error> {
        wallets::list_transactions(&mut *self.conn().await?, owner_id).await
    }

    pub async fn project(&self, id: &ProjectId) -> Result<Option<Project>, sqlx::Error> {
        projects::fetch(&mut *self.conn().await?, id).await
    }

    pub async fn projects(
        &self,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Project>, sqlx::Error> {
        projects::list(&mut *self.conn().await?, status).await
    }

    pub async fn investments_for_investor(
        &self,
        investor_id: &UserId,
    ) -> Result<Vec<Investment>, sqlx::Error> {
        investments::list_for_investor(&mut *self.conn().await?, investor_id).await
    }

    pub async fn investment_for(
        &self,
        investor_id: &UserId,
        project_id: &ProjectId,
    ) -> Result<Option<Investment>, sqlx::Error> {
        investments::fetch_for(&mut *self.conn().await?, investor_id, project_id).await
    }

    pub async fn commissions(&self, project_id: &ProjectId) -> Result<Vec<Commission>, sqlx::Error> {
        commissions::list_for_project(&mut *self.conn().await?, project_id).await
    }
}

// =============================================================================
// Column decoding helpers
// =============================================================================

fn decode_err<E>(column: &str, err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(err),
    }
}

pub(crate) fn decimal_col(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str_canonical(&raw).map_err(|e| decode_err(column, e))
}

pub(crate) fn opt_decimal_col(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| Decimal::from_str_canonical(&s).map_err(|e| decode_err(column, e)))
        .transpose()
}

pub(crate) fn label_col<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| decode_err(column, e))
}

pub(crate) fn time_col(row: &SqliteRow, column: &str) -> Result<TimeMs, sqlx::Error> {
    Ok(TimeMs::new(row.try_get::<i64, _>(column)?))
}

pub(crate) fn opt_time_col(row: &SqliteRow, column: &str) -> Result<Option<TimeMs>, sqlx::Error> {
    Ok(row.try_get::<Option<i64>, _>(column)?.map(TimeMs::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_begin_write_bumps_sequence_on_commit() {
        let (repo, _temp) = setup_test_db().await;
        assert_eq!(repo.ledger_sequence().await.unwrap(), 0);

        let tx = repo.begin_write().await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(repo.ledger_sequence().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_begin_write_rollback_leaves_sequence() {
        let (repo, _temp) = setup_test_db().await;

        let tx = repo.begin_write().await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(repo.ledger_sequence().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_unit_sees_one_snapshot() {
        let (repo, _temp) = setup_test_db().await;
        let mut read = repo.begin_read().await.unwrap();
        let before = wallets::fetch_all(&mut read).await.unwrap();
        assert!(before.is_empty());

        let mut write = repo.begin_write().await.unwrap();
        wallets::insert_if_absent(&mut write, "w", &UserId::new("alice"), TimeMs::new(0))
            .await
            .unwrap();
        write.commit().await.unwrap();

        assert!(wallets::fetch_all(&mut read).await.unwrap().is_empty());
        read.rollback().await.unwrap();
        assert!(repo.wallet(&UserId::new("alice")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_decimal_is_a_decode_error() {
        let (repo, _temp) = setup_test_db().await;
        sqlx::query(
            "INSERT INTO wallets (id, owner_id, balance, created_at, updated_at) VALUES ('w', 'u', 'abc', 0, 0)",
        )
        .execute(repo.pool())
        .await
        .unwrap();

        let err = repo.wallet(&UserId::new("u")).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::ColumnDecode { .. }));
    }
}
