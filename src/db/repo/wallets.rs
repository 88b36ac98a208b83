//! Wallet rows and the append-only transaction trail.

use super::{decimal_col, label_col, opt_time_col, time_col};
use crate::domain::{Decimal, TimeMs, Transaction, UserId, Wallet};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

fn wallet_from_row(row: &SqliteRow) -> Result<Wallet, sqlx::Error> {
    Ok(Wallet {
        id: row.try_get("id")?,
        owner_id: UserId::new(row.try_get::<String, _>("owner_id")?),
        balance: decimal_col(row, "balance")?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction, sqlx::Error> {
    let metadata: Option<String> = row.try_get("metadata")?;
    let metadata = metadata
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "metadata".to_string(),
            source: Box::new(e),
        })?;

    Ok(Transaction {
        id: row.try_get("id")?,
        wallet_owner_id: UserId::new(row.try_get::<String, _>("owner_id")?),
        tx_type: label_col(row, "tx_type")?,
        direction: label_col(row, "direction")?,
        status: label_col(row, "status")?,
        amount: decimal_col(row, "amount")?,
        description: row.try_get("description")?,
        reference: row.try_get("reference")?,
        metadata,
        created_at: time_col(row, "created_at")?,
        completed_at: opt_time_col(row, "completed_at")?,
    })
}

/// Create a zero-balance wallet unless the owner already has one.
///
/// Returns true if a wallet was created.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    id: &str,
    owner_id: &UserId,
    now: TimeMs,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO wallets (id, owner_id, balance, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(owner_id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(owner_id.as_str())
    .bind(Decimal::zero().to_canonical_string())
    .bind(now.as_ms())
    .bind(now.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch(
    conn: &mut SqliteConnection,
    owner_id: &UserId,
) -> Result<Option<Wallet>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, owner_id, balance, created_at, updated_at FROM wallets WHERE owner_id = ?",
    )
    .bind(owner_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(wallet_from_row).transpose()
}

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<Wallet>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, owner_id, balance, created_at, updated_at FROM wallets ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(wallet_from_row).collect()
}

/// Compare-and-swap the balance of one wallet.
///
/// Writes `new_balance` only if the stored balance still equals `expected`.
/// Returns false if the row changed underneath (or does not exist).
pub async fn swap_balance(
    conn: &mut SqliteConnection,
    owner_id: &UserId,
    expected: Decimal,
    new_balance: Decimal,
    now: TimeMs,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE wallets
        SET balance = ?, updated_at = ?
        WHERE owner_id = ? AND balance = ?
        "#,
    )
    .bind(new_balance.to_canonical_string())
    .bind(now.as_ms())
    .bind(owner_id.as_str())
    .bind(expected.to_canonical_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    tx: &Transaction,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, owner_id, tx_type, direction, status, amount, description,
            reference, metadata, created_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&tx.id)
    .bind(tx.wallet_owner_id.as_str())
    .bind(tx.tx_type.as_str())
    .bind(tx.direction.as_str())
    .bind(tx.status.as_str())
    .bind(tx.amount.to_canonical_string())
    .bind(&tx.description)
    .bind(&tx.reference)
    .bind(tx.metadata.as_ref().map(|m| m.to_string()))
    .bind(tx.created_at.as_ms())
    .bind(tx.completed_at.map(|t| t.as_ms()))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Transactions of one wallet, newest first.
pub async fn list_transactions(
    conn: &mut SqliteConnection,
    owner_id: &UserId,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, owner_id, tx_type, direction, status, amount, description,
               reference, metadata, created_at, completed_at
        FROM transactions
        WHERE owner_id = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(owner_id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(transaction_from_row).collect()
}

pub async fn list_all_transactions(
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, owner_id, tx_type, direction, status, amount, description,
               reference, metadata, created_at, completed_at
        FROM transactions
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(transaction_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    async fn setup_conn() -> (sqlx::SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        (init_db(&db_path).await.expect("init_db failed"), temp_dir)
    }

    #[tokio::test]
    async fn test_insert_if_absent_is_idempotent() {
        let (pool, _temp) = setup_conn().await;
        let mut conn = pool.acquire().await.unwrap();
        let owner = UserId::new("alice");

        assert!(insert_if_absent(&mut conn, "w1", &owner, TimeMs::new(1)).await.unwrap());
        assert!(!insert_if_absent(&mut conn, "w2", &owner, TimeMs::new(2)).await.unwrap());

        let wallet = fetch(&mut conn, &owner).await.unwrap().unwrap();
        assert_eq!(wallet.id, "w1");
        assert!(wallet.balance.is_zero());
    }

    #[tokio::test]
    async fn test_swap_balance_requires_expected_value() {
        let (pool, _temp) = setup_conn().await;
        let mut conn = pool.acquire().await.unwrap();
        let owner = UserId::new("alice");
        insert_if_absent(&mut conn, "w1", &owner, TimeMs::new(1)).await.unwrap();

        let ten = Decimal::from_int(10);
        assert!(swap_balance(&mut conn, &owner, Decimal::zero(), ten, TimeMs::new(2))
            .await
            .unwrap());
        // Stale expectation loses.
        assert!(!swap_balance(&mut conn, &owner, Decimal::zero(), ten + ten, TimeMs::new(3))
            .await
            .unwrap());

        let wallet = fetch(&mut conn, &owner).await.unwrap().unwrap();
        assert_eq!(wallet.balance, ten);
    }

    #[tokio::test]
    async fn test_swap_balance_missing_wallet() {
        let (pool, _temp) = setup_conn().await;
        let mut conn = pool.acquire().await.unwrap();
        let swapped = swap_balance(
            &mut conn,
            &UserId::new("ghost"),
            Decimal::zero(),
            Decimal::from_int(1),
            TimeMs::new(1),
        )
        .await
        .unwrap();
        assert!(!swapped);
    }
}
