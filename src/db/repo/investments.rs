//! Investment records.

use super::{decimal_col, opt_decimal_col, opt_time_col, time_col};
use crate::domain::{Decimal, Investment, InvestmentId, ProjectId, TimeMs, UserId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

const INVESTMENT_COLUMNS: &str = r#"
    id, investor_id, project_id, amount, expected_return, actual_return,
    is_active, created_at, repaid_at
"#;

fn investment_from_row(row: &SqliteRow) -> Result<Investment, sqlx::Error> {
    Ok(Investment {
        id: InvestmentId::new(row.try_get::<String, _>("id")?),
        investor_id: UserId::new(row.try_get::<String, _>("investor_id")?),
        project_id: ProjectId::new(row.try_get::<String, _>("project_id")?),
        amount: decimal_col(row, "amount")?,
        expected_return: decimal_col(row, "expected_return")?,
        actual_return: opt_decimal_col(row, "actual_return")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        created_at: time_col(row, "created_at")?,
        repaid_at: opt_time_col(row, "repaid_at")?,
    })
}

/// Insert a new investment. Fails with a unique violation if the investor
/// already holds one in the project.
pub async fn insert(
    conn: &mut SqliteConnection,
    investment: &Investment,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO investments ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        INVESTMENT_COLUMNS
    ))
    .bind(investment.id.as_str())
    .bind(investment.investor_id.as_str())
    .bind(investment.project_id.as_str())
    .bind(investment.amount.to_canonical_string())
    .bind(investment.expected_return.to_canonical_string())
    .bind(investment.actual_return.map(|d| d.to_canonical_string()))
    .bind(investment.is_active as i64)
    .bind(investment.created_at.as_ms())
    .bind(investment.repaid_at.map(|t| t.as_ms()))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn fetch(
    conn: &mut SqliteConnection,
    id: &InvestmentId,
) -> Result<Option<Investment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM investments WHERE id = ?",
        INVESTMENT_COLUMNS
    ))
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(investment_from_row).transpose()
}

pub async fn fetch_for(
    conn: &mut SqliteConnection,
    investor_id: &UserId,
    project_id: &ProjectId,
) -> Result<Option<Investment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM investments WHERE investor_id = ? AND project_id = ?",
        INVESTMENT_COLUMNS
    ))
    .bind(investor_id.as_str())
    .bind(project_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(investment_from_row).transpose()
}

/// All investments of a project, active and closed, in creation order.
pub async fn list_for_project(
    conn: &mut SqliteConnection,
    project_id: &ProjectId,
) -> Result<Vec<Investment>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM investments WHERE project_id = ? ORDER BY created_at ASC, rowid ASC",
        INVESTMENT_COLUMNS
    ))
    .bind(project_id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(investment_from_row).collect()
}

/// Investments of one investor, newest first.
pub async fn list_for_investor(
    conn: &mut SqliteConnection,
    investor_id: &UserId,
) -> Result<Vec<Investment>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM investments WHERE investor_id = ? ORDER BY created_at DESC, rowid DESC",
        INVESTMENT_COLUMNS
    ))
    .bind(investor_id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(investment_from_row).collect()
}

/// Close an active investment at repayment.
///
/// Returns false if the investment was already closed.
pub async fn close(
    conn: &mut SqliteConnection,
    id: &InvestmentId,
    actual_return: Decimal,
    repaid_at: TimeMs,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE investments
        SET actual_return = ?, repaid_at = ?, is_active = 0
        WHERE id = ? AND is_active = 1
        "#,
    )
    .bind(actual_return.to_canonical_string())
    .bind(repaid_at.as_ms())
    .bind(id.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
