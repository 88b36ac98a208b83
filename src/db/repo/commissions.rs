//! Commission records. Append-only.

use super::{decimal_col, label_col, time_col};
use crate::domain::{Commission, ProjectId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

fn commission_from_row(row: &SqliteRow) -> Result<Commission, sqlx::Error> {
    Ok(Commission {
        id: row.try_get("id")?,
        project_id: ProjectId::new(row.try_get::<String, _>("project_id")?),
        amount: decimal_col(row, "amount")?,
        percentage: decimal_col(row, "percentage")?,
        commission_type: label_col(row, "commission_type")?,
        created_at: time_col(row, "created_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    commission: &Commission,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO commissions (id, project_id, amount, percentage, commission_type, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&commission.id)
    .bind(commission.project_id.as_str())
    .bind(commission.amount.to_canonical_string())
    .bind(commission.percentage.to_canonical_string())
    .bind(commission.commission_type.as_str())
    .bind(commission.created_at.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn list_for_project(
    conn: &mut SqliteConnection,
    project_id: &ProjectId,
) -> Result<Vec<Commission>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, project_id, amount, percentage, commission_type, created_at
        FROM commissions
        WHERE project_id = ?
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(project_id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(commission_from_row).collect()
}
