//! Project rows and guarded state writes.

use super::{decimal_col, label_col, opt_decimal_col, opt_time_col, time_col};
use crate::domain::{Decimal, Project, ProjectId, ProjectStatus, UserId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

const PROJECT_COLUMNS: &str = r#"
    id, business_owner_id, title, description, amount_requested, amount_raised,
    duration, expected_roi, status, is_active, rejection_reason, repayment_total,
    created_at, approved_at, funded_at, repaid_at
"#;

fn project_from_row(row: &SqliteRow) -> Result<Project, sqlx::Error> {
    Ok(Project {
        id: ProjectId::new(row.try_get::<String, _>("id")?),
        business_owner_id: UserId::new(row.try_get::<String, _>("business_owner_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        amount_requested: decimal_col(row, "amount_requested")?,
        amount_raised: decimal_col(row, "amount_raised")?,
        duration: row.try_get("duration")?,
        expected_roi: decimal_col(row, "expected_roi")?,
        status: label_col(row, "status")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        rejection_reason: row.try_get("rejection_reason")?,
        repayment_total: opt_decimal_col(row, "repayment_total")?,
        created_at: time_col(row, "created_at")?,
        approved_at: opt_time_col(row, "approved_at")?,
        funded_at: opt_time_col(row, "funded_at")?,
        repaid_at: opt_time_col(row, "repaid_at")?,
    })
}

pub async fn insert(conn: &mut SqliteConnection, project: &Project) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO projects ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        PROJECT_COLUMNS
    ))
    .bind(project.id.as_str())
    .bind(project.business_owner_id.as_str())
    .bind(&project.title)
    .bind(&project.description)
    .bind(project.amount_requested.to_canonical_string())
    .bind(project.amount_raised.to_canonical_string())
    .bind(project.duration)
    .bind(project.expected_roi.to_canonical_string())
    .bind(project.status.as_str())
    .bind(project.is_active as i64)
    .bind(project.rejection_reason.as_deref())
    .bind(project.repayment_total.map(|d| d.to_canonical_string()))
    .bind(project.created_at.as_ms())
    .bind(project.approved_at.map(|t| t.as_ms()))
    .bind(project.funded_at.map(|t| t.as_ms()))
    .bind(project.repaid_at.map(|t| t.as_ms()))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn fetch(
    conn: &mut SqliteConnection,
    id: &ProjectId,
) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS))
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(project_from_row).transpose()
}

/// Projects, newest first, optionally filtered by status.
pub async fn list(
    conn: &mut SqliteConnection,
    status: Option<ProjectStatus>,
) -> Result<Vec<Project>, sqlx::Error> {
    let rows = match status {
        Some(status) => {
            sqlx::query(&format!(
                "SELECT {} FROM projects WHERE status = ? ORDER BY created_at DESC, rowid DESC",
                PROJECT_COLUMNS
            ))
            .bind(status.as_str())
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM projects ORDER BY created_at DESC, rowid DESC",
                PROJECT_COLUMNS
            ))
            .fetch_all(&mut *conn)
            .await?
        }
    };

    rows.iter().map(project_from_row).collect()
}

/// Write the mutable fields of `project`, guarded by the state it was read in.
///
/// The row is only updated if its status and raised amount still equal
/// `prev_status` / `prev_raised`. Returns false if the guard failed.
pub async fn save_if_unchanged(
    conn: &mut SqliteConnection,
    project: &Project,
    prev_status: ProjectStatus,
    prev_raised: Decimal,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET amount_raised = ?, status = ?, is_active = ?, rejection_reason = ?,
            repayment_total = ?, approved_at = ?, funded_at = ?, repaid_at = ?
        WHERE id = ? AND status = ? AND amount_raised = ?
        "#,
    )
    .bind(project.amount_raised.to_canonical_string())
    .bind(project.status.as_str())
    .bind(project.is_active as i64)
    .bind(project.rejection_reason.as_deref())
    .bind(project.repayment_total.map(|d| d.to_canonical_string()))
    .bind(project.approved_at.map(|t| t.as_ms()))
    .bind(project.funded_at.map(|t| t.as_ms()))
    .bind(project.repaid_at.map(|t| t.as_ms()))
    .bind(project.id.as_str())
    .bind(prev_status.as_str())
    .bind(prev_raised.to_canonical_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
