use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::api::AppState;
use crate::domain::Role;
use crate::error::AppError;
use crate::ledger::AuditReport;

pub async fn audit(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuditReport>, AppError> {
    let caller = state.caller(&headers).await?;
    caller.require_role(Role::Admin)?;
    Ok(Json(state.auditor.audit().await?))
}
