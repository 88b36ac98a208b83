use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::{Commission, Decimal, ProjectId, Role};
use crate::error::AppError;
use crate::ledger::RepaymentReport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentRequest {
    pub total_repayment: Decimal,
}

pub async fn distribute(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RepaymentRequest>,
) -> Result<Json<RepaymentReport>, AppError> {
    let caller = state.caller(&headers).await?;
    let report = state
        .distributor
        .distribute_repayment(&caller, &ProjectId::new(id), body.total_repayment)
        .await?;
    Ok(Json(report))
}

/// Commission records are visible to admins and the project's owner.
pub async fn get_commissions(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Commission>>, AppError> {
    let caller = state.caller(&headers).await?;
    let project = state.tracker.project(&ProjectId::new(id)).await?;
    if caller.role != Role::Admin && caller.user_id != project.business_owner_id {
        caller.require_role(Role::Admin)?;
    }
    Ok(Json(state.tracker.commissions(&project.id).await?))
}
