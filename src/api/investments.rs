use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::{Decimal, InvestmentSummary, Portfolio, ProjectId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestRequest {
    pub amount: Decimal,
}

pub async fn invest(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<InvestRequest>,
) -> Result<(StatusCode, Json<InvestmentSummary>), AppError> {
    let caller = state.caller(&headers).await?;
    let summary = state
        .engine
        .invest(&caller, &ProjectId::new(id), body.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn my_investments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<InvestmentSummary>>, AppError> {
    let caller = state.caller(&headers).await?;
    Ok(Json(
        state.engine.investments_for_investor(&caller.user_id).await?,
    ))
}

pub async fn my_portfolio(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Portfolio>, AppError> {
    let caller = state.caller(&headers).await?;
    Ok(Json(state.engine.portfolio(&caller.user_id).await?))
}
