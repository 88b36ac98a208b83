use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{Decimal, Transaction, Wallet};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingResponse {
    pub transaction: Transaction,
    pub balance: Decimal,
}

pub async fn open_wallet(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Wallet>), AppError> {
    let caller = state.caller(&headers).await?;
    let wallet = state.wallets.open_wallet(&caller.user_id).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

pub async fn get_wallet(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Wallet>, AppError> {
    let caller = state.caller(&headers).await?;
    Ok(Json(state.wallets.wallet(&caller.user_id).await?))
}

pub async fn deposit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AmountRequest>,
) -> Result<Json<PostingResponse>, AppError> {
    let caller = state.caller(&headers).await?;
    let transaction = state.wallets.deposit(&caller, body.amount).await?;
    let balance = state.wallets.get_balance(&caller.user_id).await?;
    Ok(Json(PostingResponse {
        transaction,
        balance,
    }))
}

pub async fn withdraw(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AmountRequest>,
) -> Result<Json<PostingResponse>, AppError> {
    let caller = state.caller(&headers).await?;
    let transaction = state.wallets.withdraw(&caller, body.amount).await?;
    let balance = state.wallets.get_balance(&caller.user_id).await?;
    Ok(Json(PostingResponse {
        transaction,
        balance,
    }))
}

pub async fn get_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let caller = state.caller(&headers).await?;
    Ok(Json(state.wallets.transactions(&caller.user_id).await?))
}
