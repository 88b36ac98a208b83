use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a core ledger operation. Always terminal for the operation.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: String, requested: String },
    #[error("Capacity exceeded: remaining {remaining}, requested {requested}")]
    CapacityExceeded { remaining: String, requested: String },
    #[error("Duplicate investment: investor {investor_id} already invested in project {project_id}")]
    DuplicateInvestment {
        investor_id: String,
        project_id: String,
    },
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl LedgerError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::Forbidden(_) => "FORBIDDEN",
            LedgerError::InvalidState(_) => "INVALID_STATE",
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::InvalidInput(_) => "INVALID_INPUT",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            LedgerError::DuplicateInvestment { .. } => "DUPLICATE_INVESTMENT",
            LedgerError::Conflict(_) => "CONFLICT",
            LedgerError::Db(_) => "INTERNAL",
        }
    }
}

/// HTTP-facing error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Ledger(err) => match err {
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
                LedgerError::InvalidState(_)
                | LedgerError::CapacityExceeded { .. }
                | LedgerError::DuplicateInvestment { .. }
                | LedgerError::Conflict(_) => StatusCode::CONFLICT,
                LedgerError::InvalidAmount(_)
                | LedgerError::InvalidInput(_)
                | LedgerError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) | AppError::Internal(_) => "INTERNAL",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Ledger(err) => err.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let error_message = match &self {
            // Storage details stay in the logs.
            AppError::Ledger(LedgerError::Db(err)) => {
                tracing::error!(error = %err, "Database error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}
