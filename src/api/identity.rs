//! Caller identity for HTTP requests.

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::domain::{CallerContext, Role, UserId};
use crate::error::AppError;

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";
pub const CALLER_KYC_HEADER: &str = "x-caller-kyc";

/// Turns request headers into a verified caller.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerContext, AppError>;
}

/// Trusts identity headers set by an upstream gateway that already
/// authenticated the request.
#[derive(Debug, Clone, Default)]
pub struct TrustedHeaderIdentity;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AppError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()))
            .map_err(|_| AppError::Unauthorized(format!("{} is not valid text", name))),
    }
}

#[async_trait]
impl IdentityProvider for TrustedHeaderIdentity {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerContext, AppError> {
        let user_id = header(headers, CALLER_ID_HEADER)?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized(format!("missing {}", CALLER_ID_HEADER)))?;

        let role = header(headers, CALLER_ROLE_HEADER)?
            .ok_or_else(|| AppError::Unauthorized(format!("missing {}", CALLER_ROLE_HEADER)))?
            .parse::<Role>()
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        let kyc_completed = match header(headers, CALLER_KYC_HEADER)? {
            None => false,
            Some(v) => v.eq_ignore_ascii_case("true") || v == "1",
        };

        Ok(CallerContext::new(UserId::new(user_id), role, kyc_completed))
    }
}
