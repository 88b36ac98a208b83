pub mod admin;
pub mod health;
pub mod identity;
pub mod investments;
pub mod projects;
pub mod repayments;
pub mod wallets;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::CallerContext;
use crate::error::AppError;
use crate::ledger::{
    InvestmentEngine, LedgerAuditor, ProjectFundingTracker, RepaymentDistributor, WalletService,
};
use axum::http::HeaderMap;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub use identity::{IdentityProvider, TrustedHeaderIdentity};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub wallets: WalletService,
    pub tracker: ProjectFundingTracker,
    pub engine: InvestmentEngine,
    pub distributor: RepaymentDistributor,
    pub auditor: LedgerAuditor,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Wire every ledger service over one repository.
    pub fn new(repo: Arc<Repository>, config: Config, identity: Arc<dyn IdentityProvider>) -> Self {
        let tracker = ProjectFundingTracker::new(
            repo.clone(),
            config.commission,
            config.settlement.currency_scale,
        );
        Self {
            wallets: WalletService::new(repo.clone(), config.settlement),
            engine: InvestmentEngine::new(repo.clone(), tracker.clone(), config.settlement),
            distributor: RepaymentDistributor::new(
                repo.clone(),
                tracker.clone(),
                config.commission,
                config.settlement,
            ),
            auditor: LedgerAuditor::new(repo.clone()),
            repo,
            tracker,
            identity,
            config,
        }
    }

    pub async fn caller(&self, headers: &HeaderMap) -> Result<CallerContext, AppError> {
        self.identity.authenticate(headers).await
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/wallets", post(wallets::open_wallet))
        .route("/v1/wallets/me", get(wallets::get_wallet))
        .route("/v1/wallets/me/deposit", post(wallets::deposit))
        .route("/v1/wallets/me/withdraw", post(wallets::withdraw))
        .route("/v1/wallets/me/transactions", get(wallets::get_transactions))
        .route(
            "/v1/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route("/v1/projects/:id", get(projects::get_project))
        .route("/v1/projects/:id/decision", post(projects::decide_project))
        .route("/v1/projects/:id/cancel", post(projects::cancel_project))
        .route("/v1/projects/:id/investments", post(investments::invest))
        .route("/v1/investments/me", get(investments::my_investments))
        .route("/v1/investments/me/portfolio", get(investments::my_portfolio))
        .route("/v1/projects/:id/repayment", post(repayments::distribute))
        .route("/v1/projects/:id/commissions", get(repayments::get_commissions))
        .route("/v1/admin/audit", get(admin::audit))
        .layer(cors)
        .with_state(state)
}
