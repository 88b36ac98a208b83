pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ledger;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    allocate_pro_rata, CallerContext, Commission, CommissionType, Decimal, Investment,
    InvestmentId, Project, ProjectId, ProjectStatus, Role, TimeMs, Transaction, TransactionType,
    UserId, Wallet,
};
pub use error::{AppError, LedgerError};
pub use ledger::{
    InvestmentEngine, LedgerAuditor, ProjectFundingTracker, RepaymentDistributor,
    RepaymentReport, WalletService,
};
