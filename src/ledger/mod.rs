//! Ledger services.
//!
//! Every mutation runs as one unit of work opened with
//! [`Repository::begin_write`](crate::db::Repository::begin_write):
//! - `wallet.rs` - Balance postings and the transaction trail
//! - `funding.rs` - Project lifecycle and raised amounts
//! - `investment.rs` - Investing in approved projects
//! - `repayment.rs` - Pro-rata repayment distribution and profit commission
//! - `audit.rs` - Read-only consistency checks

pub mod audit;
pub mod funding;
pub mod investment;
pub mod repayment;
pub mod wallet;

pub use audit::{AuditReport, LedgerAuditor, Violation};
pub use funding::ProjectFundingTracker;
pub use investment::InvestmentEngine;
pub use repayment::{InvestorPayout, RepaymentDistributor, RepaymentFailure, RepaymentReport};
pub use wallet::{Posting, WalletService};
