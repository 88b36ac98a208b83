//! Domain types for the crowdfunding ledger.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Primitives: TimeMs, typed identifiers, Role, CallerContext
//! - Ledger entities: Wallet, Transaction, Project, Investment, Commission
//! - Pro-rata allocation with largest-remainder rounding

pub mod allocation;
pub mod caller;
pub mod commission;
pub mod decimal;
pub mod investment;
pub mod primitives;
pub mod project;
pub mod wallet;

pub use allocation::allocate_pro_rata;
pub use caller::CallerContext;
pub use commission::{Commission, CommissionType};
pub use decimal::Decimal;
pub use investment::{Investment, InvestmentSummary, Portfolio};
pub use primitives::{InvestmentId, ProjectId, Role, RoleParseError, TimeMs, UserId};
pub use project::{Decision, NewProject, Project, ProjectStatus};
pub use wallet::{Direction, Transaction, TransactionStatus, TransactionType, UnknownLabel, Wallet};
