//! Verified caller identity handed to the ledger by the identity collaborator.

use crate::domain::{Role, UserId};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

/// Who is invoking a core operation.
///
/// The ledger trusts these values as given; authentication happened upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerContext {
    pub user_id: UserId,
    pub role: Role,
    pub kyc_completed: bool,
}

impl CallerContext {
    pub fn new(user_id: UserId, role: Role, kyc_completed: bool) -> Self {
        Self {
            user_id,
            role,
            kyc_completed,
        }
    }

    pub fn investor(user_id: impl Into<String>) -> Self {
        Self::new(UserId::new(user_id), Role::Investor, true)
    }

    pub fn business(user_id: impl Into<String>) -> Self {
        Self::new(UserId::new(user_id), Role::Business, true)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(UserId::new(user_id), Role::Admin, true)
    }

    /// Fails with `Forbidden` unless the caller holds `role`.
    pub fn require_role(&self, role: Role) -> Result<(), LedgerError> {
        if self.role == role {
            Ok(())
        } else {
            Err(LedgerError::Forbidden(format!(
                "{} role required, caller is {}",
                role, self.role
            )))
        }
    }

    /// Investors must have completed KYC before committing funds.
    pub fn require_eligible_investor(&self) -> Result<(), LedgerError> {
        self.require_role(Role::Investor)?;
        if !self.kyc_completed {
            return Err(LedgerError::Forbidden("KYC verification not completed".into()));
        }
        Ok(())
    }
}
