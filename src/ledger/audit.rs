//! Read-only consistency check over the whole ledger.
//!
//! Recomputes every wallet balance from its completed transactions and every
//! project's raised amount from its investments, and reports where the stored
//! figures disagree.

use crate::db::repo::{investments, projects, wallets};
use crate::db::Repository;
use crate::domain::{Decimal, ProjectId, TransactionStatus, UserId};
use crate::error::LedgerError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Violation {
    #[serde(rename_all = "camelCase")]
    NegativeBalance { owner_id: UserId, balance: Decimal },
    #[serde(rename_all = "camelCase")]
    BalanceMismatch {
        owner_id: UserId,
        balance: Decimal,
        ledger_sum: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    OverRaised {
        project_id: ProjectId,
        amount_requested: Decimal,
        amount_raised: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    RaisedMismatch {
        project_id: ProjectId,
        amount_raised: Decimal,
        invested_sum: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub wallets_checked: usize,
    pub projects_checked: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Clone)]
pub struct LedgerAuditor {
    repo: Arc<Repository>,
}

impl LedgerAuditor {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// All reads share one snapshot, so units of work committing during the
    /// audit cannot show up as mismatches.
    pub async fn audit(&self) -> Result<AuditReport, LedgerError> {
        let mut snapshot = self.repo.begin_read().await?;
        let mut violations = Vec::new();

        let mut ledger_sums: HashMap<UserId, Decimal> = HashMap::new();
        for tx in wallets::list_all_transactions(&mut snapshot).await? {
            if tx.status != TransactionStatus::Completed {
                continue;
            }
            let sum = ledger_sums.entry(tx.wallet_owner_id.clone()).or_default();
            *sum = sum.checked_add(tx.signed_amount()).ok_or_else(|| {
                LedgerError::InvalidAmount(format!(
                    "transaction sum for {} overflows",
                    tx.wallet_owner_id
                ))
            })?;
        }

        let wallets = wallets::fetch_all(&mut snapshot).await?;
        for wallet in &wallets {
            if wallet.balance.is_negative() {
                violations.push(Violation::NegativeBalance {
                    owner_id: wallet.owner_id.clone(),
                    balance: wallet.balance,
                });
            }
            let ledger_sum = ledger_sums
                .get(&wallet.owner_id)
                .copied()
                .unwrap_or_default();
            if ledger_sum != wallet.balance {
                violations.push(Violation::BalanceMismatch {
                    owner_id: wallet.owner_id.clone(),
                    balance: wallet.balance,
                    ledger_sum,
                });
            }
        }

        let projects = projects::list(&mut snapshot, None).await?;
        for project in &projects {
            if project.amount_raised > project.amount_requested {
                violations.push(Violation::OverRaised {
                    project_id: project.id.clone(),
                    amount_requested: project.amount_requested,
                    amount_raised: project.amount_raised,
                });
            }
            let stakes: Vec<Decimal> = investments::list_for_project(&mut snapshot, &project.id)
                .await?
                .iter()
                .map(|i| i.amount)
                .collect();
            let invested_sum = Decimal::checked_sum(&stakes).ok_or_else(|| {
                LedgerError::InvalidAmount(format!("investments in {} overflow", project.id))
            })?;
            if invested_sum != project.amount_raised {
                violations.push(Violation::RaisedMismatch {
                    project_id: project.id.clone(),
                    amount_raised: project.amount_raised,
                    invested_sum,
                });
            }
        }

        snapshot.rollback().await?;

        let report = AuditReport {
            wallets_checked: wallets.len(),
            projects_checked: projects.len(),
            violations,
        };
        if report.is_clean() {
            info!(
                wallets = report.wallets_checked,
                projects = report.projects_checked,
                "Ledger audit clean"
            );
        } else {
            warn!(violations = report.violations.len(), "Ledger audit found violations");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettlementConfig;
    use crate::db::migrations::init_db;
    use crate::domain::CallerContext;
    use crate::ledger::WalletService;
    use tempfile::TempDir;

    async fn setup() -> (LedgerAuditor, WalletService, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        (
            LedgerAuditor::new(repo.clone()),
            WalletService::new(repo.clone(), SettlementConfig::default()),
            repo,
            temp_dir,
        )
    }

    #[tokio::test]
    async fn test_empty_ledger_is_clean() {
        let (auditor, _wallets, _repo, _temp) = setup().await;
        let report = auditor.audit().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.wallets_checked, 0);
    }

    #[tokio::test]
    async fn test_audit_during_postings_stays_clean() {
        let (auditor, wallets, _repo, _temp) = setup().await;
        let callers: Vec<CallerContext> = ["a", "b", "c"]
            .into_iter()
            .map(CallerContext::investor)
            .collect();
        for caller in &callers {
            wallets.open_wallet(&caller.user_id).await.unwrap();
        }

        let postings = tokio::spawn(async move {
            for round in 0..20 {
                let caller = &callers[round % callers.len()];
                wallets.deposit(caller, Decimal::from_int(10)).await.unwrap();
            }
        });
        for _ in 0..20 {
            let report = auditor.audit().await.unwrap();
            assert!(report.is_clean(), "{:?}", report.violations);
        }
        postings.await.unwrap();
        assert!(auditor.audit().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_detects_tampered_balance() {
        let (auditor, wallets, repo, _temp) = setup().await;
        let caller = CallerContext::investor("alice");
        wallets.open_wallet(&caller.user_id).await.unwrap();
        wallets
            .deposit(&caller, Decimal::from_int(100))
            .await
            .unwrap();
        assert!(auditor.audit().await.unwrap().is_clean());

        sqlx::query("UPDATE wallets SET balance = '-5' WHERE owner_id = 'alice'")
            .execute(repo.pool())
            .await
            .unwrap();

        let report = auditor.audit().await.unwrap();
        assert_eq!(report.violations.len(), 2);
        assert!(matches!(report.violations[0], Violation::NegativeBalance { .. }));
        assert_eq!(
            report.violations[1],
            Violation::BalanceMismatch {
                owner_id: UserId::new("alice"),
                balance: Decimal::from_int(-5),
                ledger_sum: Decimal::from_int(100),
            }
        );
    }
}
