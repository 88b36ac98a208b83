//! Investment Engine: commits an investor's funds to an approved project.

use crate::config::SettlementConfig;
use crate::db::repo::{investments, wallets};
use crate::db::Repository;
use crate::domain::{
    CallerContext, Decimal, Direction, Investment, InvestmentId, InvestmentSummary, Portfolio,
    ProjectId, TimeMs, TransactionType, UserId,
};
use crate::error::LedgerError;
use crate::ledger::funding::{self, ProjectFundingTracker};
use crate::ledger::wallet::{check_currency_amount, post_in, PostingRequest};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct InvestmentEngine {
    repo: Arc<Repository>,
    tracker: ProjectFundingTracker,
    settlement: SettlementConfig,
}

impl InvestmentEngine {
    pub fn new(
        repo: Arc<Repository>,
        tracker: ProjectFundingTracker,
        settlement: SettlementConfig,
    ) -> Self {
        Self {
            repo,
            tracker,
            settlement,
        }
    }

    /// Commit `amount` from the caller's wallet to `project_id`.
    ///
    /// Investment record, raised-amount increment and wallet debit land in one
    /// unit of work. Any failure leaves all three untouched.
    pub async fn invest(
        &self,
        caller: &CallerContext,
        project_id: &ProjectId,
        amount: Decimal,
    ) -> Result<InvestmentSummary, LedgerError> {
        match self.invest_inner(caller, project_id, amount).await {
            Ok(summary) => {
                info!(
                    investor_id = %caller.user_id,
                    project_id = %project_id,
                    investment_id = %summary.investment.id,
                    amount = %amount,
                    project_status = %summary.project_status,
                    "Investment committed"
                );
                Ok(summary)
            }
            Err(err) => {
                warn!(
                    investor_id = %caller.user_id,
                    project_id = %project_id,
                    amount = %amount,
                    kind = err.kind(),
                    error = %err,
                    "Investment rejected"
                );
                Err(err)
            }
        }
    }

    async fn invest_inner(
        &self,
        caller: &CallerContext,
        project_id: &ProjectId,
        amount: Decimal,
    ) -> Result<InvestmentSummary, LedgerError> {
        caller.require_eligible_investor()?;

        let investor_id = &caller.user_id;
        let now = TimeMs::now();
        let mut tx = self.repo.begin_write().await?;

        let project = funding::load_in(&mut tx, project_id).await?;
        if !project.is_fundable() {
            return Err(LedgerError::InvalidState(format!(
                "project {} is {} and not accepting investments",
                project_id, project.status
            )));
        }
        check_currency_amount(amount, self.settlement.currency_scale)?;
        if amount < self.settlement.min_investment {
            return Err(LedgerError::InvalidAmount(format!(
                "minimum investment is {}, got {}",
                self.settlement.min_investment, amount
            )));
        }
        if investments::fetch_for(&mut tx, investor_id, project_id)
            .await?
            .is_some()
        {
            return Err(duplicate(investor_id, project_id));
        }
        let remaining = project.remaining();
        if amount > remaining {
            return Err(LedgerError::CapacityExceeded {
                remaining: remaining.to_canonical_string(),
                requested: amount.to_canonical_string(),
            });
        }

        let investment = Investment {
            id: InvestmentId::generate(),
            investor_id: investor_id.clone(),
            project_id: project_id.clone(),
            amount,
            expected_return: amount
                .percent(project.expected_roi)
                .ok_or_else(|| {
                    LedgerError::InvalidAmount(format!(
                        "expected return on {} overflows",
                        amount
                    ))
                })?
                .round_to(self.settlement.currency_scale),
            actual_return: None,
            is_active: true,
            created_at: now,
            repaid_at: None,
        };
        investments::insert(&mut tx, &investment)
            .await
            .map_err(|err| {
                let unique = err
                    .as_database_error()
                    .is_some_and(|db_err| db_err.is_unique_violation());
                if unique {
                    duplicate(investor_id, project_id)
                } else {
                    LedgerError::Db(err)
                }
            })?;

        let project = self
            .tracker
            .record_investment_in(&mut tx, project_id, amount, now)
            .await?;

        let posting = post_in(
            &mut tx,
            PostingRequest {
                owner_id: investor_id,
                direction: Direction::Debit,
                amount,
                tx_type: TransactionType::Investment,
                description: format!("Investment in {}", project.title),
                metadata: Some(serde_json::json!({
                    "projectId": project_id.as_str(),
                    "investmentId": investment.id.as_str(),
                })),
            },
            now,
        )
        .await?;

        tx.commit().await?;

        Ok(InvestmentSummary {
            investment,
            project_title: project.title,
            project_status: project.status,
            project_expected_roi: project.expected_roi,
            investor_balance: posting.balance_after,
        })
    }

    /// The investor's investments with project display fields, newest first.
    pub async fn investments_for_investor(
        &self,
        investor_id: &UserId,
    ) -> Result<Vec<InvestmentSummary>, LedgerError> {
        let mut conn = self.repo.pool().acquire().await?;
        let balance = wallets::fetch(&mut conn, investor_id)
            .await?
            .map(|w| w.balance)
            .unwrap_or_default();

        let mut summaries = Vec::new();
        for investment in investments::list_for_investor(&mut conn, investor_id).await? {
            let project = funding::load_in(&mut conn, &investment.project_id).await?;
            summaries.push(InvestmentSummary {
                investment,
                project_title: project.title,
                project_status: project.status,
                project_expected_roi: project.expected_roi,
                investor_balance: balance,
            });
        }
        Ok(summaries)
    }

    pub async fn portfolio(&self, investor_id: &UserId) -> Result<Portfolio, LedgerError> {
        let investments = self.repo.investments_for_investor(investor_id).await?;
        Ok(Portfolio::from_investments(investor_id.clone(), &investments))
    }

    pub fn tracker(&self) -> &ProjectFundingTracker {
        &self.tracker
    }
}

fn duplicate(investor_id: &UserId, project_id: &ProjectId) -> LedgerError {
    LedgerError::DuplicateInvestment {
        investor_id: investor_id.to_string(),
        project_id: project_id.to_string(),
    }
}
