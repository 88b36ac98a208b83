//! Repayment Distributor: pro-rata payout of a funded project's repayment.
//!
//! Each investor is paid in its own unit of work (close investment + credit
//! wallet). A failure for one investor does not undo the others, and the run can
//! be repeated: closed investments are skipped and shares are always computed
//! over every investment of the project, so a resumed run pays exactly what the
//! first run would have. Commission and the REPAID transition happen only once
//! every investment is closed.

use crate::config::{CommissionConfig, SettlementConfig};
use crate::db::repo::{commissions, investments};
use crate::db::Repository;
use crate::domain::{
    allocate_pro_rata, CallerContext, Commission, CommissionType, Decimal, Direction, Investment,
    InvestmentId, ProjectId, ProjectStatus, Role, TimeMs, TransactionType, UserId,
};
use crate::error::LedgerError;
use crate::ledger::funding::{self, ProjectFundingTracker};
use crate::ledger::wallet::{check_currency_amount, post_in, PostingRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One investor paid during this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorPayout {
    pub investment_id: InvestmentId,
    pub investor_id: UserId,
    pub amount_invested: Decimal,
    pub share: Decimal,
    pub actual_return: Decimal,
    /// None when the share rounded to zero and no credit was posted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
}

/// One investor whose payout failed during this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentFailure {
    pub investment_id: InvestmentId,
    pub investor_id: UserId,
    pub kind: String,
    pub message: String,
}

/// Outcome of one distribution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentReport {
    pub project_id: ProjectId,
    pub total_repayment: Decimal,
    pub total_invested: Decimal,
    pub profit: Decimal,
    pub paid: Vec<InvestorPayout>,
    /// Investments already closed by an earlier run.
    pub skipped: Vec<InvestmentId>,
    pub failed: Vec<RepaymentFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<Commission>,
    /// True once every investment is closed and the project is REPAID.
    pub completed: bool,
}

#[derive(Clone)]
pub struct RepaymentDistributor {
    repo: Arc<Repository>,
    tracker: ProjectFundingTracker,
    commission: CommissionConfig,
    settlement: SettlementConfig,
}

impl RepaymentDistributor {
    pub fn new(
        repo: Arc<Repository>,
        tracker: ProjectFundingTracker,
        commission: CommissionConfig,
        settlement: SettlementConfig,
    ) -> Self {
        Self {
            repo,
            tracker,
            commission,
            settlement,
        }
    }

    pub async fn distribute_repayment(
        &self,
        caller: &CallerContext,
        project_id: &ProjectId,
        total_repayment: Decimal,
    ) -> Result<RepaymentReport, LedgerError> {
        caller.require_role(Role::Admin)?;
        // Checked before the total is pinned; a pinned total cannot be changed.
        check_currency_amount(total_repayment, self.settlement.currency_scale)?;

        let (project_title, amount_raised, stakes, shares) =
            match self.pin_repayment(project_id, total_repayment).await? {
                Some(pinned) => pinned,
                None => {
                    warn!(project_id = %project_id, "Funded project has no investments, nothing to distribute");
                    return Ok(RepaymentReport {
                        project_id: project_id.clone(),
                        total_repayment,
                        total_invested: Decimal::zero(),
                        profit: Decimal::zero(),
                        paid: Vec::new(),
                        skipped: Vec::new(),
                        failed: Vec::new(),
                        commission: None,
                        completed: false,
                    });
                }
            };

        let total_invested: Decimal = stakes.iter().map(|i| i.amount).sum();

        let mut report = RepaymentReport {
            project_id: project_id.clone(),
            total_repayment,
            total_invested,
            profit: total_repayment - amount_raised,
            paid: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            commission: None,
            completed: false,
        };

        for (investment, share) in stakes.iter().zip(shares) {
            if !investment.is_active {
                report.skipped.push(investment.id.clone());
                continue;
            }
            match self.pay_investor(investment, share, &project_title).await {
                Ok(Some(payout)) => report.paid.push(payout),
                Ok(None) => report.skipped.push(investment.id.clone()),
                Err(err) => {
                    warn!(
                        project_id = %project_id,
                        investment_id = %investment.id,
                        investor_id = %investment.investor_id,
                        kind = err.kind(),
                        error = %err,
                        "Investor repayment failed"
                    );
                    report.failed.push(RepaymentFailure {
                        investment_id: investment.id.clone(),
                        investor_id: investment.investor_id.clone(),
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if report.failed.is_empty() {
            let (completed, commission) = self.finalize(project_id, report.profit).await?;
            report.completed = completed;
            report.commission = commission;
        }

        info!(
            project_id = %project_id,
            total = %total_repayment,
            paid = report.paid.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            completed = report.completed,
            "Repayment distribution finished"
        );
        Ok(report)
    }

    /// Validate the project, allocate shares and fix the repayment total on
    /// first use. Nothing is pinned unless the allocation succeeds.
    ///
    /// Returns None when the project has no investments at all.
    async fn pin_repayment(
        &self,
        project_id: &ProjectId,
        total_repayment: Decimal,
    ) -> Result<Option<(String, Decimal, Vec<Investment>, Vec<Decimal>)>, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let project = funding::load_in(&mut tx, project_id).await?;
        if project.status != ProjectStatus::Funded {
            return Err(LedgerError::InvalidState(format!(
                "project {} is {}, only FUNDED projects can be repaid",
                project_id, project.status
            )));
        }

        let stakes = investments::list_for_project(&mut tx, project_id).await?;
        if stakes.is_empty() {
            return Ok(None);
        }
        let amounts: Vec<Decimal> = stakes.iter().map(|i| i.amount).collect();
        let shares = allocate_pro_rata(&amounts, total_repayment, self.settlement.currency_scale)?;

        match project.repayment_total {
            Some(pinned) if pinned != total_repayment => {
                return Err(LedgerError::InvalidAmount(format!(
                    "repayment for project {} already started with total {}",
                    project_id, pinned
                )));
            }
            Some(_) => debug!(project_id = %project_id, "Resuming repayment distribution"),
            None => {
                let mut next = project.clone();
                next.repayment_total = Some(total_repayment);
                funding::save_in(&mut tx, &next, &project).await?;
            }
        }
        tx.commit().await?;

        Ok(Some((project.title, project.amount_raised, stakes, shares)))
    }

    /// Close one investment and credit its share. Returns None if another run
    /// closed it first.
    async fn pay_investor(
        &self,
        investment: &Investment,
        share: Decimal,
        project_title: &str,
    ) -> Result<Option<InvestorPayout>, LedgerError> {
        let now = TimeMs::now();
        let actual_return = share - investment.amount;

        let mut tx = self.repo.begin_write().await?;
        if !investments::close(&mut tx, &investment.id, actual_return, now).await? {
            return Ok(None);
        }

        let mut transaction_reference = None;
        if share.is_positive() {
            let posting = post_in(
                &mut tx,
                PostingRequest {
                    owner_id: &investment.investor_id,
                    direction: Direction::Credit,
                    amount: share,
                    tx_type: TransactionType::Repayment,
                    description: format!("Repayment from {}", project_title),
                    metadata: Some(serde_json::json!({
                        "projectId": investment.project_id.as_str(),
                        "investmentId": investment.id.as_str(),
                    })),
                },
                now,
            )
            .await?;
            transaction_reference = Some(posting.transaction.reference);
        }
        tx.commit().await?;

        debug!(
            investment_id = %investment.id,
            investor_id = %investment.investor_id,
            share = %share,
            actual_return = %actual_return,
            "Investor repaid"
        );

        Ok(Some(InvestorPayout {
            investment_id: investment.id.clone(),
            investor_id: investment.investor_id.clone(),
            amount_invested: investment.amount,
            share,
            actual_return,
            transaction_reference,
        }))
    }

    /// Book the profit commission and mark the project REPAID, once every
    /// investment is closed.
    async fn finalize(
        &self,
        project_id: &ProjectId,
        profit: Decimal,
    ) -> Result<(bool, Option<Commission>), LedgerError> {
        let now = TimeMs::now();
        let mut tx = self.repo.begin_write().await?;

        let project = funding::load_in(&mut tx, project_id).await?;
        if project.status == ProjectStatus::Repaid {
            // A concurrent run finished first.
            return Ok((true, None));
        }

        let open = investments::list_for_project(&mut tx, project_id)
            .await?
            .iter()
            .filter(|i| i.is_active)
            .count();
        if open > 0 {
            return Ok((false, None));
        }

        let mut commission = None;
        if profit.is_positive() && self.commission.profit_percent.is_positive() {
            let booked = Commission {
                id: Uuid::new_v4().to_string(),
                project_id: project_id.clone(),
                amount: profit
                    .percent(self.commission.profit_percent)
                    .ok_or_else(|| {
                        LedgerError::InvalidAmount(format!("profit commission on {} overflows", profit))
                    })?
                    .round_to(self.settlement.currency_scale),
                percentage: self.commission.profit_percent,
                commission_type: CommissionType::Profit,
                created_at: now,
            };
            commissions::insert(&mut tx, &booked).await?;
            commission = Some(booked);
        }

        self.tracker.mark_repaid_in(&mut tx, project_id, now).await?;
        tx.commit().await?;

        if let Some(c) = &commission {
            info!(project_id = %project_id, commission = %c.amount, "Profit commission booked");
        }
        Ok((true, commission))
    }
}
