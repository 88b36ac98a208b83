//! Investor commitments against a project.

use crate::domain::{Decimal, InvestmentId, ProjectId, ProjectStatus, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// One investor's stake in one project. At most one per (investor, project).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: InvestmentId,
    pub investor_id: UserId,
    pub project_id: ProjectId,
    pub amount: Decimal,
    /// `amount * expectedROI / 100`, fixed at creation.
    pub expected_return: Decimal,
    /// Set at repayment: share received minus amount invested.
    pub actual_return: Option<Decimal>,
    /// True until repaid.
    pub is_active: bool,
    pub created_at: TimeMs,
    pub repaid_at: Option<TimeMs>,
}

/// Investment joined with display fields of the investor's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentSummary {
    #[serde(flatten)]
    pub investment: Investment,
    pub project_title: String,
    pub project_status: ProjectStatus,
    #[serde(rename = "projectExpectedROI")]
    pub project_expected_roi: Decimal,
    pub investor_balance: Decimal,
}

/// Aggregated position of an investor across projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub investor_id: Option<UserId>,
    pub total_invested: Decimal,
    pub active_invested: Decimal,
    pub expected_return: Decimal,
    pub realized_return: Decimal,
    pub active_count: usize,
    pub closed_count: usize,
}

impl Portfolio {
    pub fn from_investments(investor_id: UserId, investments: &[Investment]) -> Self {
        let mut portfolio = Portfolio {
            investor_id: Some(investor_id),
            ..Default::default()
        };
        for inv in investments {
            portfolio.total_invested += inv.amount;
            portfolio.expected_return += inv.expected_return;
            if inv.is_active {
                portfolio.active_invested += inv.amount;
                portfolio.active_count += 1;
            } else {
                portfolio.closed_count += 1;
            }
            if let Some(actual) = inv.actual_return {
                portfolio.realized_return += actual;
            }
        }
        portfolio
    }
}
