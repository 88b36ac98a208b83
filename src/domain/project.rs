//! Funding projects and their lifecycle.

use crate::domain::wallet::UnknownLabel;
use crate::domain::{Decimal, ProjectId, TimeMs, UserId};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Smallest amount a project may ask for.
pub const MIN_AMOUNT_REQUESTED: i64 = 1000;
/// Allowed project duration in months.
pub const DURATION_MONTHS: std::ops::RangeInclusive<i32> = 1..=60;
/// Allowed expected ROI in percent.
pub const EXPECTED_ROI_PERCENT: std::ops::RangeInclusive<i64> = 5..=50;

/// Project lifecycle.
///
/// ```text
/// PENDING --approve--> APPROVED --fully funded--> FUNDED --repay--> REPAID
/// PENDING --reject---> REJECTED
/// PENDING|APPROVED --cancel--> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    Approved,
    Funded,
    Rejected,
    Repaid,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "PENDING",
            ProjectStatus::Approved => "APPROVED",
            ProjectStatus::Funded => "FUNDED",
            ProjectStatus::Rejected => "REJECTED",
            ProjectStatus::Repaid => "REPAID",
            ProjectStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Funded)
                | (Approved, Cancelled)
                | (Funded, Repaid)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Rejected | ProjectStatus::Repaid | ProjectStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ProjectStatus::Pending),
            "APPROVED" => Ok(ProjectStatus::Approved),
            "FUNDED" => Ok(ProjectStatus::Funded),
            "REJECTED" => Ok(ProjectStatus::Rejected),
            "REPAID" => Ok(ProjectStatus::Repaid),
            "CANCELLED" => Ok(ProjectStatus::Cancelled),
            _ => Err(UnknownLabel {
                kind: "project status",
                label: s.to_string(),
            }),
        }
    }
}

/// Admin verdict on a pending project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub business_owner_id: UserId,
    pub title: String,
    pub description: String,
    pub amount_requested: Decimal,
    pub amount_raised: Decimal,
    /// Months.
    pub duration: i32,
    /// Percent.
    #[serde(rename = "expectedROI")]
    pub expected_roi: Decimal,
    pub status: ProjectStatus,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Pinned by the first repayment distribution so resumed runs use the same figure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repayment_total: Option<Decimal>,
    pub created_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funded_at: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repaid_at: Option<TimeMs>,
}

impl Project {
    /// Capacity still open to investors.
    pub fn remaining(&self) -> Decimal {
        self.amount_requested - self.amount_raised
    }

    /// Accepting investments right now.
    pub fn is_fundable(&self) -> bool {
        self.status == ProjectStatus::Approved && self.is_active
    }
}

/// Business-owner input for a new project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount_requested: Decimal,
    pub duration: i32,
    #[serde(rename = "expectedROI")]
    pub expected_roi: Decimal,
}

impl NewProject {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::InvalidInput("title must not be empty".into()));
        }
        if self.amount_requested < Decimal::from_int(MIN_AMOUNT_REQUESTED) {
            return Err(LedgerError::InvalidAmount(format!(
                "amountRequested must be at least {}",
                MIN_AMOUNT_REQUESTED
            )));
        }
        if !DURATION_MONTHS.contains(&self.duration) {
            return Err(LedgerError::InvalidInput(format!(
                "duration must be between {} and {} months",
                DURATION_MONTHS.start(),
                DURATION_MONTHS.end()
            )));
        }
        let roi_min = Decimal::from_int(*EXPECTED_ROI_PERCENT.start());
        let roi_max = Decimal::from_int(*EXPECTED_ROI_PERCENT.end());
        if self.expected_roi < roi_min || self.expected_roi > roi_max {
            return Err(LedgerError::InvalidInput(format!(
                "expectedROI must be between {} and {} percent",
                roi_min, roi_max
            )));
        }
        Ok(())
    }
}
