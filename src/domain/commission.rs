//! Platform commission records.

use crate::domain::wallet::UnknownLabel;
use crate::domain::{Decimal, ProjectId, TimeMs};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionType {
    /// Booked when a project reaches its funding target.
    Funding,
    /// Booked on repayment profit.
    Profit,
}

impl CommissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionType::Funding => "funding",
            CommissionType::Profit => "profit",
        }
    }
}

impl FromStr for CommissionType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "funding" => Ok(CommissionType::Funding),
            "profit" => Ok(CommissionType::Profit),
            other => Err(UnknownLabel {
                kind: "commission type",
                label: other.to_string(),
            }),
        }
    }
}

/// Append-only commission entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub id: String,
    pub project_id: ProjectId,
    pub amount: Decimal,
    pub percentage: Decimal,
    #[serde(rename = "type")]
    pub commission_type: CommissionType,
    pub created_at: TimeMs,
}
