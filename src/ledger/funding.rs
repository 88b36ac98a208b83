//! Project Funding Tracker: requested vs. raised amounts and status transitions.

use crate::config::CommissionConfig;
use crate::db::repo::{commissions, projects};
use crate::db::Repository;
use crate::domain::{
    CallerContext, Commission, CommissionType, Decimal, Decision, NewProject, Project, ProjectId,
    ProjectStatus, Role, TimeMs,
};
use crate::error::LedgerError;
use sqlx::sqlite::SqliteConnection;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ProjectFundingTracker {
    repo: Arc<Repository>,
    commission: CommissionConfig,
    currency_scale: u32,
}

impl ProjectFundingTracker {
    pub fn new(repo: Arc<Repository>, commission: CommissionConfig, currency_scale: u32) -> Self {
        Self {
            repo,
            commission,
            currency_scale,
        }
    }

    pub async fn project(&self, id: &ProjectId) -> Result<Project, LedgerError> {
        self.repo
            .project(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("project {}", id)))
    }

    pub async fn projects(
        &self,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Project>, LedgerError> {
        Ok(self.repo.projects(status).await?)
    }

    pub async fn commissions(&self, id: &ProjectId) -> Result<Vec<Commission>, LedgerError> {
        Ok(self.repo.commissions(id).await?)
    }

    /// A business owner submits a project for review.
    pub async fn create_project(
        &self,
        caller: &CallerContext,
        input: NewProject,
    ) -> Result<Project, LedgerError> {
        caller.require_role(Role::Business)?;
        input.validate()?;
        if input.amount_requested.fractional_digits() > self.currency_scale {
            return Err(LedgerError::InvalidAmount(format!(
                "amountRequested has more than {} decimal places",
                self.currency_scale
            )));
        }

        let project = Project {
            id: ProjectId::generate(),
            business_owner_id: caller.user_id.clone(),
            title: input.title.trim().to_string(),
            description: input.description,
            amount_requested: input.amount_requested,
            amount_raised: Decimal::zero(),
            duration: input.duration,
            expected_roi: input.expected_roi,
            status: ProjectStatus::Pending,
            is_active: true,
            rejection_reason: None,
            repayment_total: None,
            created_at: TimeMs::now(),
            approved_at: None,
            funded_at: None,
            repaid_at: None,
        };

        let mut tx = self.repo.begin_write().await?;
        projects::insert(&mut tx, &project).await?;
        tx.commit().await?;

        info!(
            project_id = %project.id,
            owner_id = %project.business_owner_id,
            amount_requested = %project.amount_requested,
            "Project submitted"
        );
        Ok(project)
    }

    /// Admin decision on a pending project.
    pub async fn approve(
        &self,
        caller: &CallerContext,
        id: &ProjectId,
        decision: Decision,
        reason: Option<String>,
    ) -> Result<Project, LedgerError> {
        caller.require_role(Role::Admin)?;

        let mut tx = self.repo.begin_write().await?;
        let current = load_in(&mut tx, id).await?;
        if current.status != ProjectStatus::Pending {
            return Err(LedgerError::InvalidState(format!(
                "project {} is {}, only PENDING projects can be decided",
                id, current.status
            )));
        }

        let mut next = current.clone();
        match decision {
            Decision::Approve => {
                next.status = ProjectStatus::Approved;
                next.approved_at = Some(TimeMs::now());
            }
            Decision::Reject => {
                next.status = ProjectStatus::Rejected;
                next.is_active = false;
                next.rejection_reason = reason.filter(|r| !r.trim().is_empty());
            }
        }
        save_in(&mut tx, &next, &current).await?;
        tx.commit().await?;

        info!(project_id = %id, status = %next.status, admin_id = %caller.user_id, "Project decided");
        Ok(next)
    }

    /// Withdraw a project that has not taken any money yet.
    pub async fn cancel(
        &self,
        caller: &CallerContext,
        id: &ProjectId,
    ) -> Result<Project, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let current = load_in(&mut tx, id).await?;

        let is_owner = caller.role == Role::Business && caller.user_id == current.business_owner_id;
        if !is_owner && caller.role != Role::Admin {
            return Err(LedgerError::Forbidden(format!(
                "only the owner or an admin may cancel project {}",
                id
            )));
        }
        if !current.status.can_transition_to(ProjectStatus::Cancelled) {
            return Err(LedgerError::InvalidState(format!(
                "project {} is {} and cannot be cancelled",
                id, current.status
            )));
        }
        if !current.amount_raised.is_zero() {
            return Err(LedgerError::InvalidState(format!(
                "project {} already raised {}",
                id, current.amount_raised
            )));
        }

        let mut next = current.clone();
        next.status = ProjectStatus::Cancelled;
        next.is_active = false;
        save_in(&mut tx, &next, &current).await?;
        tx.commit().await?;

        info!(project_id = %id, by = %caller.user_id, "Project cancelled");
        Ok(next)
    }

    /// Add `amount` to the raised total as its own unit of work.
    pub async fn record_investment(
        &self,
        id: &ProjectId,
        amount: Decimal,
    ) -> Result<Project, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let project = self
            .record_investment_in(&mut tx, id, amount, TimeMs::now())
            .await?;
        tx.commit().await?;
        Ok(project)
    }

    /// Add `amount` to the raised total inside an open unit of work.
    ///
    /// Flips the project to FUNDED when the target is met and books the funding
    /// commission, if one is configured, in the same unit.
    pub(crate) async fn record_investment_in(
        &self,
        conn: &mut SqliteConnection,
        id: &ProjectId,
        amount: Decimal,
        now: TimeMs,
    ) -> Result<Project, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "investment amount must be greater than zero, got {}",
                amount
            )));
        }

        let current = load_in(conn, id).await?;
        if !current.is_fundable() {
            return Err(LedgerError::InvalidState(format!(
                "project {} is {} and not accepting investments",
                id, current.status
            )));
        }
        let remaining = current.remaining();
        if amount > remaining {
            return Err(LedgerError::CapacityExceeded {
                remaining: remaining.to_canonical_string(),
                requested: amount.to_canonical_string(),
            });
        }

        let mut next = current.clone();
        next.amount_raised = current.amount_raised + amount;
        if next.amount_raised == next.amount_requested {
            next.status = ProjectStatus::Funded;
            next.funded_at = Some(now);
        }
        save_in(conn, &next, &current).await?;

        if next.status == ProjectStatus::Funded {
            info!(project_id = %id, raised = %next.amount_raised, "Project fully funded");
            if self.commission.funding_percent.is_positive() {
                let commission = Commission {
                    id: Uuid::new_v4().to_string(),
                    project_id: id.clone(),
                    amount: next
                        .amount_requested
                        .percent(self.commission.funding_percent)
                        .ok_or_else(|| {
                            LedgerError::InvalidAmount(format!(
                                "funding commission on {} overflows",
                                next.amount_requested
                            ))
                        })?
                        .round_to(self.currency_scale),
                    percentage: self.commission.funding_percent,
                    commission_type: CommissionType::Funding,
                    created_at: now,
                };
                commissions::insert(conn, &commission).await?;
            }
        }

        Ok(next)
    }

    /// Close out a funded project as its own unit of work.
    pub async fn mark_repaid(&self, id: &ProjectId) -> Result<Project, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let project = self.mark_repaid_in(&mut tx, id, TimeMs::now()).await?;
        tx.commit().await?;
        Ok(project)
    }

    pub(crate) async fn mark_repaid_in(
        &self,
        conn: &mut SqliteConnection,
        id: &ProjectId,
        now: TimeMs,
    ) -> Result<Project, LedgerError> {
        let current = load_in(conn, id).await?;
        if current.status != ProjectStatus::Funded {
            warn!(project_id = %id, status = %current.status, "mark_repaid on non-funded project");
            return Err(LedgerError::InvalidState(format!(
                "project {} is {}, only FUNDED projects can be repaid",
                id, current.status
            )));
        }

        let mut next = current.clone();
        next.status = ProjectStatus::Repaid;
        next.repaid_at = Some(now);
        save_in(conn, &next, &current).await?;
        Ok(next)
    }
}

pub(crate) async fn load_in(
    conn: &mut SqliteConnection,
    id: &ProjectId,
) -> Result<Project, LedgerError> {
    projects::fetch(conn, id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("project {}", id)))
}

/// Persist `next`, guarded on `prev` still being the stored state.
pub(crate) async fn save_in(
    conn: &mut SqliteConnection,
    next: &Project,
    prev: &Project,
) -> Result<(), LedgerError> {
    if next.status != prev.status && !prev.status.can_transition_to(next.status) {
        return Err(LedgerError::InvalidState(format!(
            "project {} cannot move from {} to {}",
            prev.id, prev.status, next.status
        )));
    }
    let saved = projects::save_if_unchanged(conn, next, prev.status, prev.amount_raised).await?;
    if !saved {
        return Err(LedgerError::Conflict(format!(
            "project {} changed during update",
            prev.id
        )));
    }
    Ok(())
}
