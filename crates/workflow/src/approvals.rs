//! The manager's decision on a pending plan.
//!
//! Checks run in a fixed order so callers can tell the failures apart: an unknown plan is
//! NotFound, a plan that is not PENDING is InvalidState, and only then is the approver's
//! authority checked (Forbidden). The status write is conditional on PENDING; losing that race
//! to a concurrent decision is reported as InvalidState.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use callplan_core::audit::AuditCategory;
use callplan_core::authorization::Authorization;
use callplan_core::domain::plan::{PlanId, PlanStatus, PreCallPlan};
use callplan_core::errors::{ApplicationError, DomainError};
use callplan_core::notifications::NotificationEvent;

use crate::context::{Caller, WorkflowContext};
use crate::hierarchy::HierarchyResolver;
use crate::plans::PlanService;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Decision {
    pub fn approve() -> Self {
        Self { action: DecisionAction::Approve, reason: None }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self { action: DecisionAction::Reject, reason: Some(reason.into()) }
    }
}

#[derive(Clone)]
pub struct ApprovalGateway {
    context: WorkflowContext,
    hierarchy: HierarchyResolver,
    plans: PlanService,
}

impl ApprovalGateway {
    pub fn new(context: WorkflowContext, hierarchy: HierarchyResolver, plans: PlanService) -> Self {
        Self { context, hierarchy, plans }
    }

    pub async fn decide(
        &self,
        caller: &Caller,
        plan_id: &PlanId,
        decision: Decision,
    ) -> Result<PreCallPlan, ApplicationError> {
        let action = decision.action;
        let result = self.decide_inner(caller, plan_id, decision).await;
        let event_type = match action {
            DecisionAction::Approve => "approval.plan_approved",
            DecisionAction::Reject => "approval.plan_rejected",
        };
        let result =
            self.context.record(caller, event_type, AuditCategory::Approval, Some(&plan_id.0), result);

        if let Ok(plan) = &result {
            self.context.notify(
                caller,
                NotificationEvent::plan_decided(plan, action == DecisionAction::Approve, Utc::now()),
            );
        }
        result
    }

    async fn decide_inner(
        &self,
        caller: &Caller,
        plan_id: &PlanId,
        decision: Decision,
    ) -> Result<PreCallPlan, ApplicationError> {
        let mut plan = self.plans.load(plan_id).await?;
        if plan.status != PlanStatus::Pending {
            return Err(DomainError::invalid_state(
                "plan",
                plan_id.0.clone(),
                plan.status.as_str(),
                "be decided",
            )
            .into());
        }

        let approver = self.hierarchy.require_user(&caller.user_id).await?;
        let owner = self.hierarchy.require_user(&plan.sr_id).await?;
        Authorization::can_approve(&approver, &owner).into_result()?;

        let now = Utc::now();
        match decision.action {
            DecisionAction::Approve => {
                plan.approve(&approver.id, now).map_err(DomainError::from)?;
            }
            DecisionAction::Reject => {
                let blank = decision.reason.as_deref().map_or(true, |reason| reason.trim().is_empty());
                if blank && self.context.settings.require_rejection_reason {
                    return Err(DomainError::Validation(
                        "a rejection needs a non-empty reason".to_owned(),
                    )
                    .into());
                }
                plan.reject(&approver.id, decision.reason, now).map_err(DomainError::from)?;
            }
        }

        if !self.context.plans.compare_and_set_status(&plan, PlanStatus::Pending).await? {
            return Err(self.plans.lost_race(plan_id, "be decided").await);
        }
        Ok(plan)
    }
}
