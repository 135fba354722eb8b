use chrono::Utc;

use callplan_core::audit::AuditCategory;
use callplan_core::authorization::Authorization;
use callplan_core::domain::plan::{NewPlan, PlanId, PlanPatch, PlanStatus, PreCallPlan};
use callplan_core::errors::{ApplicationError, DomainError};
use callplan_core::notifications::NotificationEvent;

use crate::context::{new_id, Caller, WorkflowContext};
use crate::customers::CustomerService;
use crate::hierarchy::HierarchyResolver;

/// Representative-side plan operations. Decisions go through [`crate::ApprovalGateway`].
#[derive(Clone)]
pub struct PlanService {
    context: WorkflowContext,
    hierarchy: HierarchyResolver,
    customers: CustomerService,
}

impl PlanService {
    pub fn new(
        context: WorkflowContext,
        hierarchy: HierarchyResolver,
        customers: CustomerService,
    ) -> Self {
        Self { context, hierarchy, customers }
    }

    pub async fn create(
        &self,
        caller: &Caller,
        input: NewPlan,
    ) -> Result<PreCallPlan, ApplicationError> {
        let result = self.create_inner(caller, input).await;
        let subject = result.as_ref().ok().map(|plan| plan.id.0.clone());
        self.context.record(caller, "plan.created", AuditCategory::Plan, subject.as_deref(), result)
    }

    async fn create_inner(
        &self,
        caller: &Caller,
        input: NewPlan,
    ) -> Result<PreCallPlan, ApplicationError> {
        self.hierarchy.require_user(&caller.user_id).await?;
        self.customers.require_active(&input.customer_id).await?;
        if let Some(contact_id) = &input.contact_id {
            self.customers.require_contact_of(&input.customer_id, contact_id).await?;
        }

        let plan =
            PreCallPlan::draft(PlanId(new_id()), caller.user_id.clone(), input, Utc::now());
        self.context.plans.insert(plan.clone()).await?;
        Ok(plan)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        plan_id: &PlanId,
        patch: PlanPatch,
    ) -> Result<PreCallPlan, ApplicationError> {
        let result = self.update_inner(caller, plan_id, patch).await;
        self.context.record(caller, "plan.updated", AuditCategory::Plan, Some(&plan_id.0), result)
    }

    async fn update_inner(
        &self,
        caller: &Caller,
        plan_id: &PlanId,
        patch: PlanPatch,
    ) -> Result<PreCallPlan, ApplicationError> {
        let mut plan = self.load(plan_id).await?;
        Authorization::can_edit(&caller.user_id, &plan.sr_id).into_result()?;

        let revalidate = patch.touches_customer_or_contact();
        plan.apply_patch(patch, Utc::now()).map_err(DomainError::from)?;
        if revalidate {
            self.customers.require_active(&plan.customer_id).await?;
            if let Some(contact_id) = &plan.contact_id {
                self.customers.require_contact_of(&plan.customer_id, contact_id).await?;
            }
        }

        if !self.context.plans.update_draft(&plan).await? {
            return Err(self.lost_race(plan_id, "be edited").await);
        }
        Ok(plan)
    }

    /// DRAFT to PENDING. The plan enters the direct manager's queue.
    pub async fn submit(
        &self,
        caller: &Caller,
        plan_id: &PlanId,
    ) -> Result<PreCallPlan, ApplicationError> {
        let result = self.submit_inner(caller, plan_id).await;
        let result =
            self.context.record(caller, "plan.submitted", AuditCategory::Plan, Some(&plan_id.0), result);

        if let Ok(plan) = &result {
            if let Ok(owner) = self.hierarchy.require_user(&plan.sr_id).await {
                if let Some(manager_id) = owner.manager_id {
                    self.context.notify(
                        caller,
                        NotificationEvent::plan_submitted(plan, manager_id, Utc::now()),
                    );
                }
            }
        }
        result
    }

    async fn submit_inner(
        &self,
        caller: &Caller,
        plan_id: &PlanId,
    ) -> Result<PreCallPlan, ApplicationError> {
        let mut plan = self.load(plan_id).await?;
        Authorization::can_edit(&caller.user_id, &plan.sr_id).into_result()?;
        plan.submit(Utc::now()).map_err(DomainError::from)?;

        if !self.context.plans.compare_and_set_status(&plan, PlanStatus::Draft).await? {
            return Err(self.lost_race(plan_id, "be submitted").await);
        }
        Ok(plan)
    }

    pub async fn delete(&self, caller: &Caller, plan_id: &PlanId) -> Result<(), ApplicationError> {
        let result = self.delete_inner(caller, plan_id).await;
        self.context.record(caller, "plan.deleted", AuditCategory::Plan, Some(&plan_id.0), result)
    }

    async fn delete_inner(&self, caller: &Caller, plan_id: &PlanId) -> Result<(), ApplicationError> {
        let plan = self.load(plan_id).await?;
        Authorization::can_edit(&caller.user_id, &plan.sr_id).into_result()?;
        plan.ensure_deletable().map_err(DomainError::from)?;
        self.ensure_unreferenced(plan_id).await?;

        if !self.context.plans.delete_draft(plan_id).await? {
            self.ensure_unreferenced(plan_id).await?;
            return Err(self.lost_race(plan_id, "be deleted").await);
        }
        Ok(())
    }

    async fn ensure_unreferenced(&self, plan_id: &PlanId) -> Result<(), ApplicationError> {
        if self.context.reports.references_plan(plan_id).await? {
            return Err(DomainError::Conflict(format!(
                "plan `{plan_id}` anchors a call report and cannot be deleted"
            ))
            .into());
        }
        Ok(())
    }

    /// Visible to the owner and the owner's direct manager.
    pub async fn get(&self, caller: &Caller, plan_id: &PlanId) -> Result<PreCallPlan, ApplicationError> {
        let plan = self.load(plan_id).await?;
        if plan.is_owned_by(&caller.user_id) {
            return Ok(plan);
        }
        let actor = self.hierarchy.require_user(&caller.user_id).await?;
        let owner = self.hierarchy.require_user(&plan.sr_id).await?;
        Authorization::can_view(&actor, &owner).into_result()?;
        Ok(plan)
    }

    pub async fn list_mine(
        &self,
        caller: &Caller,
        status: Option<PlanStatus>,
    ) -> Result<Vec<PreCallPlan>, ApplicationError> {
        let me = self.hierarchy.require_user(&caller.user_id).await?;
        Ok(self.context.plans.list_for_representatives(&[me.id], status).await?)
    }

    /// Plans owned by the caller's direct subordinates.
    pub async fn team_plans(
        &self,
        caller: &Caller,
        status: Option<PlanStatus>,
    ) -> Result<Vec<PreCallPlan>, ApplicationError> {
        let team = self.hierarchy.subordinate_ids(&caller.user_id).await?;
        Ok(self.context.plans.list_for_representatives(&team, status).await?)
    }

    pub async fn pending_approvals(
        &self,
        caller: &Caller,
    ) -> Result<Vec<PreCallPlan>, ApplicationError> {
        self.team_plans(caller, Some(PlanStatus::Pending)).await
    }

    pub(crate) async fn load(&self, plan_id: &PlanId) -> Result<PreCallPlan, ApplicationError> {
        self.context
            .plans
            .find_by_id(plan_id)
            .await?
            .ok_or_else(|| DomainError::not_found("plan", plan_id.0.clone()).into())
    }

    /// A guarded write touched no row: report the state the winner left behind.
    pub(crate) async fn lost_race(&self, plan_id: &PlanId, action: &'static str) -> ApplicationError {
        match self.context.plans.find_by_id(plan_id).await {
            Ok(Some(current)) => {
                DomainError::invalid_state("plan", plan_id.0.clone(), current.status.as_str(), action)
                    .into()
            }
            Ok(None) => DomainError::not_found("plan", plan_id.0.clone()).into(),
            Err(error) => error.into(),
        }
    }
}
