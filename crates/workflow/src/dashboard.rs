use chrono::Utc;
use tracing::debug;

use callplan_core::aggregation::{compute_dashboard, DashboardInput, DashboardSnapshot, DateRange};
use callplan_core::domain::plan::PlanStatus;
use callplan_core::domain::report::ReportStatus;
use callplan_core::domain::user::UserId;
use callplan_core::errors::ApplicationError;

use crate::context::{Caller, WorkflowContext};
use crate::hierarchy::HierarchyResolver;

/// Read-only team rollups for a manager.
#[derive(Clone)]
pub struct DashboardService {
    context: WorkflowContext,
    hierarchy: HierarchyResolver,
}

impl DashboardService {
    pub fn new(context: WorkflowContext, hierarchy: HierarchyResolver) -> Self {
        Self { context, hierarchy }
    }

    /// Today and month counts ignore `range`; totals, coverage, and performance respect it.
    pub async fn snapshot(
        &self,
        caller: &Caller,
        range: Option<DateRange>,
    ) -> Result<DashboardSnapshot, ApplicationError> {
        let subordinates = self.hierarchy.direct_subordinates(&caller.user_id).await?;
        let team: Vec<UserId> = subordinates.iter().map(|user| user.id.clone()).collect();

        let (reports, customers, pending_approvals) = if team.is_empty() {
            (Vec::new(), Vec::new(), 0)
        } else {
            let territories = HierarchyResolver::territories_of(&subordinates);
            (
                self.context
                    .reports
                    .list_for_representatives(&team, Some(ReportStatus::Submitted), None)
                    .await?,
                self.context.customers.list_active_in_territories(&territories).await?,
                self.context.plans.count_by_status(&team, PlanStatus::Pending).await?,
            )
        };

        let snapshot = compute_dashboard(DashboardInput {
            manager_id: &caller.user_id,
            subordinates: &subordinates,
            reports: &reports,
            customers: &customers,
            pending_approvals,
            range,
            today: Utc::now().date_naive(),
        });

        debug!(
            event_name = "workflow.dashboard.computed",
            correlation_id = %caller.correlation_id,
            manager_id = %caller.user_id,
            team_size = team.len(),
            total_calls = snapshot.total_calls,
            "dashboard snapshot computed"
        );
        Ok(snapshot)
    }
}
