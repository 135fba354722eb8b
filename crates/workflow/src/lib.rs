//! Workflow services for pre-call plans and call reports.
//!
//! Every service shares one [`WorkflowContext`]: repositories, the audit sink, the notification
//! sink, and workflow settings. Each mutating operation:
//! 1. validates references and ownership,
//! 2. applies the lifecycle transition from `callplan-core`,
//! 3. persists it with a status-guarded write (losing a race is InvalidState),
//! 4. audits the outcome, accepted or rejected,
//! 5. publishes any notification on a best-effort basis.
//!
//! Manager-facing reads are scoped to the caller's direct subordinates via
//! [`HierarchyResolver`].

pub mod approvals;
pub mod context;
pub mod customers;
pub mod dashboard;
pub mod hierarchy;
pub mod plans;
pub mod reports;
pub mod users;

#[cfg(test)]
mod testing;

pub use approvals::{ApprovalGateway, Decision, DecisionAction};
pub use context::{Caller, WorkflowContext};
pub use customers::CustomerService;
pub use dashboard::DashboardService;
pub use hierarchy::HierarchyResolver;
pub use plans::PlanService;
pub use reports::{CheckOut, NewCoaching, NewPhoto, ReportService};
pub use users::{NewUser, UserAdministration};

/// The full service graph over one context.
#[derive(Clone)]
pub struct WorkflowServices {
    pub hierarchy: HierarchyResolver,
    pub users: UserAdministration,
    pub customers: CustomerService,
    pub plans: PlanService,
    pub approvals: ApprovalGateway,
    pub reports: ReportService,
    pub dashboard: DashboardService,
}

impl WorkflowServices {
    pub fn new(context: WorkflowContext) -> Self {
        let hierarchy = HierarchyResolver::new(context.users.clone());
        let users = UserAdministration::new(context.clone(), hierarchy.clone());
        let customers = CustomerService::new(context.clone());
        let plans = PlanService::new(context.clone(), hierarchy.clone(), customers.clone());
        let approvals = ApprovalGateway::new(context.clone(), hierarchy.clone(), plans.clone());
        let reports =
            ReportService::new(context.clone(), hierarchy.clone(), customers.clone(), plans.clone());
        let dashboard = DashboardService::new(context, hierarchy.clone());

        Self { hierarchy, users, customers, plans, approvals, reports, dashboard }
    }
}
