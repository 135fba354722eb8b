//! In-memory fixture shared by the workflow unit tests.
//!
//! ```text
//! ceo
//! └── dir
//!     ├── mgr ─── rep-1 (jkt-01), rep-2 (jkt-02)
//!     └── mgr-2 ─ rep-3 (bdg-01)
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::Barrier;

use callplan_core::audit::InMemoryAuditSink;
use callplan_core::config::WorkflowConfig;
use callplan_core::domain::customer::{
    Contact, ContactId, Customer, CustomerId, GeoPoint, NewCustomer,
};
use callplan_core::domain::plan::{NewPlan, PlanId, PlanStatus, PreCallPlan};
use callplan_core::domain::user::{Role, TeamId, TerritoryId, User, UserId};
use callplan_core::notifications::{InMemoryNotificationSink, NotificationSink};
use callplan_db::repositories::{PlanRepository, RepositoryError};

use crate::context::{Caller, WorkflowContext};
use crate::WorkflowServices;

pub(crate) struct Fixture {
    pub services: WorkflowServices,
    pub context: WorkflowContext,
    pub audit: InMemoryAuditSink,
    /// Only receives events when the fixture was built without a custom sink.
    pub notifications: InMemoryNotificationSink,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_settings(WorkflowConfig::default()).await
    }

    pub async fn with_settings(settings: WorkflowConfig) -> Self {
        let notifications = InMemoryNotificationSink::default();
        Self::build(settings, Arc::new(notifications.clone()), notifications).await
    }

    pub async fn with(settings: WorkflowConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self::build(settings, sink, InMemoryNotificationSink::default()).await
    }

    async fn build(
        settings: WorkflowConfig,
        sink: Arc<dyn NotificationSink>,
        notifications: InMemoryNotificationSink,
    ) -> Self {
        let audit = InMemoryAuditSink::default();
        let context = WorkflowContext::in_memory(Arc::new(audit.clone()), sink, settings);
        seed(&context).await;
        Self { services: WorkflowServices::new(context.clone()), context, audit, notifications }
    }
}

/// Holds the first `parties` plan reads until all of them have happened, so concurrent
/// operations all load the same state before any of them writes.
pub(crate) struct RacingPlans {
    inner: Arc<dyn PlanRepository>,
    gate: Barrier,
    parties: usize,
    reads: AtomicUsize,
}

impl RacingPlans {
    pub fn new(inner: Arc<dyn PlanRepository>, parties: usize) -> Self {
        Self { inner, gate: Barrier::new(parties), parties, reads: AtomicUsize::new(0) }
    }
}

#[async_trait::async_trait]
impl PlanRepository for RacingPlans {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<PreCallPlan>, RepositoryError> {
        let plan = self.inner.find_by_id(id).await?;
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.gate.wait().await;
        }
        Ok(plan)
    }

    async fn insert(&self, plan: PreCallPlan) -> Result<(), RepositoryError> {
        self.inner.insert(plan).await
    }

    async fn update_draft(&self, plan: &PreCallPlan) -> Result<bool, RepositoryError> {
        self.inner.update_draft(plan).await
    }

    async fn compare_and_set_status(
        &self,
        plan: &PreCallPlan,
        expected: PlanStatus,
    ) -> Result<bool, RepositoryError> {
        self.inner.compare_and_set_status(plan, expected).await
    }

    async fn delete_draft(&self, id: &PlanId) -> Result<bool, RepositoryError> {
        self.inner.delete_draft(id).await
    }

    async fn delete_for_representative(&self, sr_id: &UserId) -> Result<usize, RepositoryError> {
        self.inner.delete_for_representative(sr_id).await
    }

    async fn list_for_representatives(
        &self,
        representatives: &[UserId],
        status: Option<PlanStatus>,
    ) -> Result<Vec<PreCallPlan>, RepositoryError> {
        self.inner.list_for_representatives(representatives, status).await
    }

    async fn count_by_status(
        &self,
        representatives: &[UserId],
        status: PlanStatus,
    ) -> Result<usize, RepositoryError> {
        self.inner.count_by_status(representatives, status).await
    }
}

impl Fixture {
    /// Services over the same stores whose first two plan reads wait for each other.
    pub fn racing_services(&self) -> WorkflowServices {
        let mut context = self.context.clone();
        context.plans = Arc::new(RacingPlans::new(self.context.plans.clone(), 2));
        WorkflowServices::new(context)
    }
}

pub(crate) fn id(value: &str) -> UserId {
    UserId(value.to_string())
}

pub(crate) fn caller(user: &str) -> Caller {
    Caller::with_correlation_id(id(user), format!("test-{user}"))
}

pub(crate) fn new_plan(customer: &str, contact: Option<&str>) -> NewPlan {
    NewPlan {
        customer_id: CustomerId(customer.to_string()),
        contact_id: contact.map(|value| ContactId(value.to_string())),
        plan_date: NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date"),
        objectives: Some("present the new antibiotic line".to_string()),
        planned_activities: vec!["detailing".to_string(), "sampling".to_string()],
    }
}

pub(crate) fn point() -> GeoPoint {
    GeoPoint { lat: -6.2088, lng: 106.8456 }
}

async fn seed(context: &WorkflowContext) {
    let users = [
        ("ceo", Role::Ceo, None, None),
        ("dir", Role::SalesDirector, Some("ceo"), None),
        ("mgr", Role::SalesManager, Some("dir"), None),
        ("mgr-2", Role::SalesManager, Some("dir"), None),
        ("rep-1", Role::SalesRepresentative, Some("mgr"), Some("jkt-01")),
        ("rep-2", Role::SalesRepresentative, Some("mgr"), Some("jkt-02")),
        ("rep-3", Role::SalesRepresentative, Some("mgr-2"), Some("bdg-01")),
    ];
    let seeded_at = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).single().expect("valid time");

    for (user_id, role, manager, territory) in users {
        context
            .users
            .save(User {
                id: id(user_id),
                username: user_id.to_string(),
                full_name: user_id.to_string(),
                role,
                manager_id: manager.map(id),
                territory_id: territory.map(|value| TerritoryId(value.to_string())),
                team_id: Some(TeamId("team-test".to_string())),
                active: true,
                created_at: seeded_at,
                updated_at: seeded_at,
            })
            .await
            .expect("seed user");
    }

    let customers = [
        ("c001", "C001", Some(750_000), "jkt-01", true),
        ("c002", "C002", Some(200_000), "jkt-01", true),
        ("c003", "C003", Some(45_000), "jkt-02", true),
        ("c-bdg", "BDG-1", Some(120_000), "bdg-01", true),
        ("c-closed", "CLS-1", Some(600_000), "jkt-02", false),
    ];
    for (customer_id, code, revenue, territory, active) in customers {
        let mut customer = Customer::new(
            CustomerId(customer_id.to_string()),
            NewCustomer {
                code: code.to_string(),
                name: format!("Customer {code}"),
                monthly_revenue: revenue.map(Decimal::from),
                location: Some(point()),
                territory_id: Some(TerritoryId(territory.to_string())),
                ..NewCustomer::default()
            },
            id("ceo"),
            seeded_at,
        );
        customer.active = active;
        context.customers.save(customer).await.expect("seed customer");
    }

    for (contact_id, customer_id, is_primary) in [("k1", "c001", true), ("k2", "c002", true)] {
        context
            .customers
            .save_contact(Contact {
                id: ContactId(contact_id.to_string()),
                customer_id: CustomerId(customer_id.to_string()),
                name: format!("dr. {contact_id}"),
                title: Some("Pharmacist".to_string()),
                phone: None,
                email: None,
                is_primary,
                created_at: seeded_at,
            })
            .await
            .expect("seed contact");
    }
}
