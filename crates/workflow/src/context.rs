use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use callplan_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use callplan_core::config::WorkflowConfig;
use callplan_core::domain::user::UserId;
use callplan_core::errors::{ApplicationError, ErrorKind};
use callplan_core::notifications::{NotificationEvent, NotificationSink};
use callplan_db::repositories::{
    CustomerRepository, InMemoryCustomerRepository, InMemoryPlanRepository,
    InMemoryReportRepository, InMemoryUserRepository, PlanRepository, ReportRepository,
    SqlCustomerRepository, SqlPlanRepository, SqlReportRepository, SqlUserRepository,
    UserRepository,
};
use callplan_db::DbPool;

/// The authenticated user behind a request, plus the id that ties its log lines together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub correlation_id: String,
}

impl Caller {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, correlation_id: Uuid::new_v4().to_string() }
    }

    pub fn with_correlation_id(user_id: UserId, correlation_id: impl Into<String>) -> Self {
        Self { user_id, correlation_id: correlation_id.into() }
    }
}

/// Shared collaborators for every workflow service.
#[derive(Clone)]
pub struct WorkflowContext {
    pub users: Arc<dyn UserRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub audit: Arc<dyn AuditSink>,
    pub notifications: Arc<dyn NotificationSink>,
    pub settings: WorkflowConfig,
}

impl WorkflowContext {
    pub fn sql(
        pool: DbPool,
        audit: Arc<dyn AuditSink>,
        notifications: Arc<dyn NotificationSink>,
        settings: WorkflowConfig,
    ) -> Self {
        Self {
            users: Arc::new(SqlUserRepository::new(pool.clone())),
            customers: Arc::new(SqlCustomerRepository::new(pool.clone())),
            plans: Arc::new(SqlPlanRepository::new(pool.clone())),
            reports: Arc::new(SqlReportRepository::new(pool)),
            audit,
            notifications,
            settings,
        }
    }

    pub fn in_memory(
        audit: Arc<dyn AuditSink>,
        notifications: Arc<dyn NotificationSink>,
        settings: WorkflowConfig,
    ) -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::default()),
            customers: Arc::new(InMemoryCustomerRepository::default()),
            plans: Arc::new(InMemoryPlanRepository::default()),
            reports: Arc::new(InMemoryReportRepository::default()),
            audit,
            notifications,
            settings,
        }
    }

    /// Audits and logs the outcome of one operation, then hands the result back unchanged.
    pub(crate) fn record<T>(
        &self,
        caller: &Caller,
        event_type: &'static str,
        category: AuditCategory,
        subject_id: Option<&str>,
        result: Result<T, ApplicationError>,
    ) -> Result<T, ApplicationError> {
        let subject = subject_id.map(str::to_owned);
        match &result {
            Ok(_) => {
                info!(
                    event_name = %format!("workflow.{event_type}"),
                    correlation_id = %caller.correlation_id,
                    actor = %caller.user_id,
                    subject_id = subject_id.unwrap_or_default(),
                    "workflow operation completed"
                );
                self.audit.emit(AuditEvent::new(
                    subject,
                    &caller.correlation_id,
                    event_type,
                    category,
                    &caller.user_id.0,
                    AuditOutcome::Success,
                ));
            }
            Err(error) => {
                let kind = error.kind();
                let outcome = match kind {
                    ErrorKind::Unavailable | ErrorKind::Internal => AuditOutcome::Failed,
                    _ => AuditOutcome::Rejected,
                };
                warn!(
                    event_name = %format!("workflow.{event_type}.{}", outcome.as_str()),
                    correlation_id = %caller.correlation_id,
                    actor = %caller.user_id,
                    subject_id = subject_id.unwrap_or_default(),
                    error_kind = kind.as_str(),
                    error = %error,
                    "workflow operation refused"
                );
                self.audit.emit(
                    AuditEvent::new(
                        subject,
                        &caller.correlation_id,
                        event_type,
                        category,
                        &caller.user_id.0,
                        outcome,
                    )
                    .with_metadata("error_kind", kind.as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    /// Publishes after the write has committed. A failed publish is logged and audited only.
    pub(crate) fn notify(&self, caller: &Caller, event: NotificationEvent) {
        let kind = event.kind.as_str();
        let subject_id = event.subject_id.clone();
        if let Err(error) = self.notifications.publish(event) {
            warn!(
                event_name = "workflow.notification.publish_failed",
                correlation_id = %caller.correlation_id,
                subject_id = %subject_id,
                notification_kind = kind,
                error = %error,
                "notification could not be queued"
            );
            self.audit.emit(
                AuditEvent::new(
                    Some(subject_id),
                    &caller.correlation_id,
                    "notification.publish_failed",
                    AuditCategory::Notification,
                    &caller.user_id.0,
                    AuditOutcome::Failed,
                )
                .with_metadata("kind", kind)
                .with_metadata("error", error.to_string()),
            );
        }
    }
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
