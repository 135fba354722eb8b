use async_trait::async_trait;
use thiserror::Error;

use callplan_core::aggregation::DateRange;
use callplan_core::domain::customer::{Contact, ContactId, Customer, CustomerId};
use callplan_core::domain::plan::{PlanId, PlanStatus, PreCallPlan};
use callplan_core::domain::report::{CallReport, CoachingRecord, Photo, ReportId, ReportStatus};
use callplan_core::domain::user::{TerritoryId, User, UserId};
use callplan_core::errors::ApplicationError;

pub mod customer;
pub mod memory;
pub mod plan;
pub mod report;
mod rows;
pub mod user;

pub use customer::SqlCustomerRepository;
pub use memory::{
    InMemoryCustomerRepository, InMemoryPlanRepository, InMemoryReportRepository,
    InMemoryUserRepository,
};
pub use plan::SqlPlanRepository;
pub use report::SqlReportRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: User) -> Result<(), RepositoryError>;
    async fn list_direct_reports(&self, manager_id: &UserId) -> Result<Vec<User>, RepositoryError>;
    async fn count_direct_reports(&self, manager_id: &UserId) -> Result<usize, RepositoryError>;
    /// `start` followed by its managers, nearest first, bounded by the hierarchy depth limit.
    async fn manager_chain(&self, start: &UserId) -> Result<Vec<UserId>, RepositoryError>;
    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Customer>, RepositoryError>;
    async fn save(&self, customer: Customer) -> Result<(), RepositoryError>;
    async fn list_active_in_territories(
        &self,
        territories: &[TerritoryId],
    ) -> Result<Vec<Customer>, RepositoryError>;
    async fn find_contact(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError>;
    async fn list_contacts(&self, customer_id: &CustomerId) -> Result<Vec<Contact>, RepositoryError>;
    /// Stores the contact. A primary contact clears the flag on its siblings in the same write.
    async fn save_contact(&self, contact: Contact) -> Result<(), RepositoryError>;
}

/// Plan persistence. Every status change is a compare-and-set on the prior status; a `false`
/// return means another writer moved the plan first.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<PreCallPlan>, RepositoryError>;
    async fn insert(&self, plan: PreCallPlan) -> Result<(), RepositoryError>;
    async fn update_draft(&self, plan: &PreCallPlan) -> Result<bool, RepositoryError>;
    async fn compare_and_set_status(
        &self,
        plan: &PreCallPlan,
        expected: PlanStatus,
    ) -> Result<bool, RepositoryError>;
    async fn delete_draft(&self, id: &PlanId) -> Result<bool, RepositoryError>;
    async fn delete_for_representative(&self, sr_id: &UserId) -> Result<usize, RepositoryError>;
    async fn list_for_representatives(
        &self,
        representatives: &[UserId],
        status: Option<PlanStatus>,
    ) -> Result<Vec<PreCallPlan>, RepositoryError>;
    async fn count_by_status(
        &self,
        representatives: &[UserId],
        status: PlanStatus,
    ) -> Result<usize, RepositoryError>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn find_by_id(&self, id: &ReportId) -> Result<Option<CallReport>, RepositoryError>;
    async fn insert(&self, report: CallReport) -> Result<(), RepositoryError>;
    async fn update_draft(&self, report: &CallReport) -> Result<bool, RepositoryError>;
    async fn compare_and_set_status(
        &self,
        report: &CallReport,
        expected: ReportStatus,
    ) -> Result<bool, RepositoryError>;
    async fn delete_draft(&self, id: &ReportId) -> Result<bool, RepositoryError>;
    async fn delete_for_representative(&self, sr_id: &UserId) -> Result<usize, RepositoryError>;
    async fn references_plan(&self, plan_id: &PlanId) -> Result<bool, RepositoryError>;
    /// Only lands while the report is still a draft.
    async fn add_photo(&self, report_id: &ReportId, photo: &Photo) -> Result<bool, RepositoryError>;
    /// Only lands once the report has been submitted.
    async fn add_coaching(
        &self,
        report_id: &ReportId,
        record: &CoachingRecord,
    ) -> Result<bool, RepositoryError>;
    async fn list_for_representatives(
        &self,
        representatives: &[UserId],
        status: Option<ReportStatus>,
        range: Option<DateRange>,
    ) -> Result<Vec<CallReport>, RepositoryError>;
}
