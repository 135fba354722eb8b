pub mod aggregation;
pub mod audit;
pub mod authorization;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod errors;
pub mod hierarchy;
pub mod lifecycle;
pub mod notifications;

pub use aggregation::{DashboardSnapshot, DateRange};
pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use authorization::{Authorization, AuthorizationFailure, AuthorizationResult};
pub use classifier::{classify, ServiceLevel};
pub use domain::customer::{Contact, ContactId, Customer, CustomerId, GeoPoint, Tier};
pub use domain::plan::{PlanId, PlanStatus, PreCallPlan};
pub use domain::report::{CallReport, ReportId, ReportStatus};
pub use domain::user::{Role, User, UserId};
pub use errors::{ApplicationError, DomainError, ErrorKind, InterfaceError};
pub use hierarchy::{HierarchyError, MAX_HIERARCHY_DEPTH};
pub use lifecycle::TransitionError;
pub use notifications::{NotificationEvent, NotificationKind, NotificationSink};
