pub mod plan;
pub mod report;

use thiserror::Error;

use crate::domain::plan::PlanStatus;
use crate::domain::report::ReportStatus;

pub use plan::{PlanAction, PlanEvent, PlanTransition};
pub use report::{ReportAction, ReportEvent, ReportTransition};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("plan in state `{state}` does not accept `{event}`")]
    InvalidPlanTransition { state: PlanStatus, event: PlanEvent },
    #[error("call report in state `{state}` does not accept `{event}`")]
    InvalidReportTransition { state: ReportStatus, event: ReportEvent },
}

impl TransitionError {
    pub fn entity(&self) -> &'static str {
        match self {
            Self::InvalidPlanTransition { .. } => "plan",
            Self::InvalidReportTransition { .. } => "call report",
        }
    }
}
