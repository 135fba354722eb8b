use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::plan::PlanStatus;
use crate::lifecycle::TransitionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanEvent {
    Edit,
    Delete,
    Submit,
    Approve,
    Reject,
}

impl PlanEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for PlanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    EnterApprovalQueue,
    NotifyManager,
    RecordApproval,
    RecordRejection,
    NotifyRepresentative,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTransition {
    pub from: PlanStatus,
    pub to: PlanStatus,
    pub event: PlanEvent,
    pub actions: Vec<PlanAction>,
}

impl PlanTransition {
    pub fn changes_status(&self) -> bool {
        self.from != self.to
    }
}

/// The complete plan lifecycle. Any (state, event) pair not listed is refused.
pub fn transition(current: PlanStatus, event: PlanEvent) -> Result<PlanTransition, TransitionError> {
    use PlanAction::{
        EnterApprovalQueue, NotifyManager, NotifyRepresentative, RecordApproval, RecordRejection,
    };
    use PlanEvent::{Approve, Delete, Edit, Reject, Submit};
    use PlanStatus::{Approved, Draft, Pending, Rejected};

    let (to, actions) = match (current, event) {
        (Draft, Edit) | (Draft, Delete) => (Draft, Vec::new()),
        (Draft, Submit) => (Pending, vec![EnterApprovalQueue, NotifyManager]),
        (Pending, Approve) => (Approved, vec![RecordApproval, NotifyRepresentative]),
        (Pending, Reject) => (Rejected, vec![RecordRejection, NotifyRepresentative]),
        _ => return Err(TransitionError::InvalidPlanTransition { state: current, event }),
    };

    Ok(PlanTransition { from: current, to, event, actions })
}
