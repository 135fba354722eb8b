use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::report::ReportStatus;
use crate::lifecycle::TransitionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportEvent {
    Edit,
    CheckOut,
    AttachPhoto,
    Delete,
    Submit,
    Coach,
}

impl ReportEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::CheckOut => "check_out",
            Self::AttachPhoto => "attach_photo",
            Self::Delete => "delete",
            Self::Submit => "submit",
            Self::Coach => "coach",
        }
    }
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    FreezeContent,
    NotifyRepresentative,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTransition {
    pub from: ReportStatus,
    pub to: ReportStatus,
    pub event: ReportEvent,
    pub actions: Vec<ReportAction>,
}

/// Reports only move forward. Once submitted, the representative's side is read-only and
/// managers may only append coaching.
pub fn transition(
    current: ReportStatus,
    event: ReportEvent,
) -> Result<ReportTransition, TransitionError> {
    use ReportEvent::{AttachPhoto, CheckOut, Coach, Delete, Edit, Submit};
    use ReportStatus::{Draft, Submitted};

    let (to, actions) = match (current, event) {
        (Draft, Edit) | (Draft, CheckOut) | (Draft, AttachPhoto) | (Draft, Delete) => {
            (Draft, Vec::new())
        }
        (Draft, Submit) => (Submitted, vec![ReportAction::FreezeContent]),
        (Submitted, Coach) => (Submitted, vec![ReportAction::NotifyRepresentative]),
        _ => return Err(TransitionError::InvalidReportTransition { state: current, event }),
    };

    Ok(ReportTransition { from: current, to, event, actions })
}
