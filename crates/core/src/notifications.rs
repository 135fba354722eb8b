//! Outbound notification events.
//!
//! Events are handed to a [`NotificationSink`] only after the triggering transition has been
//! persisted. Delivery is the sink's concern; a publish failure never reverses a transition.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::plan::PreCallPlan;
use crate::domain::report::CallReport;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PlanSubmitted,
    PlanApproved,
    PlanRejected,
    ReportCoached,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanSubmitted => "plan_submitted",
            Self::PlanApproved => "plan_approved",
            Self::PlanRejected => "plan_rejected",
            Self::ReportCoached => "report_coached",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub subject_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        recipient: UserId,
        kind: NotificationKind,
        subject_id: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient,
            kind,
            subject_id: subject_id.into(),
            message: message.into(),
            created_at,
        }
    }

    pub fn plan_submitted(plan: &PreCallPlan, manager_id: UserId, now: DateTime<Utc>) -> Self {
        Self::new(
            manager_id,
            NotificationKind::PlanSubmitted,
            plan.id.0.clone(),
            format!("{} submitted a pre-call plan for {}", plan.sr_id, plan.plan_date),
            now,
        )
    }

    pub fn plan_decided(plan: &PreCallPlan, approved: bool, now: DateTime<Utc>) -> Self {
        let (kind, message) = if approved {
            (
                NotificationKind::PlanApproved,
                format!("your pre-call plan for {} was approved", plan.plan_date),
            )
        } else {
            let reason = plan.rejection_reason.as_deref().unwrap_or("no reason given");
            (
                NotificationKind::PlanRejected,
                format!("your pre-call plan for {} was rejected: {reason}", plan.plan_date),
            )
        };
        Self::new(plan.sr_id.clone(), kind, plan.id.0.clone(), message, now)
    }

    pub fn report_coached(report: &CallReport, manager_id: &UserId, now: DateTime<Utc>) -> Self {
        Self::new(
            report.sr_id.clone(),
            NotificationKind::ReportCoached,
            report.id.0.clone(),
            format!("{manager_id} added coaching to your call report from {}", report.call_date),
            now,
        )
    }

    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "recipient": self.recipient.0,
            "kind": self.kind.as_str(),
            "subject_id": self.subject_id,
            "message": self.message,
            "created_at": self.created_at.to_rfc3339(),
        })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification queue is full")]
    QueueFull,
    #[error("notification channel is closed")]
    Closed,
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: NotificationEvent) -> Result<(), NotificationError>;
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl InMemoryNotificationSink {
    pub fn events(&self) -> Vec<NotificationEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn publish(&self, event: NotificationEvent) -> Result<(), NotificationError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
        Ok(())
    }
}

/// A sink that refuses every event. Used to prove delivery failures stay contained.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingNotificationSink;

impl NotificationSink for FailingNotificationSink {
    fn publish(&self, _event: NotificationEvent) -> Result<(), NotificationError> {
        Err(NotificationError::Delivery("sink unavailable".to_owned()))
    }
}
