use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::{ContactId, CustomerId};
use crate::domain::{double_option, normalize_list, normalize_text};
use crate::domain::user::UserId;
use crate::lifecycle::plan::{transition, PlanEvent, PlanTransition};
use crate::lifecycle::TransitionError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown plan status `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCallPlan {
    pub id: PlanId,
    pub sr_id: UserId,
    pub customer_id: CustomerId,
    pub contact_id: Option<ContactId>,
    pub plan_date: NaiveDate,
    pub objectives: Option<String>,
    pub planned_activities: Vec<String>,
    pub status: PlanStatus,
    pub rejection_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlan {
    pub customer_id: CustomerId,
    pub contact_id: Option<ContactId>,
    pub plan_date: NaiveDate,
    pub objectives: Option<String>,
    #[serde(default)]
    pub planned_activities: Vec<String>,
}

/// Partial update for a draft plan. `contact_id: Some(None)` clears the contact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPatch {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_id: Option<Option<ContactId>>,
    #[serde(default)]
    pub plan_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub objectives: Option<Option<String>>,
    #[serde(default)]
    pub planned_activities: Option<Vec<String>>,
}

impl PlanPatch {
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none()
            && self.contact_id.is_none()
            && self.plan_date.is_none()
            && self.objectives.is_none()
            && self.planned_activities.is_none()
    }

    pub fn touches_customer_or_contact(&self) -> bool {
        self.customer_id.is_some() || self.contact_id.is_some()
    }
}

impl PreCallPlan {
    pub fn draft(id: PlanId, sr_id: UserId, input: NewPlan, now: DateTime<Utc>) -> Self {
        Self {
            id,
            sr_id,
            customer_id: input.customer_id,
            contact_id: input.contact_id,
            plan_date: input.plan_date,
            objectives: normalize_text(input.objectives),
            planned_activities: normalize_list(input.planned_activities),
            status: PlanStatus::Draft,
            rejection_reason: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.sr_id == user_id
    }

    /// Applies a content patch. Only a draft accepts edits; status never changes here.
    pub fn apply_patch(
        &mut self,
        patch: PlanPatch,
        now: DateTime<Utc>,
    ) -> Result<PlanTransition, TransitionError> {
        let outcome = transition(self.status, PlanEvent::Edit)?;
        if let Some(customer_id) = patch.customer_id {
            self.customer_id = customer_id;
        }
        if let Some(contact_id) = patch.contact_id {
            self.contact_id = contact_id;
        }
        if let Some(plan_date) = patch.plan_date {
            self.plan_date = plan_date;
        }
        if let Some(objectives) = patch.objectives {
            self.objectives = normalize_text(objectives);
        }
        if let Some(activities) = patch.planned_activities {
            self.planned_activities = normalize_list(activities);
        }
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<PlanTransition, TransitionError> {
        let outcome = transition(self.status, PlanEvent::Submit)?;
        self.status = outcome.to;
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn approve(
        &mut self,
        approver: &UserId,
        now: DateTime<Utc>,
    ) -> Result<PlanTransition, TransitionError> {
        let outcome = transition(self.status, PlanEvent::Approve)?;
        self.status = outcome.to;
        self.approved_by = Some(approver.clone());
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn reject(
        &mut self,
        approver: &UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PlanTransition, TransitionError> {
        let outcome = transition(self.status, PlanEvent::Reject)?;
        self.status = outcome.to;
        self.rejection_reason = normalize_text(reason);
        self.rejected_by = Some(approver.clone());
        self.rejected_at = Some(now);
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn ensure_deletable(&self) -> Result<PlanTransition, TransitionError> {
        transition(self.status, PlanEvent::Delete)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{NewPlan, PlanId, PlanPatch, PlanStatus, PreCallPlan};
    use crate::domain::customer::{ContactId, CustomerId};
    use crate::domain::user::UserId;
    use crate::lifecycle::TransitionError;

    fn plan() -> PreCallPlan {
        PreCallPlan::draft(
            PlanId("plan-1".to_string()),
            UserId("rep-1".to_string()),
            NewPlan {
                customer_id: CustomerId("cust-1".to_string()),
                contact_id: Some(ContactId("contact-1".to_string())),
                plan_date: NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date"),
                objectives: Some("  introduce new SKU  ".to_string()),
                planned_activities: vec!["detailing".to_string(), " ".to_string()],
            },
            Utc::now(),
        )
    }

    #[test]
    fn draft_normalizes_free_text() {
        let plan = plan();
        assert_eq!(plan.status, PlanStatus::Draft);
        assert_eq!(plan.objectives.as_deref(), Some("introduce new SKU"));
        assert_eq!(plan.planned_activities, vec!["detailing".to_string()]);
    }

    #[test]
    fn patch_keeps_status_and_can_clear_contact() {
        let mut plan = plan();
        plan.apply_patch(
            PlanPatch {
                contact_id: Some(None),
                planned_activities: Some(Vec::new()),
                ..PlanPatch::default()
            },
            Utc::now(),
        )
        .expect("draft accepts edits");

        assert_eq!(plan.status, PlanStatus::Draft);
        assert_eq!(plan.contact_id, None);
        assert!(plan.planned_activities.is_empty());
    }

    #[test]
    fn approval_records_audit_fields() {
        let mut plan = plan();
        plan.submit(Utc::now()).expect("submit");
        plan.approve(&UserId("mgr-1".to_string()), Utc::now()).expect("approve");

        assert_eq!(plan.status, PlanStatus::Approved);
        assert_eq!(plan.approved_by, Some(UserId("mgr-1".to_string())));
        assert!(plan.approved_at.is_some());
        assert!(plan.rejected_by.is_none());
    }

    #[test]
    fn rejection_records_reason_and_blank_reason_is_dropped() {
        let mut plan = plan();
        plan.submit(Utc::now()).expect("submit");
        plan.reject(&UserId("mgr-1".to_string()), Some("   ".to_string()), Utc::now())
            .expect("reject");

        assert_eq!(plan.status, PlanStatus::Rejected);
        assert_eq!(plan.rejection_reason, None);
        assert!(plan.rejected_at.is_some());
    }

    #[test]
    fn submitted_plan_refuses_edits_and_deletion() {
        let mut plan = plan();
        plan.submit(Utc::now()).expect("submit");

        let edit = plan.apply_patch(PlanPatch::default(), Utc::now());
        assert!(matches!(edit, Err(TransitionError::InvalidPlanTransition { .. })));
        assert!(plan.ensure_deletable().is_err());
    }
}
