use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::{ContactId, CustomerId, GeoPoint};
use crate::domain::plan::PlanId;
use crate::domain::user::UserId;
use crate::domain::{double_option, normalize_list, normalize_text};
use crate::lifecycle::report::{transition, ReportEvent, ReportTransition};
use crate::lifecycle::TransitionError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Submitted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            other => Err(format!("unknown report status `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallActivityType {
    FaceToFace,
    Virtual,
}

impl CallActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FaceToFace => "face_to_face",
            Self::Virtual => "virtual",
        }
    }
}

impl std::str::FromStr for CallActivityType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "face_to_face" => Ok(Self::FaceToFace),
            "virtual" => Ok(Self::Virtual),
            other => Err(format!("unknown call activity type `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoCategory {
    Product,
    Display,
    Store,
    Other,
}

impl PhotoCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Display => "display",
            Self::Store => "store",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for PhotoCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(Self::Product),
            "display" => Ok(Self::Display),
            "store" => Ok(Self::Store),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown photo category `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub category: PhotoCategory,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingRecord {
    pub id: String,
    pub manager_id: UserId,
    pub comment: String,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallReport {
    pub id: ReportId,
    pub sr_id: UserId,
    pub customer_id: CustomerId,
    pub contact_id: Option<ContactId>,
    pub pre_call_plan_id: Option<PlanId>,
    pub call_date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub check_in_location: GeoPoint,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_out_location: Option<GeoPoint>,
    pub call_activity_type: CallActivityType,
    pub activities_done: Vec<String>,
    pub notes: Option<String>,
    pub next_action: Option<String>,
    pub is_planned: bool,
    pub status: ReportStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub photos: Vec<Photo>,
    pub coaching: Vec<CoachingRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub customer_id: CustomerId,
    pub contact_id: Option<ContactId>,
    pub pre_call_plan_id: Option<PlanId>,
    pub location: GeoPoint,
    pub call_activity_type: CallActivityType,
    #[serde(default)]
    pub activities_done: Vec<String>,
    #[serde(default)]
    pub is_planned: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub contact_id: Option<Option<ContactId>>,
    #[serde(default)]
    pub call_activity_type: Option<CallActivityType>,
    #[serde(default)]
    pub activities_done: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub next_action: Option<Option<String>>,
}

impl CallReport {
    pub fn check_in(
        id: ReportId,
        sr_id: UserId,
        input: CheckIn,
        now: DateTime<Utc>,
    ) -> Self {
        let is_planned = input.is_planned || input.pre_call_plan_id.is_some();
        Self {
            id,
            sr_id,
            customer_id: input.customer_id,
            contact_id: input.contact_id,
            pre_call_plan_id: input.pre_call_plan_id,
            call_date: now.date_naive(),
            check_in_time: now,
            check_in_location: input.location,
            check_out_time: None,
            check_out_location: None,
            call_activity_type: input.call_activity_type,
            activities_done: normalize_list(input.activities_done),
            notes: None,
            next_action: None,
            is_planned,
            status: ReportStatus::Draft,
            submitted_at: None,
            photos: Vec::new(),
            coaching: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.sr_id == user_id
    }

    /// Minutes between check-in and check-out, when the visit has been closed.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.check_out_time.map(|out| (out - self.check_in_time).num_minutes().max(0))
    }

    pub fn apply_patch(
        &mut self,
        patch: ReportPatch,
        now: DateTime<Utc>,
    ) -> Result<ReportTransition, TransitionError> {
        let outcome = transition(self.status, ReportEvent::Edit)?;
        if let Some(contact_id) = patch.contact_id {
            self.contact_id = contact_id;
        }
        if let Some(activity_type) = patch.call_activity_type {
            self.call_activity_type = activity_type;
        }
        if let Some(activities) = patch.activities_done {
            self.activities_done = normalize_list(activities);
        }
        if let Some(notes) = patch.notes {
            self.notes = normalize_text(notes);
        }
        if let Some(next_action) = patch.next_action {
            self.next_action = normalize_text(next_action);
        }
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn check_out(
        &mut self,
        at: DateTime<Utc>,
        location: GeoPoint,
        now: DateTime<Utc>,
    ) -> Result<ReportTransition, TransitionError> {
        let outcome = transition(self.status, ReportEvent::CheckOut)?;
        self.check_out_time = Some(at);
        self.check_out_location = Some(location);
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn attach_photo(
        &mut self,
        photo: Photo,
        now: DateTime<Utc>,
    ) -> Result<ReportTransition, TransitionError> {
        let outcome = transition(self.status, ReportEvent::AttachPhoto)?;
        self.photos.push(photo);
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<ReportTransition, TransitionError> {
        let outcome = transition(self.status, ReportEvent::Submit)?;
        self.status = outcome.to;
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn add_coaching(
        &mut self,
        record: CoachingRecord,
        now: DateTime<Utc>,
    ) -> Result<ReportTransition, TransitionError> {
        let outcome = transition(self.status, ReportEvent::Coach)?;
        self.coaching.push(record);
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn ensure_deletable(&self) -> Result<ReportTransition, TransitionError> {
        transition(self.status, ReportEvent::Delete)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{
        CallActivityType, CallReport, CheckIn, CoachingRecord, ReportId, ReportPatch,
        ReportStatus,
    };
    use crate::domain::customer::{CustomerId, GeoPoint};
    use crate::domain::plan::PlanId;
    use crate::domain::user::UserId;

    fn report(plan: Option<PlanId>) -> CallReport {
        CallReport::check_in(
            ReportId("rpt-1".to_string()),
            UserId("rep-1".to_string()),
            CheckIn {
                customer_id: CustomerId("cust-1".to_string()),
                contact_id: None,
                pre_call_plan_id: plan,
                location: GeoPoint { lat: -6.2, lng: 106.8 },
                call_activity_type: CallActivityType::FaceToFace,
                activities_done: vec!["sampling".to_string()],
                is_planned: false,
            },
            Utc::now(),
        )
    }

    #[test]
    fn linking_a_plan_marks_the_visit_planned() {
        assert!(report(Some(PlanId("plan-1".to_string()))).is_planned);
        assert!(!report(None).is_planned);
    }

    #[test]
    fn duration_is_derived_from_check_in_and_check_out() {
        let mut report = report(None);
        assert_eq!(report.duration_minutes(), None);

        let out = report.check_in_time + Duration::minutes(42);
        report.check_out(out, GeoPoint { lat: -6.21, lng: 106.81 }, Utc::now()).expect("draft");

        assert_eq!(report.duration_minutes(), Some(42));
        assert_eq!(report.status, ReportStatus::Draft);
    }

    #[test]
    fn submitted_report_is_frozen_but_accepts_coaching() {
        let mut report = report(None);
        report.submit(Utc::now()).expect("submit");

        assert!(report.apply_patch(ReportPatch::default(), Utc::now()).is_err());
        assert!(report.ensure_deletable().is_err());
        assert!(report.submit(Utc::now()).is_err());

        report
            .add_coaching(
                CoachingRecord {
                    id: "coach-1".to_string(),
                    manager_id: UserId("mgr-1".to_string()),
                    comment: "Open with the clinical data next time".to_string(),
                    rating: Some(4),
                    created_at: Utc::now(),
                },
                Utc::now(),
            )
            .expect("coaching after submit");
        assert_eq!(report.coaching.len(), 1);
    }

    #[test]
    fn draft_report_rejects_coaching() {
        let mut report = report(None);
        let record = CoachingRecord {
            id: "coach-1".to_string(),
            manager_id: UserId("mgr-1".to_string()),
            comment: "too early".to_string(),
            rating: None,
            created_at: Utc::now(),
        };
        assert!(report.add_coaching(record, Utc::now()).is_err());
    }
}
