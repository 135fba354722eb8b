//! Call report lifecycle: check-in, draft edits, check-out, submission, and coaching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use callplan_core::aggregation::DateRange;
use callplan_core::audit::AuditCategory;
use callplan_core::authorization::Authorization;
use callplan_core::domain::customer::GeoPoint;
use callplan_core::domain::plan::PlanStatus;
use callplan_core::domain::report::{
    CallReport, CheckIn, CoachingRecord, Photo, PhotoCategory, ReportId, ReportPatch,
    ReportStatus,
};
use callplan_core::errors::{ApplicationError, DomainError};
use callplan_core::notifications::NotificationEvent;

use crate::context::{new_id, Caller, WorkflowContext};
use crate::customers::CustomerService;
use crate::hierarchy::HierarchyResolver;
use crate::plans::PlanService;

const MAX_COACHING_RATING: u8 = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckOut {
    /// Defaults to the time of the call.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
    pub location: GeoPoint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPhoto {
    pub category: PhotoCategory,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCoaching {
    pub comment: String,
    #[serde(default)]
    pub rating: Option<u8>,
}

#[derive(Clone)]
pub struct ReportService {
    context: WorkflowContext,
    hierarchy: HierarchyResolver,
    customers: CustomerService,
    plans: PlanService,
}

impl ReportService {
    pub fn new(
        context: WorkflowContext,
        hierarchy: HierarchyResolver,
        customers: CustomerService,
        plans: PlanService,
    ) -> Self {
        Self { context, hierarchy, customers, plans }
    }

    /// Opens a DRAFT report at the caller's current position.
    ///
    /// A linked plan must be the caller's own and point at the same customer. Its contact is
    /// inherited when the check-in names none; naming a different one is a Conflict.
    pub async fn check_in(
        &self,
        caller: &Caller,
        input: CheckIn,
    ) -> Result<CallReport, ApplicationError> {
        let result = self.check_in_inner(caller, input).await;
        let subject = result.as_ref().ok().map(|report| report.id.0.clone());
        self.context.record(
            caller,
            "report.checked_in",
            AuditCategory::Report,
            subject.as_deref(),
            result,
        )
    }

    async fn check_in_inner(
        &self,
        caller: &Caller,
        mut input: CheckIn,
    ) -> Result<CallReport, ApplicationError> {
        if !input.location.is_valid() {
            return Err(DomainError::Validation("check-in location is out of range".to_owned()).into());
        }
        self.hierarchy.require_user(&caller.user_id).await?;
        self.customers.require_active(&input.customer_id).await?;

        if let Some(plan_id) = &input.pre_call_plan_id {
            let plan = self.plans.load(plan_id).await?;
            if !plan.is_owned_by(&caller.user_id) {
                return Err(DomainError::Forbidden(format!(
                    "plan `{plan_id}` belongs to another representative"
                ))
                .into());
            }
            if self.context.settings.require_approved_plan_for_check_in
                && plan.status != PlanStatus::Approved
            {
                return Err(DomainError::invalid_state(
                    "plan",
                    plan_id.0.clone(),
                    plan.status.as_str(),
                    "anchor a check-in",
                )
                .into());
            }
            if plan.customer_id != input.customer_id {
                return Err(DomainError::Conflict(format!(
                    "plan `{plan_id}` is for customer `{}`, not `{}`",
                    plan.customer_id, input.customer_id
                ))
                .into());
            }
            if let Some(planned) = plan.contact_id {
                if let Some(given) = &input.contact_id {
                    if given != &planned {
                        return Err(DomainError::Conflict(format!(
                            "plan `{plan_id}` names contact `{planned}`, not `{given}`"
                        ))
                        .into());
                    }
                }
                input.contact_id = Some(planned);
            }
        }

        if let Some(contact_id) = &input.contact_id {
            self.customers.require_contact_of(&input.customer_id, contact_id).await?;
        }

        let report =
            CallReport::check_in(ReportId(new_id()), caller.user_id.clone(), input, Utc::now());
        self.context.reports.insert(report.clone()).await?;
        Ok(report)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        patch: ReportPatch,
    ) -> Result<CallReport, ApplicationError> {
        let result = self.update_inner(caller, report_id, patch).await;
        self.context.record(caller, "report.updated", AuditCategory::Report, Some(&report_id.0), result)
    }

    async fn update_inner(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        patch: ReportPatch,
    ) -> Result<CallReport, ApplicationError> {
        let mut report = self.load(report_id).await?;
        Authorization::can_edit(&caller.user_id, &report.sr_id).into_result()?;

        let touches_contact = patch.contact_id.is_some();
        report.apply_patch(patch, Utc::now()).map_err(DomainError::from)?;
        if touches_contact {
            self.ensure_plan_contact_kept(&report).await?;
            if let Some(contact_id) = &report.contact_id {
                self.customers.require_contact_of(&report.customer_id, contact_id).await?;
            }
        }

        if !self.context.reports.update_draft(&report).await? {
            return Err(self.lost_race(report_id, "be edited").await);
        }
        Ok(report)
    }

    /// Records where and when the visit ended. Status is unchanged.
    pub async fn check_out(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        input: CheckOut,
    ) -> Result<CallReport, ApplicationError> {
        let result = self.check_out_inner(caller, report_id, input).await;
        self.context.record(
            caller,
            "report.checked_out",
            AuditCategory::Report,
            Some(&report_id.0),
            result,
        )
    }

    async fn check_out_inner(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        input: CheckOut,
    ) -> Result<CallReport, ApplicationError> {
        if !input.location.is_valid() {
            return Err(DomainError::Validation("check-out location is out of range".to_owned()).into());
        }
        let mut report = self.load(report_id).await?;
        Authorization::can_edit(&caller.user_id, &report.sr_id).into_result()?;

        let now = Utc::now();
        let at = input.at.unwrap_or(now);
        if at < report.check_in_time {
            return Err(DomainError::Validation(format!(
                "check-out {} precedes check-in {}",
                at.to_rfc3339(),
                report.check_in_time.to_rfc3339()
            ))
            .into());
        }
        report.check_out(at, input.location, now).map_err(DomainError::from)?;

        if !self.context.reports.update_draft(&report).await? {
            return Err(self.lost_race(report_id, "be checked out").await);
        }
        Ok(report)
    }

    pub async fn attach_photo(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        input: NewPhoto,
    ) -> Result<CallReport, ApplicationError> {
        let result = self.attach_photo_inner(caller, report_id, input).await;
        self.context.record(
            caller,
            "report.photo_attached",
            AuditCategory::Report,
            Some(&report_id.0),
            result,
        )
    }

    async fn attach_photo_inner(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        input: NewPhoto,
    ) -> Result<CallReport, ApplicationError> {
        let url = input.url.trim();
        if url.is_empty() {
            return Err(DomainError::Validation("photo url is required".to_owned()).into());
        }
        let mut report = self.load(report_id).await?;
        Authorization::can_edit(&caller.user_id, &report.sr_id).into_result()?;

        let now = Utc::now();
        let photo =
            Photo { id: new_id(), category: input.category, url: url.to_owned(), uploaded_at: now };
        report.attach_photo(photo.clone(), now).map_err(DomainError::from)?;

        if !self.context.reports.add_photo(report_id, &photo).await? {
            return Err(self.lost_race(report_id, "take photos").await);
        }
        Ok(report)
    }

    /// DRAFT to SUBMITTED. The representative can no longer change the report.
    pub async fn submit(
        &self,
        caller: &Caller,
        report_id: &ReportId,
    ) -> Result<CallReport, ApplicationError> {
        let result = self.submit_inner(caller, report_id).await;
        self.context.record(caller, "report.submitted", AuditCategory::Report, Some(&report_id.0), result)
    }

    async fn submit_inner(
        &self,
        caller: &Caller,
        report_id: &ReportId,
    ) -> Result<CallReport, ApplicationError> {
        let mut report = self.load(report_id).await?;
        Authorization::can_edit(&caller.user_id, &report.sr_id).into_result()?;
        report.submit(Utc::now()).map_err(DomainError::from)?;

        if !self.context.reports.compare_and_set_status(&report, ReportStatus::Draft).await? {
            return Err(self.lost_race(report_id, "be submitted").await);
        }
        Ok(report)
    }

    pub async fn delete(&self, caller: &Caller, report_id: &ReportId) -> Result<(), ApplicationError> {
        let result = self.delete_inner(caller, report_id).await;
        self.context.record(caller, "report.deleted", AuditCategory::Report, Some(&report_id.0), result)
    }

    async fn delete_inner(&self, caller: &Caller, report_id: &ReportId) -> Result<(), ApplicationError> {
        let report = self.load(report_id).await?;
        Authorization::can_edit(&caller.user_id, &report.sr_id).into_result()?;
        report.ensure_deletable().map_err(DomainError::from)?;

        if !self.context.reports.delete_draft(report_id).await? {
            return Err(self.lost_race(report_id, "be deleted").await);
        }
        Ok(())
    }

    /// Manager feedback on a submitted report. Notifies the representative.
    pub async fn add_coaching(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        input: NewCoaching,
    ) -> Result<CallReport, ApplicationError> {
        let result = self.add_coaching_inner(caller, report_id, input).await;
        let result = self.context.record(
            caller,
            "report.coached",
            AuditCategory::Report,
            Some(&report_id.0),
            result,
        );

        if let Ok(report) = &result {
            self.context.notify(
                caller,
                NotificationEvent::report_coached(report, &caller.user_id, Utc::now()),
            );
        }
        result
    }

    async fn add_coaching_inner(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        input: NewCoaching,
    ) -> Result<CallReport, ApplicationError> {
        let mut report = self.load(report_id).await?;
        if report.status != ReportStatus::Submitted {
            return Err(DomainError::invalid_state(
                "report",
                report_id.0.clone(),
                report.status.as_str(),
                "receive coaching",
            )
            .into());
        }

        let manager = self.hierarchy.require_user(&caller.user_id).await?;
        let owner = self.hierarchy.require_user(&report.sr_id).await?;
        Authorization::can_coach(&manager, &owner).into_result()?;

        let comment = input.comment.trim();
        if comment.is_empty() {
            return Err(DomainError::Validation("coaching comment is required".to_owned()).into());
        }
        if input.rating.is_some_and(|rating| !(1..=MAX_COACHING_RATING).contains(&rating)) {
            return Err(DomainError::Validation(format!(
                "coaching rating must be between 1 and {MAX_COACHING_RATING}"
            ))
            .into());
        }

        let now = Utc::now();
        let record = CoachingRecord {
            id: new_id(),
            manager_id: manager.id,
            comment: comment.to_owned(),
            rating: input.rating,
            created_at: now,
        };
        report.add_coaching(record.clone(), now).map_err(DomainError::from)?;

        if !self.context.reports.add_coaching(report_id, &record).await? {
            return Err(self.lost_race(report_id, "receive coaching").await);
        }
        Ok(report)
    }

    /// Visible to the owner and the owner's direct manager.
    pub async fn get(
        &self,
        caller: &Caller,
        report_id: &ReportId,
    ) -> Result<CallReport, ApplicationError> {
        let report = self.load(report_id).await?;
        if report.is_owned_by(&caller.user_id) {
            return Ok(report);
        }
        let actor = self.hierarchy.require_user(&caller.user_id).await?;
        let owner = self.hierarchy.require_user(&report.sr_id).await?;
        Authorization::can_view(&actor, &owner).into_result()?;
        Ok(report)
    }

    pub async fn list_mine(
        &self,
        caller: &Caller,
        status: Option<ReportStatus>,
    ) -> Result<Vec<CallReport>, ApplicationError> {
        let me = self.hierarchy.require_user(&caller.user_id).await?;
        Ok(self.context.reports.list_for_representatives(&[me.id], status, None).await?)
    }

    /// Reports owned by the caller's direct subordinates.
    pub async fn team_reports(
        &self,
        caller: &Caller,
        status: Option<ReportStatus>,
        range: Option<DateRange>,
    ) -> Result<Vec<CallReport>, ApplicationError> {
        let team = self.hierarchy.subordinate_ids(&caller.user_id).await?;
        Ok(self.context.reports.list_for_representatives(&team, status, range).await?)
    }

    async fn load(&self, report_id: &ReportId) -> Result<CallReport, ApplicationError> {
        self.context
            .reports
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| DomainError::not_found("report", report_id.0.clone()).into())
    }

    /// A report anchored to a plan that names a contact keeps that contact.
    async fn ensure_plan_contact_kept(&self, report: &CallReport) -> Result<(), ApplicationError> {
        let Some(plan_id) = &report.pre_call_plan_id else {
            return Ok(());
        };
        let plan = self.plans.load(plan_id).await?;
        match (&plan.contact_id, &report.contact_id) {
            (Some(planned), Some(given)) if planned != given => Err(DomainError::Conflict(format!(
                "plan `{plan_id}` names contact `{planned}`, not `{given}`"
            ))
            .into()),
            (Some(planned), None) => Err(DomainError::Conflict(format!(
                "plan `{plan_id}` names contact `{planned}`; it cannot be cleared"
            ))
            .into()),
            _ => Ok(()),
        }
    }

    async fn lost_race(&self, report_id: &ReportId, action: &'static str) -> ApplicationError {
        match self.context.reports.find_by_id(report_id).await {
            Ok(Some(current)) => DomainError::invalid_state(
                "report",
                report_id.0.clone(),
                current.status.as_str(),
                action,
            )
            .into(),
            Ok(None) => DomainError::not_found("report", report_id.0.clone()).into(),
            Err(error) => error.into(),
        }
    }
}
