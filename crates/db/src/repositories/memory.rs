use std::collections::HashMap;

use tokio::sync::RwLock;

use callplan_core::aggregation::DateRange;
use callplan_core::domain::customer::{Contact, ContactId, Customer, CustomerId};
use callplan_core::domain::plan::{PlanId, PlanStatus, PreCallPlan};
use callplan_core::domain::report::{CallReport, CoachingRecord, Photo, ReportId, ReportStatus};
use callplan_core::domain::user::{TerritoryId, User, UserId};
use callplan_core::hierarchy::walk_chain;

use super::{
    CustomerRepository, PlanRepository, ReportRepository, RepositoryError, UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.username == username).cloned())
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.0.clone(), user);
        Ok(())
    }

    async fn list_direct_reports(&self, manager_id: &UserId) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        let mut reports: Vec<User> =
            users.values().filter(|user| user.reports_to(manager_id)).cloned().collect();
        reports.sort_by(|a, b| a.full_name.cmp(&b.full_name).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(reports)
    }

    async fn count_direct_reports(&self, manager_id: &UserId) -> Result<usize, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().filter(|user| user.reports_to(manager_id)).count())
    }

    async fn manager_chain(&self, start: &UserId) -> Result<Vec<UserId>, RepositoryError> {
        let users = self.users.read().await;
        if !users.contains_key(&start.0) {
            return Ok(Vec::new());
        }
        Ok(walk_chain(start, |current| {
            users.get(&current.0).and_then(|user| user.manager_id.clone())
        }))
    }

    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().await;
        let removed = users.remove(&id.0).is_some();
        if removed {
            for user in users.values_mut().filter(|user| user.reports_to(id)) {
                user.manager_id = None;
            }
        }
        Ok(removed)
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, Customer>>,
    contacts: RwLock<HashMap<String, Contact>>,
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.get(&id.0).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.values().find(|customer| customer.code == code).cloned())
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        customers.insert(customer.id.0.clone(), customer);
        Ok(())
    }

    async fn list_active_in_territories(
        &self,
        territories: &[TerritoryId],
    ) -> Result<Vec<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        let mut listed: Vec<Customer> = customers
            .values()
            .filter(|customer| customer.active)
            .filter(|customer| {
                customer.territory_id.as_ref().is_some_and(|territory| territories.contains(territory))
            })
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(listed)
    }

    async fn find_contact(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.get(&id.0).cloned())
    }

    async fn list_contacts(&self, customer_id: &CustomerId) -> Result<Vec<Contact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        let mut listed: Vec<Contact> =
            contacts.values().filter(|contact| contact.belongs_to(customer_id)).cloned().collect();
        listed.sort_by(|a, b| b.is_primary.cmp(&a.is_primary).then_with(|| a.name.cmp(&b.name)));
        Ok(listed)
    }

    async fn save_contact(&self, contact: Contact) -> Result<(), RepositoryError> {
        let mut contacts = self.contacts.write().await;
        if contact.is_primary {
            for sibling in contacts
                .values_mut()
                .filter(|other| other.belongs_to(&contact.customer_id) && other.id != contact.id)
            {
                sibling.is_primary = false;
            }
        }
        contacts.insert(contact.id.0.clone(), contact);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<String, PreCallPlan>>,
}

#[async_trait::async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<PreCallPlan>, RepositoryError> {
        let plans = self.plans.read().await;
        Ok(plans.get(&id.0).cloned())
    }

    async fn insert(&self, plan: PreCallPlan) -> Result<(), RepositoryError> {
        let mut plans = self.plans.write().await;
        plans.insert(plan.id.0.clone(), plan);
        Ok(())
    }

    async fn update_draft(&self, plan: &PreCallPlan) -> Result<bool, RepositoryError> {
        let mut plans = self.plans.write().await;
        match plans.get_mut(&plan.id.0) {
            Some(stored) if stored.status == PlanStatus::Draft => {
                *stored = PreCallPlan { status: PlanStatus::Draft, ..plan.clone() };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn compare_and_set_status(
        &self,
        plan: &PreCallPlan,
        expected: PlanStatus,
    ) -> Result<bool, RepositoryError> {
        let mut plans = self.plans.write().await;
        match plans.get_mut(&plan.id.0) {
            Some(stored) if stored.status == expected => {
                *stored = plan.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_draft(&self, id: &PlanId) -> Result<bool, RepositoryError> {
        let mut plans = self.plans.write().await;
        if plans.get(&id.0).is_some_and(|plan| plan.status == PlanStatus::Draft) {
            plans.remove(&id.0);
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_for_representative(&self, sr_id: &UserId) -> Result<usize, RepositoryError> {
        let mut plans = self.plans.write().await;
        let before = plans.len();
        plans.retain(|_, plan| &plan.sr_id != sr_id);
        Ok(before - plans.len())
    }

    async fn list_for_representatives(
        &self,
        representatives: &[UserId],
        status: Option<PlanStatus>,
    ) -> Result<Vec<PreCallPlan>, RepositoryError> {
        let plans = self.plans.read().await;
        let mut listed: Vec<PreCallPlan> = plans
            .values()
            .filter(|plan| representatives.contains(&plan.sr_id))
            .filter(|plan| status.map_or(true, |status| plan.status == status))
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            b.plan_date.cmp(&a.plan_date).then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(listed)
    }

    async fn count_by_status(
        &self,
        representatives: &[UserId],
        status: PlanStatus,
    ) -> Result<usize, RepositoryError> {
        let plans = self.plans.read().await;
        Ok(plans
            .values()
            .filter(|plan| plan.status == status && representatives.contains(&plan.sr_id))
            .count())
    }
}

#[derive(Default)]
pub struct InMemoryReportRepository {
    reports: RwLock<HashMap<String, CallReport>>,
}

#[async_trait::async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn find_by_id(&self, id: &ReportId) -> Result<Option<CallReport>, RepositoryError> {
        let reports = self.reports.read().await;
        Ok(reports.get(&id.0).cloned())
    }

    async fn insert(&self, report: CallReport) -> Result<(), RepositoryError> {
        let mut reports = self.reports.write().await;
        reports.insert(report.id.0.clone(), report);
        Ok(())
    }

    async fn update_draft(&self, report: &CallReport) -> Result<bool, RepositoryError> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&report.id.0) {
            Some(stored) if stored.status == ReportStatus::Draft => {
                // Children are written through add_photo / add_coaching only.
                let photos = std::mem::take(&mut stored.photos);
                let coaching = std::mem::take(&mut stored.coaching);
                *stored = CallReport {
                    status: ReportStatus::Draft,
                    photos,
                    coaching,
                    ..report.clone()
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn compare_and_set_status(
        &self,
        report: &CallReport,
        expected: ReportStatus,
    ) -> Result<bool, RepositoryError> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&report.id.0) {
            Some(stored) if stored.status == expected => {
                stored.status = report.status;
                stored.submitted_at = report.submitted_at;
                stored.updated_at = report.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_draft(&self, id: &ReportId) -> Result<bool, RepositoryError> {
        let mut reports = self.reports.write().await;
        if reports.get(&id.0).is_some_and(|report| report.status == ReportStatus::Draft) {
            reports.remove(&id.0);
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_for_representative(&self, sr_id: &UserId) -> Result<usize, RepositoryError> {
        let mut reports = self.reports.write().await;
        let before = reports.len();
        reports.retain(|_, report| &report.sr_id != sr_id);
        Ok(before - reports.len())
    }

    async fn references_plan(&self, plan_id: &PlanId) -> Result<bool, RepositoryError> {
        let reports = self.reports.read().await;
        Ok(reports.values().any(|report| report.pre_call_plan_id.as_ref() == Some(plan_id)))
    }

    async fn add_photo(&self, report_id: &ReportId, photo: &Photo) -> Result<bool, RepositoryError> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&report_id.0) {
            Some(stored) if stored.status == ReportStatus::Draft => {
                stored.photos.push(photo.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_coaching(
        &self,
        report_id: &ReportId,
        record: &CoachingRecord,
    ) -> Result<bool, RepositoryError> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&report_id.0) {
            Some(stored) if stored.status == ReportStatus::Submitted => {
                stored.coaching.push(record.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_representatives(
        &self,
        representatives: &[UserId],
        status: Option<ReportStatus>,
        range: Option<DateRange>,
    ) -> Result<Vec<CallReport>, RepositoryError> {
        let reports = self.reports.read().await;
        let mut listed: Vec<CallReport> = reports
            .values()
            .filter(|report| representatives.contains(&report.sr_id))
            .filter(|report| status.map_or(true, |status| report.status == status))
            .filter(|report| range.map_or(true, |range| range.contains(report.call_date)))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));
        Ok(listed)
    }
}
