use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};

use callplan_core::domain::customer::{ContactId, CustomerId};
use callplan_core::domain::plan::{PlanId, PlanStatus, PreCallPlan};
use callplan_core::domain::user::UserId;

use super::rows::{date, decode_list, encode_list, get, optional_timestamp, parsed, timestamp};
use super::{PlanRepository, RepositoryError};
use crate::DbPool;

const PLAN_COLUMNS: &str = "id, sr_id, customer_id, contact_id, plan_date, objectives, \
     planned_activities, status, rejection_reason, submitted_at, approved_by, approved_at, \
     rejected_by, rejected_at, created_at, updated_at";

pub struct SqlPlanRepository {
    pool: DbPool,
}

impl SqlPlanRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_plan(row: &SqliteRow) -> Result<PreCallPlan, RepositoryError> {
    let plan_date: String = get(row, "plan_date")?;
    let activities: String = get(row, "planned_activities")?;
    let status: String = get(row, "status")?;
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    Ok(PreCallPlan {
        id: PlanId(get(row, "id")?),
        sr_id: UserId(get(row, "sr_id")?),
        customer_id: CustomerId(get(row, "customer_id")?),
        contact_id: get::<Option<String>>(row, "contact_id")?.map(ContactId),
        plan_date: date(&plan_date, "plan_date")?,
        objectives: get(row, "objectives")?,
        planned_activities: decode_list(&activities, "planned_activities")?,
        status: parsed::<PlanStatus>(&status, "status")?,
        rejection_reason: get(row, "rejection_reason")?,
        submitted_at: optional_timestamp(get(row, "submitted_at")?, "submitted_at")?,
        approved_by: get::<Option<String>>(row, "approved_by")?.map(UserId),
        approved_at: optional_timestamp(get(row, "approved_at")?, "approved_at")?,
        rejected_by: get::<Option<String>>(row, "rejected_by")?.map(UserId),
        rejected_at: optional_timestamp(get(row, "rejected_at")?, "rejected_at")?,
        created_at: timestamp(&created_at, "created_at")?,
        updated_at: timestamp(&updated_at, "updated_at")?,
    })
}

#[async_trait::async_trait]
impl PlanRepository for SqlPlanRepository {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<PreCallPlan>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PLAN_COLUMNS} FROM pre_call_plans WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_plan).transpose()
    }

    async fn insert(&self, plan: PreCallPlan) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO pre_call_plans ({PLAN_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&plan.id.0)
        .bind(&plan.sr_id.0)
        .bind(&plan.customer_id.0)
        .bind(plan.contact_id.as_ref().map(|id| id.0.as_str()))
        .bind(plan.plan_date.format("%Y-%m-%d").to_string())
        .bind(&plan.objectives)
        .bind(encode_list(&plan.planned_activities)?)
        .bind(plan.status.as_str())
        .bind(&plan.rejection_reason)
        .bind(plan.submitted_at.map(|at| at.to_rfc3339()))
        .bind(plan.approved_by.as_ref().map(|id| id.0.as_str()))
        .bind(plan.approved_at.map(|at| at.to_rfc3339()))
        .bind(plan.rejected_by.as_ref().map(|id| id.0.as_str()))
        .bind(plan.rejected_at.map(|at| at.to_rfc3339()))
        .bind(plan.created_at.to_rfc3339())
        .bind(plan.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_draft(&self, plan: &PreCallPlan) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE pre_call_plans SET
                 customer_id = ?, contact_id = ?, plan_date = ?, objectives = ?,
                 planned_activities = ?, updated_at = ?
             WHERE id = ? AND status = 'draft'",
        )
        .bind(&plan.customer_id.0)
        .bind(plan.contact_id.as_ref().map(|id| id.0.as_str()))
        .bind(plan.plan_date.format("%Y-%m-%d").to_string())
        .bind(&plan.objectives)
        .bind(encode_list(&plan.planned_activities)?)
        .bind(plan.updated_at.to_rfc3339())
        .bind(&plan.id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn compare_and_set_status(
        &self,
        plan: &PreCallPlan,
        expected: PlanStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE pre_call_plans SET
                 status = ?, rejection_reason = ?, submitted_at = ?, approved_by = ?,
                 approved_at = ?, rejected_by = ?, rejected_at = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(plan.status.as_str())
        .bind(&plan.rejection_reason)
        .bind(plan.submitted_at.map(|at| at.to_rfc3339()))
        .bind(plan.approved_by.as_ref().map(|id| id.0.as_str()))
        .bind(plan.approved_at.map(|at| at.to_rfc3339()))
        .bind(plan.rejected_by.as_ref().map(|id| id.0.as_str()))
        .bind(plan.rejected_at.map(|at| at.to_rfc3339()))
        .bind(plan.updated_at.to_rfc3339())
        .bind(&plan.id.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_draft(&self, id: &PlanId) -> Result<bool, RepositoryError> {
        // Plans anchoring a call report stay.
        let result = sqlx::query(
            "DELETE FROM pre_call_plans WHERE id = ? AND status = 'draft'
             AND NOT EXISTS (SELECT 1 FROM call_reports WHERE pre_call_plan_id = ?)",
        )
        .bind(&id.0)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_for_representative(&self, sr_id: &UserId) -> Result<usize, RepositoryError> {
        let result = sqlx::query("DELETE FROM pre_call_plans WHERE sr_id = ?")
            .bind(&sr_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn list_for_representatives(
        &self,
        representatives: &[UserId],
        status: Option<PlanStatus>,
    ) -> Result<Vec<PreCallPlan>, RepositoryError> {
        if representatives.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PLAN_COLUMNS} FROM pre_call_plans WHERE sr_id IN ("));
        let mut separated = builder.separated(", ");
        for representative in representatives {
            separated.push_bind(representative.0.clone());
        }
        separated.push_unseparated(")");
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder.push(" ORDER BY plan_date DESC, created_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_plan).collect()
    }

    async fn count_by_status(
        &self,
        representatives: &[UserId],
        status: PlanStatus,
    ) -> Result<usize, RepositoryError> {
        if representatives.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM pre_call_plans WHERE status = ");
        builder.push_bind(status.as_str()).push(" AND sr_id IN (");
        let mut separated = builder.separated(", ");
        for representative in representatives {
            separated.push_bind(representative.0.clone());
        }
        separated.push_unseparated(")");

        let row = builder.build().fetch_one(&self.pool).await?;
        let count: i64 = get(&row, "count")?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use callplan_core::domain::customer::{Customer, CustomerId, GeoPoint, NewCustomer};
    use callplan_core::domain::plan::{NewPlan, PlanId, PlanStatus, PreCallPlan};
    use callplan_core::domain::report::{CallActivityType, CallReport, CheckIn, ReportId};
    use callplan_core::domain::user::{Role, User, UserId};

    use super::SqlPlanRepository;
    use crate::repositories::{
        CustomerRepository, PlanRepository, ReportRepository, SqlCustomerRepository,
        SqlReportRepository, SqlUserRepository, UserRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let users = SqlUserRepository::new(pool.clone());
        for (id, role, manager) in [
            ("mgr", Role::SalesManager, None),
            ("rep-1", Role::SalesRepresentative, Some("mgr")),
            ("rep-2", Role::SalesRepresentative, Some("mgr")),
        ] {
            users
                .save(User {
                    id: UserId(id.to_string()),
                    username: id.to_string(),
                    full_name: id.to_string(),
                    role,
                    manager_id: manager.map(|m: &str| UserId(m.to_string())),
                    territory_id: None,
                    team_id: None,
                    active: true,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
                .await
                .expect("save user");
        }

        SqlCustomerRepository::new(pool.clone())
            .save(Customer::new(
                CustomerId("c001".to_string()),
                NewCustomer {
                    code: "C001".to_string(),
                    name: "Apotek Sehat".to_string(),
                    ..NewCustomer::default()
                },
                UserId("mgr".to_string()),
                Utc::now(),
            ))
            .await
            .expect("save customer");

        pool
    }

    fn plan(id: &str, sr: &str) -> PreCallPlan {
        PreCallPlan::draft(
            PlanId(id.to_string()),
            UserId(sr.to_string()),
            NewPlan {
                customer_id: CustomerId("c001".to_string()),
                contact_id: None,
                plan_date: NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date"),
                objectives: Some("launch detailing".to_string()),
                planned_activities: vec!["detailing".to_string()],
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let repo = SqlPlanRepository::new(setup().await);
        let original = plan("p1", "rep-1");

        repo.insert(original.clone()).await.expect("insert");
        let found = repo.find_by_id(&original.id).await.expect("find").expect("present");

        assert_eq!(found.status, PlanStatus::Draft);
        assert_eq!(found.plan_date, original.plan_date);
        assert_eq!(found.planned_activities, original.planned_activities);
    }

    #[tokio::test]
    async fn compare_and_set_only_succeeds_from_expected_status() {
        let repo = SqlPlanRepository::new(setup().await);
        let mut plan = plan("p1", "rep-1");
        repo.insert(plan.clone()).await.expect("insert");

        plan.submit(Utc::now()).expect("submit");
        assert!(repo.compare_and_set_status(&plan, PlanStatus::Draft).await.expect("cas"));
        assert!(!repo.compare_and_set_status(&plan, PlanStatus::Draft).await.expect("stale cas"));

        let mut approved = plan.clone();
        approved.approve(&UserId("mgr".to_string()), Utc::now()).expect("approve");
        let mut rejected = plan.clone();
        rejected.reject(&UserId("mgr".to_string()), Some("no".to_string()), Utc::now()).expect("reject");

        assert!(repo.compare_and_set_status(&approved, PlanStatus::Pending).await.expect("first"));
        assert!(!repo.compare_and_set_status(&rejected, PlanStatus::Pending).await.expect("second"));

        let stored = repo.find_by_id(&plan.id).await.expect("find").expect("present");
        assert_eq!(stored.status, PlanStatus::Approved);
        assert_eq!(stored.rejection_reason, None);
        assert_eq!(stored.approved_by, Some(UserId("mgr".to_string())));
    }

    #[tokio::test]
    async fn drafts_only_for_update_and_delete() {
        let repo = SqlPlanRepository::new(setup().await);
        let mut plan = plan("p1", "rep-1");
        repo.insert(plan.clone()).await.expect("insert");

        plan.objectives = Some("revised".to_string());
        assert!(repo.update_draft(&plan).await.expect("update"));

        plan.submit(Utc::now()).expect("submit");
        repo.compare_and_set_status(&plan, PlanStatus::Draft).await.expect("cas");

        assert!(!repo.update_draft(&plan).await.expect("update pending"));
        assert!(!repo.delete_draft(&plan.id).await.expect("delete pending"));
    }

    #[tokio::test]
    async fn drafts_linked_from_a_report_are_not_deleted() {
        let pool = setup().await;
        let repo = SqlPlanRepository::new(pool.clone());
        let reports = SqlReportRepository::new(pool);
        let draft = plan("p1", "rep-1");
        repo.insert(draft.clone()).await.expect("insert");
        repo.insert(plan("p2", "rep-1")).await.expect("insert unlinked");

        reports
            .insert(CallReport::check_in(
                ReportId("r1".to_string()),
                UserId("rep-1".to_string()),
                CheckIn {
                    customer_id: CustomerId("c001".to_string()),
                    contact_id: None,
                    pre_call_plan_id: Some(draft.id.clone()),
                    location: GeoPoint { lat: -6.2, lng: 106.8 },
                    call_activity_type: CallActivityType::FaceToFace,
                    activities_done: Vec::new(),
                    is_planned: true,
                },
                Utc::now(),
            ))
            .await
            .expect("linked report");

        assert!(reports.references_plan(&draft.id).await.expect("linked"));
        assert!(!repo.delete_draft(&draft.id).await.expect("delete linked"));
        assert!(repo.find_by_id(&draft.id).await.expect("find").is_some());

        assert!(!reports.references_plan(&PlanId("p2".to_string())).await.expect("unlinked"));
        assert!(repo.delete_draft(&PlanId("p2".to_string())).await.expect("delete unlinked"));
    }

    #[tokio::test]
    async fn listing_and_counting_are_scoped_to_representatives() {
        let repo = SqlPlanRepository::new(setup().await);
        let mut pending = plan("p1", "rep-1");
        repo.insert(pending.clone()).await.expect("p1");
        pending.submit(Utc::now()).expect("submit");
        repo.compare_and_set_status(&pending, PlanStatus::Draft).await.expect("cas");
        repo.insert(plan("p2", "rep-1")).await.expect("p2");
        repo.insert(plan("p3", "rep-2")).await.expect("p3");

        let rep_1 = vec![UserId("rep-1".to_string())];
        assert_eq!(repo.list_for_representatives(&rep_1, None).await.expect("all").len(), 2);
        assert_eq!(
            repo.list_for_representatives(&rep_1, Some(PlanStatus::Pending))
                .await
                .expect("pending")
                .len(),
            1
        );

        let team = vec![UserId("rep-1".to_string()), UserId("rep-2".to_string())];
        assert_eq!(repo.count_by_status(&team, PlanStatus::Draft).await.expect("count"), 2);
        assert_eq!(repo.count_by_status(&[], PlanStatus::Draft).await.expect("empty"), 0);
    }
}
