use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};

use callplan_core::aggregation::DateRange;
use callplan_core::domain::customer::{ContactId, CustomerId, GeoPoint};
use callplan_core::domain::plan::PlanId;
use callplan_core::domain::report::{
    CallActivityType, CallReport, CoachingRecord, Photo, PhotoCategory, ReportId, ReportStatus,
};
use callplan_core::domain::user::UserId;

use super::rows::{date, decode_list, encode_list, get, optional_timestamp, parsed, timestamp};
use super::{ReportRepository, RepositoryError};
use crate::DbPool;

const REPORT_COLUMNS: &str = "id, sr_id, customer_id, contact_id, pre_call_plan_id, call_date, \
     check_in_time, check_in_lat, check_in_lng, check_out_time, check_out_lat, check_out_lng, \
     call_activity_type, activities_done, notes, next_action, is_planned, status, submitted_at, \
     created_at, updated_at";

pub struct SqlReportRepository {
    pool: DbPool,
}

impl SqlReportRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, mut report: CallReport) -> Result<CallReport, RepositoryError> {
        let photos = sqlx::query(
            "SELECT id, category, url, uploaded_at FROM report_photos
             WHERE report_id = ? ORDER BY uploaded_at, id",
        )
        .bind(&report.id.0)
        .fetch_all(&self.pool)
        .await?;
        report.photos = photos.iter().map(row_to_photo).collect::<Result<_, _>>()?;

        let coaching = sqlx::query(
            "SELECT id, manager_id, comment, rating, created_at FROM coaching_records
             WHERE report_id = ? ORDER BY created_at, id",
        )
        .bind(&report.id.0)
        .fetch_all(&self.pool)
        .await?;
        report.coaching = coaching.iter().map(row_to_coaching).collect::<Result<_, _>>()?;

        Ok(report)
    }
}

fn row_to_report(row: &SqliteRow) -> Result<CallReport, RepositoryError> {
    let call_date: String = get(row, "call_date")?;
    let check_in_time: String = get(row, "check_in_time")?;
    let check_out_lat: Option<f64> = get(row, "check_out_lat")?;
    let check_out_lng: Option<f64> = get(row, "check_out_lng")?;
    let activity_type: String = get(row, "call_activity_type")?;
    let activities: String = get(row, "activities_done")?;
    let status: String = get(row, "status")?;
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    Ok(CallReport {
        id: ReportId(get(row, "id")?),
        sr_id: UserId(get(row, "sr_id")?),
        customer_id: CustomerId(get(row, "customer_id")?),
        contact_id: get::<Option<String>>(row, "contact_id")?.map(ContactId),
        pre_call_plan_id: get::<Option<String>>(row, "pre_call_plan_id")?.map(PlanId),
        call_date: date(&call_date, "call_date")?,
        check_in_time: timestamp(&check_in_time, "check_in_time")?,
        check_in_location: GeoPoint { lat: get(row, "check_in_lat")?, lng: get(row, "check_in_lng")? },
        check_out_time: optional_timestamp(get(row, "check_out_time")?, "check_out_time")?,
        check_out_location: check_out_lat
            .zip(check_out_lng)
            .map(|(lat, lng)| GeoPoint { lat, lng }),
        call_activity_type: parsed::<CallActivityType>(&activity_type, "call_activity_type")?,
        activities_done: decode_list(&activities, "activities_done")?,
        notes: get(row, "notes")?,
        next_action: get(row, "next_action")?,
        is_planned: get(row, "is_planned")?,
        status: parsed::<ReportStatus>(&status, "status")?,
        submitted_at: optional_timestamp(get(row, "submitted_at")?, "submitted_at")?,
        photos: Vec::new(),
        coaching: Vec::new(),
        created_at: timestamp(&created_at, "created_at")?,
        updated_at: timestamp(&updated_at, "updated_at")?,
    })
}

fn row_to_photo(row: &SqliteRow) -> Result<Photo, RepositoryError> {
    let category: String = get(row, "category")?;
    let uploaded_at: String = get(row, "uploaded_at")?;
    Ok(Photo {
        id: get(row, "id")?,
        category: parsed::<PhotoCategory>(&category, "category")?,
        url: get(row, "url")?,
        uploaded_at: timestamp(&uploaded_at, "uploaded_at")?,
    })
}

fn row_to_coaching(row: &SqliteRow) -> Result<CoachingRecord, RepositoryError> {
    let rating: Option<i64> = get(row, "rating")?;
    let created_at: String = get(row, "created_at")?;
    Ok(CoachingRecord {
        id: get(row, "id")?,
        manager_id: UserId(get(row, "manager_id")?),
        comment: get(row, "comment")?,
        rating: rating
            .map(u8::try_from)
            .transpose()
            .map_err(|e| RepositoryError::Decode(format!("rating: {e}")))?,
        created_at: timestamp(&created_at, "created_at")?,
    })
}

#[async_trait::async_trait]
impl ReportRepository for SqlReportRepository {
    async fn find_by_id(&self, id: &ReportId) -> Result<Option<CallReport>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM call_reports WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(self.hydrate(row_to_report(row)?).await?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, report: CallReport) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO call_reports ({REPORT_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&report.id.0)
        .bind(&report.sr_id.0)
        .bind(&report.customer_id.0)
        .bind(report.contact_id.as_ref().map(|id| id.0.as_str()))
        .bind(report.pre_call_plan_id.as_ref().map(|id| id.0.as_str()))
        .bind(report.call_date.format("%Y-%m-%d").to_string())
        .bind(report.check_in_time.to_rfc3339())
        .bind(report.check_in_location.lat)
        .bind(report.check_in_location.lng)
        .bind(report.check_out_time.map(|at| at.to_rfc3339()))
        .bind(report.check_out_location.map(|point| point.lat))
        .bind(report.check_out_location.map(|point| point.lng))
        .bind(report.call_activity_type.as_str())
        .bind(encode_list(&report.activities_done)?)
        .bind(&report.notes)
        .bind(&report.next_action)
        .bind(report.is_planned)
        .bind(report.status.as_str())
        .bind(report.submitted_at.map(|at| at.to_rfc3339()))
        .bind(report.created_at.to_rfc3339())
        .bind(report.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_draft(&self, report: &CallReport) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE call_reports SET
                 contact_id = ?, check_out_time = ?, check_out_lat = ?, check_out_lng = ?,
                 call_activity_type = ?, activities_done = ?, notes = ?, next_action = ?,
                 updated_at = ?
             WHERE id = ? AND status = 'draft'",
        )
        .bind(report.contact_id.as_ref().map(|id| id.0.as_str()))
        .bind(report.check_out_time.map(|at| at.to_rfc3339()))
        .bind(report.check_out_location.map(|point| point.lat))
        .bind(report.check_out_location.map(|point| point.lng))
        .bind(report.call_activity_type.as_str())
        .bind(encode_list(&report.activities_done)?)
        .bind(&report.notes)
        .bind(&report.next_action)
        .bind(report.updated_at.to_rfc3339())
        .bind(&report.id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn compare_and_set_status(
        &self,
        report: &CallReport,
        expected: ReportStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE call_reports SET status = ?, submitted_at = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(report.status.as_str())
        .bind(report.submitted_at.map(|at| at.to_rfc3339()))
        .bind(report.updated_at.to_rfc3339())
        .bind(&report.id.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_draft(&self, id: &ReportId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM call_reports WHERE id = ? AND status = 'draft'")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_for_representative(&self, sr_id: &UserId) -> Result<usize, RepositoryError> {
        let result = sqlx::query("DELETE FROM call_reports WHERE sr_id = ?")
            .bind(&sr_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn references_plan(&self, plan_id: &PlanId) -> Result<bool, RepositoryError> {
        let linked: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM call_reports WHERE pre_call_plan_id = ?)",
        )
        .bind(&plan_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(linked != 0)
    }

    async fn add_photo(&self, report_id: &ReportId, photo: &Photo) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO report_photos (id, report_id, category, url, uploaded_at)
             SELECT ?, id, ?, ?, ? FROM call_reports WHERE id = ? AND status = 'draft'",
        )
        .bind(&photo.id)
        .bind(photo.category.as_str())
        .bind(&photo.url)
        .bind(photo.uploaded_at.to_rfc3339())
        .bind(&report_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn add_coaching(
        &self,
        report_id: &ReportId,
        record: &CoachingRecord,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO coaching_records (id, report_id, manager_id, comment, rating, created_at)
             SELECT ?, id, ?, ?, ?, ? FROM call_reports WHERE id = ? AND status = 'submitted'",
        )
        .bind(&record.id)
        .bind(&record.manager_id.0)
        .bind(&record.comment)
        .bind(record.rating.map(i64::from))
        .bind(record.created_at.to_rfc3339())
        .bind(&report_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_representatives(
        &self,
        representatives: &[UserId],
        status: Option<ReportStatus>,
        range: Option<DateRange>,
    ) -> Result<Vec<CallReport>, RepositoryError> {
        if representatives.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {REPORT_COLUMNS} FROM call_reports WHERE sr_id IN ("));
        let mut separated = builder.separated(", ");
        for representative in representatives {
            separated.push_bind(representative.0.clone());
        }
        separated.push_unseparated(")");
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(range) = range {
            builder
                .push(" AND call_date BETWEEN ")
                .push_bind(range.from.format("%Y-%m-%d").to_string())
                .push(" AND ")
                .push_bind(range.to.format("%Y-%m-%d").to_string());
        }
        builder.push(" ORDER BY check_in_time DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut reports = Vec::with_capacity(rows.len());
        for row in &rows {
            reports.push(self.hydrate(row_to_report(row)?).await?);
        }
        Ok(reports)
    }
}
