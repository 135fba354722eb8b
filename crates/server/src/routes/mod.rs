//! JSON API under `/api/v1`.
//!
//! Every handler identifies its caller from the `x-callplan-user` header, calls exactly one
//! workflow operation, and maps failures through [`ApiError`].

pub mod plans;
pub mod reports;
pub mod team;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;

use callplan_core::aggregation::DateRange;
use callplan_core::errors::ApplicationError;
use callplan_workflow::{Caller, WorkflowServices};

use crate::error::{ApiError, ForCaller};

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<WorkflowServices>,
}

pub fn router(services: WorkflowServices) -> Router {
    let state = AppState { services: Arc::new(services) };

    Router::new()
        .route("/api/v1/plans", post(plans::create).get(plans::list_mine))
        .route("/api/v1/plans/{id}", get(plans::get).patch(plans::update).delete(plans::delete))
        .route("/api/v1/plans/{id}/submit", post(plans::submit))
        .route("/api/v1/plans/{id}/decision", post(plans::decide))
        .route("/api/v1/reports", get(reports::list_mine))
        .route("/api/v1/reports/check-in", post(reports::check_in))
        .route(
            "/api/v1/reports/{id}",
            get(reports::get).patch(reports::update).delete(reports::delete),
        )
        .route("/api/v1/reports/{id}/check-out", post(reports::check_out))
        .route("/api/v1/reports/{id}/submit", post(reports::submit))
        .route("/api/v1/reports/{id}/photos", post(reports::attach_photo))
        .route("/api/v1/reports/{id}/coaching", post(reports::add_coaching))
        .route("/api/v1/team/plans", get(team::plans))
        .route("/api/v1/team/reports", get(team::reports))
        .route("/api/v1/team/dashboard", get(team::dashboard))
        .with_state(state)
}

pub(crate) fn body<T>(caller: &Caller, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text(), &caller.correlation_id))
}

pub(crate) fn query<T>(caller: &Caller, params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text(), &caller.correlation_id))
}

/// `from`/`to` query bounds. A missing side leaves the range open on that side.
pub(crate) fn date_range(
    caller: &Caller,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Option<DateRange>, ApiError> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let earliest = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN);
    let latest = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX);

    DateRange::new(from.unwrap_or(earliest), to.unwrap_or(latest))
        .map(Some)
        .map_err(ApplicationError::from)
        .for_caller(caller)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use callplan_core::audit::NoopAuditSink;
    use callplan_core::config::WorkflowConfig;
    use callplan_core::notifications::InMemoryNotificationSink;
    use callplan_db::{connect_with_settings, migrations, DemoSeedDataset};
    use callplan_workflow::{WorkflowContext, WorkflowServices};

    use crate::extract::{CORRELATION_HEADER, USER_HEADER};
    use crate::routes::router;

    const REP: &str = "usr-rep-andi";
    const OTHER_REP: &str = "usr-rep-sari";
    const MANAGER: &str = "usr-manager";
    const DIRECTOR: &str = "usr-director";

    async fn app() -> Router {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoSeedDataset::load(&pool).await.expect("seed");

        let context = WorkflowContext::sql(
            pool,
            Arc::new(NoopAuditSink),
            Arc::new(InMemoryNotificationSink::default()),
            WorkflowConfig::default(),
        );
        router(WorkflowServices::new(context))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder =
            Request::builder().method(method).uri(uri).header(CORRELATION_HEADER, "test-req");
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    fn check_in_body() -> Value {
        json!({
            "customer_id": "cust-apotek-sehat",
            "location": { "lat": -6.2, "lng": 106.82 },
            "call_activity_type": "face_to_face",
            "activities_done": ["detailing"]
        })
    }

    #[tokio::test]
    async fn requests_without_a_user_are_unauthorized() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/api/v1/plans", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["correlation_id"], "test-req");
    }

    #[tokio::test]
    async fn plan_moves_from_draft_to_approved() {
        let app = app().await;

        let (status, plan) = send(
            &app,
            "POST",
            "/api/v1/plans",
            Some(REP),
            Some(json!({
                "customer_id": "cust-apotek-sehat",
                "plan_date": "2025-02-03",
                "objectives": "Introduce the new sample pack",
                "planned_activities": ["detailing", "sampling"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(plan["status"], "draft");
        assert_eq!(plan["sr_id"], REP);
        let id = plan["id"].as_str().expect("id").to_string();

        let (status, submitted) =
            send(&app, "POST", &format!("/api/v1/plans/{id}/submit"), Some(REP), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(submitted["status"], "pending");

        let (status, queue) =
            send(&app, "GET", "/api/v1/team/plans?status=pending", Some(MANAGER), None).await;
        assert_eq!(status, StatusCode::OK);
        let queue = queue.as_array().expect("list");
        assert!(queue.iter().any(|pending| pending["id"] == id.as_str()));
        assert!(queue.iter().all(|pending| pending["status"] == "pending"));

        let (status, decided) = send(
            &app,
            "POST",
            &format!("/api/v1/plans/{id}/decision"),
            Some(MANAGER),
            Some(json!({ "action": "approve" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decided["status"], "approved");
        assert_eq!(decided["approved_by"], MANAGER);

        let (status, again) = send(
            &app,
            "POST",
            &format!("/api/v1/plans/{id}/decision"),
            Some(MANAGER),
            Some(json!({ "action": "reject", "reason": "changed my mind" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(again["error"], "invalid_state");
    }

    #[tokio::test]
    async fn decision_errors_map_to_their_status_codes() {
        let app = app().await;
        let uri = "/api/v1/plans/plan-demo-pending/decision";

        let (status, body) =
            send(&app, "POST", uri, Some(DIRECTOR), Some(json!({ "action": "approve" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
        assert_eq!(body["correlation_id"], "test-req");

        let (status, body) = send(
            &app,
            "POST",
            uri,
            Some(MANAGER),
            Some(json!({ "action": "reject", "reason": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");

        let (status, body) =
            send(&app, "POST", uri, Some(MANAGER), Some(json!({ "action": "maybe" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/plans/plan-missing/decision",
            Some(MANAGER),
            Some(json!({ "action": "approve" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, plan) =
            send(&app, "GET", "/api/v1/plans/plan-demo-pending", Some(REP), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan["status"], "pending");
    }

    #[tokio::test]
    async fn call_report_round_trip_with_coaching() {
        let app = app().await;

        let (status, report) =
            send(&app, "POST", "/api/v1/reports/check-in", Some(REP), Some(check_in_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(report["status"], "draft");
        let id = report["id"].as_str().expect("id").to_string();

        let (status, report) = send(
            &app,
            "POST",
            &format!("/api/v1/reports/{id}/photos"),
            Some(REP),
            Some(json!({ "category": "display", "url": "https://files.example/display-1.jpg" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(report["photos"].as_array().expect("photos").len(), 1);

        let (status, report) = send(
            &app,
            "POST",
            &format!("/api/v1/reports/{id}/check-out"),
            Some(REP),
            Some(json!({ "location": { "lat": -6.2, "lng": 106.82 } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(report["check_out_time"].is_string());

        let (status, report) =
            send(&app, "POST", &format!("/api/v1/reports/{id}/submit"), Some(REP), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["status"], "submitted");

        let (status, body) =
            send(&app, "DELETE", &format!("/api/v1/reports/{id}"), Some(REP), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "invalid_state");

        let (status, body) =
            send(&app, "GET", &format!("/api/v1/reports/{id}"), Some(OTHER_REP), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");

        let (status, report) = send(
            &app,
            "POST",
            &format!("/api/v1/reports/{id}/coaching"),
            Some(MANAGER),
            Some(json!({ "comment": "Good objection handling", "rating": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(report["coaching"].as_array().expect("coaching").len(), 1);

        let (status, mine) = send(&app, "GET", "/api/v1/reports?status=submitted", Some(REP), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine.as_array().expect("list").len(), 1);
    }

    #[tokio::test]
    async fn draft_plans_can_be_edited_and_deleted_by_their_owner() {
        let app = app().await;
        let (_, plan) = send(
            &app,
            "POST",
            "/api/v1/plans",
            Some(REP),
            Some(json!({ "customer_id": "cust-rs-medika", "plan_date": "2025-02-04" })),
        )
        .await;
        let id = plan["id"].as_str().expect("id").to_string();

        let (status, updated) = send(
            &app,
            "PATCH",
            &format!("/api/v1/plans/{id}"),
            Some(REP),
            Some(json!({ "objectives": "Check formulary status" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["objectives"], "Check formulary status");

        let (status, _) =
            send(&app, "DELETE", &format!("/api/v1/plans/{id}"), Some(OTHER_REP), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(&app, "DELETE", &format!("/api/v1/plans/{id}"), Some(REP), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = send(&app, "GET", &format!("/api/v1/plans/{id}"), Some(REP), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn team_dashboard_counts_the_seeded_queue() {
        let app = app().await;

        let (status, snapshot) = send(&app, "GET", "/api/v1/team/dashboard", Some(MANAGER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["pending_approvals"], 1);
        assert_eq!(snapshot["total_calls"], 0);

        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/team/reports?from=2025-02-01&to=2025-01-01",
            Some(MANAGER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
    }
}
