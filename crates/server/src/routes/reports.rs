use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use callplan_core::domain::report::{CallReport, CheckIn, ReportId, ReportPatch, ReportStatus};
use callplan_workflow::{CheckOut, NewCoaching, NewPhoto};

use crate::error::{ApiError, ForCaller};
use crate::extract::CurrentCaller;
use crate::routes::{body, query, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    #[serde(default)]
    pub status: Option<ReportStatus>,
}

pub async fn check_in(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    payload: Result<Json<CheckIn>, JsonRejection>,
) -> Result<(StatusCode, Json<CallReport>), ApiError> {
    let input = body(&caller, payload)?;
    let report = state.services.reports.check_in(&caller, input).await.for_caller(&caller)?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    filter: Result<Query<ReportFilter>, QueryRejection>,
) -> Result<Json<Vec<CallReport>>, ApiError> {
    let filter = query(&caller, filter)?;
    let reports =
        state.services.reports.list_mine(&caller, filter.status).await.for_caller(&caller)?;
    Ok(Json(reports))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<CallReport>, ApiError> {
    let report = state.services.reports.get(&caller, &ReportId(id)).await.for_caller(&caller)?;
    Ok(Json(report))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    payload: Result<Json<ReportPatch>, JsonRejection>,
) -> Result<Json<CallReport>, ApiError> {
    let patch = body(&caller, payload)?;
    let report =
        state.services.reports.update(&caller, &ReportId(id), patch).await.for_caller(&caller)?;
    Ok(Json(report))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.reports.delete(&caller, &ReportId(id)).await.for_caller(&caller)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_out(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    payload: Result<Json<CheckOut>, JsonRejection>,
) -> Result<Json<CallReport>, ApiError> {
    let input = body(&caller, payload)?;
    let report =
        state.services.reports.check_out(&caller, &ReportId(id), input).await.for_caller(&caller)?;
    Ok(Json(report))
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<CallReport>, ApiError> {
    let report = state.services.reports.submit(&caller, &ReportId(id)).await.for_caller(&caller)?;
    Ok(Json(report))
}

pub async fn attach_photo(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    payload: Result<Json<NewPhoto>, JsonRejection>,
) -> Result<(StatusCode, Json<CallReport>), ApiError> {
    let input = body(&caller, payload)?;
    let report = state
        .services
        .reports
        .attach_photo(&caller, &ReportId(id), input)
        .await
        .for_caller(&caller)?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn add_coaching(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    payload: Result<Json<NewCoaching>, JsonRejection>,
) -> Result<(StatusCode, Json<CallReport>), ApiError> {
    let input = body(&caller, payload)?;
    let report = state
        .services
        .reports
        .add_coaching(&caller, &ReportId(id), input)
        .await
        .for_caller(&caller)?;
    Ok((StatusCode::CREATED, Json(report)))
}
