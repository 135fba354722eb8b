use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use callplan_core::domain::plan::{NewPlan, PlanId, PlanPatch, PlanStatus, PreCallPlan};
use callplan_workflow::Decision;

use crate::error::{ApiError, ForCaller};
use crate::extract::CurrentCaller;
use crate::routes::{body, query, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct PlanFilter {
    #[serde(default)]
    pub status: Option<PlanStatus>,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    payload: Result<Json<NewPlan>, JsonRejection>,
) -> Result<(StatusCode, Json<PreCallPlan>), ApiError> {
    let input = body(&caller, payload)?;
    let plan = state.services.plans.create(&caller, input).await.for_caller(&caller)?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    filter: Result<Query<PlanFilter>, QueryRejection>,
) -> Result<Json<Vec<PreCallPlan>>, ApiError> {
    let filter = query(&caller, filter)?;
    let plans = state.services.plans.list_mine(&caller, filter.status).await.for_caller(&caller)?;
    Ok(Json(plans))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<PreCallPlan>, ApiError> {
    let plan = state.services.plans.get(&caller, &PlanId(id)).await.for_caller(&caller)?;
    Ok(Json(plan))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    payload: Result<Json<PlanPatch>, JsonRejection>,
) -> Result<Json<PreCallPlan>, ApiError> {
    let patch = body(&caller, payload)?;
    let plan =
        state.services.plans.update(&caller, &PlanId(id), patch).await.for_caller(&caller)?;
    Ok(Json(plan))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.plans.delete(&caller, &PlanId(id)).await.for_caller(&caller)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<PreCallPlan>, ApiError> {
    let plan = state.services.plans.submit(&caller, &PlanId(id)).await.for_caller(&caller)?;
    Ok(Json(plan))
}

/// Body: `{ "action": "approve" | "reject", "reason": "..." }`.
pub async fn decide(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    payload: Result<Json<Decision>, JsonRejection>,
) -> Result<Json<PreCallPlan>, ApiError> {
    let decision = body(&caller, payload)?;
    let plan = state
        .services
        .approvals
        .decide(&caller, &PlanId(id), decision)
        .await
        .for_caller(&caller)?;
    Ok(Json(plan))
}
