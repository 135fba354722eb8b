//! Manager views, scoped to the caller's direct subordinates.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use callplan_core::aggregation::DashboardSnapshot;
use callplan_core::domain::plan::PreCallPlan;
use callplan_core::domain::report::{CallReport, ReportStatus};

use crate::error::{ApiError, ForCaller};
use crate::extract::CurrentCaller;
use crate::routes::plans::PlanFilter;
use crate::routes::{date_range, query, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct TeamReportFilter {
    #[serde(default)]
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardFilter {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

pub async fn plans(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    filter: Result<Query<PlanFilter>, QueryRejection>,
) -> Result<Json<Vec<PreCallPlan>>, ApiError> {
    let filter = query(&caller, filter)?;
    let plans =
        state.services.plans.team_plans(&caller, filter.status).await.for_caller(&caller)?;
    Ok(Json(plans))
}

pub async fn reports(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    filter: Result<Query<TeamReportFilter>, QueryRejection>,
) -> Result<Json<Vec<CallReport>>, ApiError> {
    let filter = query(&caller, filter)?;
    let range = date_range(&caller, filter.from, filter.to)?;
    let reports = state
        .services
        .reports
        .team_reports(&caller, filter.status, range)
        .await
        .for_caller(&caller)?;
    Ok(Json(reports))
}

pub async fn dashboard(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    filter: Result<Query<DashboardFilter>, QueryRejection>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let filter = query(&caller, filter)?;
    let range = date_range(&caller, filter.from, filter.to)?;
    let snapshot =
        state.services.dashboard.snapshot(&caller, range).await.for_caller(&caller)?;
    Ok(Json(snapshot))
}
