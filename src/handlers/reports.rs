use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::Result,
    handlers::page,
    models::{
        DismissReportRequest, Report, ReportDetails, ReportFilter, ReportStats, ReportStatus,
        ReportType, ResolveReportRequest, SubmitReportRequest,
    },
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<ReportStatus>,
    pub report_type: Option<ReportType>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

fn paginated(reports: Vec<Report>, skip: u32, limit: u32) -> Json<Value> {
    let has_more = reports.len() == limit as usize;
    Json(json!({
        "reports": reports,
        "pagination": {
            "skip": skip,
            "limit": limit,
            "has_more": has_more
        }
    }))
}

pub async fn submit_report(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<SubmitReportRequest>,
) -> Result<(StatusCode, Json<Report>)> {
    let report = state.reports.submit(auth_user.user_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get_my_reports(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<PageQuery>,
) -> Result<Json<Value>> {
    let (skip, limit) = page(params.skip, params.limit);
    let reports = state
        .reports
        .my_reports(auth_user.user_id, skip, limit)
        .await?;
    Ok(paginated(reports, skip, limit))
}

pub async fn get_report(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Report>> {
    let report = state
        .reports
        .get(report_id, auth_user.user_id, auth_user.is_admin())
        .await?;
    Ok(Json(report))
}

pub async fn list_reports(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<ReportListQuery>,
) -> Result<Json<Value>> {
    let (skip, limit) = page(params.skip, params.limit);
    let filter = ReportFilter {
        status: params.status,
        report_type: params.report_type,
        skip,
        limit,
        ..ReportFilter::default()
    };
    let reports = state.reports.list(&filter).await?;
    Ok(paginated(reports, skip, limit))
}

pub async fn get_target_reports(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((report_type, target_id)): Path<(ReportType, Uuid)>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Value>> {
    let (skip, limit) = page(params.skip, params.limit);
    let reports = state
        .reports
        .target_reports(report_type, target_id, skip, limit)
        .await?;
    Ok(paginated(reports, skip, limit))
}

pub async fn get_report_details(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportDetails>> {
    Ok(Json(state.reports.details(report_id).await?))
}

pub async fn get_report_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ReportStats>> {
    Ok(Json(state.reports.stats().await?))
}

pub async fn process_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(report_id): Path<Uuid>,
    Json(payload): Json<ResolveReportRequest>,
) -> Result<Json<Report>> {
    payload.validate()?;

    let report = state
        .reports
        .resolve(report_id, admin.user_id, payload.action, &payload.reason)
        .await?;
    Ok(Json(report))
}

pub async fn dismiss_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(report_id): Path<Uuid>,
    Json(payload): Json<DismissReportRequest>,
) -> Result<Json<Report>> {
    payload.validate()?;

    let report = state
        .reports
        .dismiss(report_id, admin.user_id, &payload.reason)
        .await?;
    Ok(Json(report))
}
