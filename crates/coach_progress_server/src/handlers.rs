//! axum handlers. Each one resolves query defaults, calls a service and
//! shapes the response.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::{NaiveDate, Utc};
use coach_progress_core::observability::Health;
use coach_progress_core::utils::{date_filter, resolve_range};
use coach_progress_core::{
    CompletionRates, DateFilter, DateRange, GoalSet, MetricSample, NewMetricSample, NewProgressLogEntry,
    PlanId, PlanKind, ProgressLogEntry, ProgressOverview, UserGoals, UserId,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Authenticated;
use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub plan_id: Option<PlanId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetConfirm {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageDto {
    pub message: String,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl RangeQuery {
    fn range(&self, window_days: u32) -> ApiResult<DateRange> {
        Ok(resolve_range(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            today(),
            window_days,
        )?)
    }

    fn filter(&self) -> ApiResult<DateFilter> {
        Ok(date_filter(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )?)
    }
}

pub async fn health() -> impl IntoResponse {
    Json(Health::readiness())
}

pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .prometheus
        .as_ref()
        .map(|h| h.render())
        .unwrap_or_default();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

pub async fn create_metric(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Authenticated(identity): Authenticated,
    ApiJson(input): ApiJson<NewMetricSample>,
) -> ApiResult<(StatusCode, Json<MetricSample>)> {
    let sample = state
        .metrics
        .create(&identity, user_id, input, today())
        .await?;
    Ok((StatusCode::CREATED, Json(sample)))
}

pub async fn list_metrics(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Authenticated(identity): Authenticated,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<Vec<MetricSample>>> {
    let filter = q.filter()?;
    let samples = state.metrics.list(&identity, user_id, filter).await?;
    Ok(Json(samples))
}

pub async fn progress_overview(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Authenticated(identity): Authenticated,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<ProgressOverview>> {
    let range = q.range(state.report_window_days)?;
    Ok(Json(state.progress.overview(&identity, user_id, range).await?))
}

pub async fn completion(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Authenticated(identity): Authenticated,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<CompletionRates>> {
    let range = q.range(state.report_window_days)?;
    Ok(Json(
        state.progress.completion(&identity, user_id, range).await?,
    ))
}

pub async fn report(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Authenticated(identity): Authenticated,
    Query(q): Query<RangeQuery>,
) -> ApiResult<impl IntoResponse> {
    let range = q.range(state.report_window_days)?;
    let report = state.reports.render(&identity, user_id, range).await?;
    let disposition = format!("attachment; filename={}", report.filename);
    Ok((
        [
            (header::CONTENT_TYPE, report.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.bytes,
    ))
}

pub async fn list_user_logs(
    State(state): State<Arc<AppState>>,
    Path((user_id, kind)): Path<(UserId, String)>,
    Authenticated(identity): Authenticated,
    Query(q): Query<LogQuery>,
) -> ApiResult<Json<Vec<ProgressLogEntry>>> {
    let kind: PlanKind = kind.parse()?;
    let filter = date_filter(q.start_date.as_deref(), q.end_date.as_deref())?;
    let entries = state
        .logs
        .list_for_user(&identity, user_id, kind, q.plan_id, filter)
        .await?;
    Ok(Json(entries))
}

pub async fn record_log(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Authenticated(identity): Authenticated,
    ApiJson(input): ApiJson<NewProgressLogEntry>,
) -> ApiResult<(StatusCode, Json<ProgressLogEntry>)> {
    let kind: PlanKind = kind.parse()?;
    let entry = state.logs.record(&identity, kind, input, today()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_own_logs(
    State(state): State<Arc<AppState>>,
    Path((kind, plan_id)): Path<(String, PlanId)>,
    Authenticated(identity): Authenticated,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<Vec<ProgressLogEntry>>> {
    let kind: PlanKind = kind.parse()?;
    let filter = q.filter()?;
    let entries = state
        .logs
        .list_own(&identity, kind, plan_id, filter)
        .await?;
    Ok(Json(entries))
}

pub async fn get_goals(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Authenticated(identity): Authenticated,
) -> ApiResult<Json<UserGoals>> {
    Ok(Json(state.goals.get(&identity, user_id).await?))
}

pub async fn update_goals(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Authenticated(identity): Authenticated,
    ApiJson(update): ApiJson<UserGoals>,
) -> ApiResult<Json<UserGoals>> {
    Ok(Json(state.goals.update(&identity, user_id, update).await?))
}

pub async fn recommend_goals(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Authenticated(identity): Authenticated,
) -> ApiResult<Json<GoalSet>> {
    Ok(Json(state.goals.recommend(&identity, user_id).await?))
}

pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResetRequest>,
) -> ApiResult<Json<MessageDto>> {
    let message = state.resets.request(&req.email, Utc::now()).await?;
    Ok(Json(MessageDto {
        message: message.to_string(),
    }))
}

pub async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResetConfirm>,
) -> ApiResult<impl IntoResponse> {
    let token = SecretString::new(req.token.into_boxed_str());
    let password = SecretString::new(req.new_password.into_boxed_str());
    state.resets.confirm(&token, password, Utc::now()).await?;
    Ok(Json(json!({ "message": "Password updated" })))
}
