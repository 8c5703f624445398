//! HTTP surface for the coaching progress layer.
//!
//! Handlers authenticate the caller with [`auth::Authenticated`], resolve
//! query defaults and delegate to the services in [`services`]. Store access
//! goes through [`middleware::LoggingMiddleware`].

use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
mod test_utils;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Build the application router over `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/api/users/{user_id}/metrics",
            post(handlers::create_metric).get(handlers::list_metrics),
        )
        .route(
            "/api/users/{user_id}/progress",
            get(handlers::progress_overview),
        )
        .route("/api/users/{user_id}/completion", get(handlers::completion))
        .route("/api/users/{user_id}/report", get(handlers::report))
        .route(
            "/api/users/{user_id}/logs/{kind}",
            get(handlers::list_user_logs),
        )
        .route("/api/logs/{kind}", post(handlers::record_log))
        .route("/api/logs/{kind}/{plan_id}", get(handlers::list_own_logs))
        .route(
            "/api/users/{user_id}/goals",
            get(handlers::get_goals).put(handlers::update_goals),
        )
        .route(
            "/api/users/{user_id}/goals/recommendation",
            post(handlers::recommend_goals),
        )
        .route(
            "/api/password-reset/request",
            post(handlers::request_password_reset),
        )
        .route(
            "/api/password-reset/confirm",
            post(handlers::confirm_password_reset),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                tracing::info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %req.method(),
                    uri = %req.uri(),
                    caller = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
