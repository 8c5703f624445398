use std::sync::Arc;

use coach_progress_core::ProgressStore;
use coach_progress_core::config::Config;
use coach_progress_core::report::DocumentRenderer;
use coach_progress_core::reset::{PasswordResets, ResetDelivery, TokenStore};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::auth::TokenAuthority;
use crate::middleware::LoggingMiddleware;
use crate::services::{
    GoalService, LogService, MetricService, PasswordResetService, ProgressService, ReportService,
};

/// Everything a handler needs, shared behind an `Arc`.
pub struct AppState {
    pub auth: TokenAuthority,
    pub metrics: MetricService,
    pub logs: LogService,
    pub progress: ProgressService,
    pub goals: GoalService,
    pub reports: ReportService,
    pub resets: PasswordResetService,
    pub report_window_days: u32,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the services around `store`, which is wrapped in the logging
    /// middleware here.
    pub fn new(
        config: &Config,
        store: Arc<dyn ProgressStore>,
        tokens: Arc<dyn TokenStore>,
        delivery: Arc<dyn ResetDelivery>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        let store: Arc<dyn ProgressStore> = Arc::new(LoggingMiddleware::new(store));
        let resets = PasswordResets::new(tokens, config.reset_token_ttl);
        Self {
            auth: TokenAuthority::new(&config.jwt_secret),
            metrics: MetricService::new(store.clone()),
            logs: LogService::new(store.clone()),
            progress: ProgressService::new(store.clone()),
            goals: GoalService::new(store.clone()),
            reports: ReportService::new(store.clone(), renderer),
            resets: PasswordResetService::new(store, resets, delivery),
            report_window_days: config.report_window_days,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
