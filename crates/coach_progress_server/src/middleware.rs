//! Cross-cutting wrapper around a [`ProgressStore`].
//!
//! Every store call is timed, logged at debug level and counted in the
//! `coach_store_operations_total` / `coach_store_operation_seconds` metrics,
//! labelled by operation and outcome.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use coach_progress_core::{
    DateFilter, GoalSet, MetricSample, Plan, PlanId, PlanKind, ProgressError, ProgressLogEntry,
    ProgressStore, UserGoals, UserId, UserProfile,
};
use secrecy::SecretString;
use tracing::debug;

pub struct LoggingMiddleware<S: ProgressStore + ?Sized> {
    inner: Arc<S>,
}

impl<S: ProgressStore + ?Sized> Clone for LoggingMiddleware<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: ProgressStore + ?Sized> LoggingMiddleware<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { inner: store }
    }

    async fn with_logging<F, Fut, T>(&self, operation: F, name: &'static str) -> Result<T, ProgressError>
    where
        F: FnOnce(Arc<S>) -> Fut,
        Fut: std::future::Future<Output = Result<T, ProgressError>>,
    {
        let start = Instant::now();
        debug!(operation = name, "store operation started");

        let result = operation(self.inner.clone()).await;

        let duration = start.elapsed();
        let outcome = match &result {
            Ok(_) => {
                debug!(operation = name, ?duration, "store operation completed");
                "ok"
            }
            Err(e) => {
                debug!(operation = name, ?duration, error = %e, "store operation failed");
                "error"
            }
        };
        metrics::counter!(
            "coach_store_operations_total",
            "operation" => name,
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!("coach_store_operation_seconds", "operation" => name)
            .record(duration.as_secs_f64());

        result
    }
}

#[async_trait]
impl<S: ProgressStore + ?Sized> ProgressStore for LoggingMiddleware<S> {
    async fn get_user(&self, user_id: UserId) -> Result<UserProfile, ProgressError> {
        self.with_logging(|s| async move { s.get_user(user_id).await }, "get_user")
            .await
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserProfile>, ProgressError> {
        self.with_logging(
            |s| async move { s.find_user_by_email(email).await },
            "find_user_by_email",
        )
        .await
    }

    async fn list_metrics(
        &self,
        user_id: UserId,
        filter: DateFilter,
    ) -> Result<Vec<MetricSample>, ProgressError> {
        self.with_logging(
            |s| async move { s.list_metrics(user_id, filter).await },
            "list_metrics",
        )
        .await
    }

    async fn insert_metric(&self, sample: MetricSample) -> Result<MetricSample, ProgressError> {
        self.with_logging(
            |s| async move { s.insert_metric(sample).await },
            "insert_metric",
        )
        .await
    }

    async fn get_plan(&self, kind: PlanKind, plan_id: PlanId) -> Result<Plan, ProgressError> {
        self.with_logging(|s| async move { s.get_plan(kind, plan_id).await }, "get_plan")
            .await
    }

    async fn list_progress(
        &self,
        kind: PlanKind,
        user_id: UserId,
        plan_id: Option<PlanId>,
        filter: DateFilter,
    ) -> Result<Vec<ProgressLogEntry>, ProgressError> {
        self.with_logging(
            |s| async move { s.list_progress(kind, user_id, plan_id, filter).await },
            "list_progress",
        )
        .await
    }

    async fn insert_progress(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, ProgressError> {
        self.with_logging(
            |s| async move { s.insert_progress(entry).await },
            "insert_progress",
        )
        .await
    }

    async fn save_goals(
        &self,
        user_id: UserId,
        goals: &GoalSet,
    ) -> Result<UserGoals, ProgressError> {
        self.with_logging(
            |s| async move { s.save_goals(user_id, goals).await },
            "save_goals",
        )
        .await
    }

    async fn update_goals(
        &self,
        user_id: UserId,
        update: &UserGoals,
    ) -> Result<UserGoals, ProgressError> {
        self.with_logging(
            |s| async move { s.update_goals(user_id, update).await },
            "update_goals",
        )
        .await
    }

    async fn replace_credential(
        &self,
        email: &str,
        secret: SecretString,
    ) -> Result<(), ProgressError> {
        self.with_logging(
            |s| async move { s.replace_credential(email, secret).await },
            "replace_credential",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_progress_core::memory_store::InMemoryProgressStore;

    #[tokio::test]
    async fn passes_results_through() {
        let store = crate::test_utils::seeded_store();
        let wrapped = LoggingMiddleware::new(Arc::new(store));
        let user = wrapped.get_user(crate::test_utils::CLIENT_ID).await.unwrap();
        assert_eq!(user.id, crate::test_utils::CLIENT_ID);
    }

    #[tokio::test]
    async fn passes_errors_through() {
        let wrapped = LoggingMiddleware::new(Arc::new(InMemoryProgressStore::new()));
        assert!(matches!(
            wrapped.get_user(99).await,
            Err(ProgressError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn wraps_trait_objects() {
        let inner: Arc<dyn ProgressStore> = Arc::new(crate::test_utils::seeded_store());
        let wrapped = LoggingMiddleware::new(inner);
        let plan = wrapped
            .get_plan(PlanKind::Workout, crate::test_utils::WORKOUT_PLAN_ID)
            .await
            .unwrap();
        assert_eq!(plan.kind, PlanKind::Workout);
    }
}
