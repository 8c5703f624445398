//! Request-scoped operations: authorization, store access and the core
//! computations, in that order.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use coach_progress_core::goals::recommend_from_history;
use coach_progress_core::metrics::calculate_bmi;
use coach_progress_core::report::{DocumentRenderer, ReportData, report_filename};
use coach_progress_core::reset::{PasswordResets, ResetDelivery};
use coach_progress_core::{
    CompletionRates, DateFilter, DateRange, GoalSet, Identity, MetricSample, NewMetricSample,
    NewProgressLogEntry, PlanId, PlanKind, ProgressError, ProgressLogEntry, ProgressOverview,
    ProgressStore, UserGoals, UserId, UserProfile, completion::completion_rates,
};
use secrecy::SecretString;

use crate::error::{ApiError, ApiResult};

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LEN: usize = 8;

async fn visible_user(
    store: &dyn ProgressStore,
    identity: &Identity,
    user_id: UserId,
) -> Result<UserProfile, ProgressError> {
    let user = store.get_user(user_id).await?;
    identity.ensure_may_view(&user)?;
    Ok(user)
}

#[derive(Clone)]
pub struct MetricService {
    store: Arc<dyn ProgressStore>,
}

impl MetricService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Record a sample. BMI is filled in when a weight and a height (the
    /// sample's own, else the profile's) are both known.
    pub async fn create(
        &self,
        identity: &Identity,
        user_id: UserId,
        input: NewMetricSample,
        today: NaiveDate,
    ) -> ApiResult<MetricSample> {
        let user = visible_user(self.store.as_ref(), identity, user_id).await?;
        input.validate()?;

        let height = input.height.or(user.height_cm);
        let bmi = match (input.weight, height) {
            (Some(w), Some(h)) => calculate_bmi(w, h),
            _ => None,
        };
        let sample = MetricSample {
            id: 0,
            user_id,
            date: input.date.unwrap_or(today),
            weight: input.weight,
            body_fat: input.body_fat,
            muscle_mass: input.muscle_mass,
            height: input.height,
            bmi,
            notes: input.notes,
        };
        let saved = self.store.insert_metric(sample).await?;
        metrics::counter!("coach_metric_samples_recorded_total").increment(1);
        Ok(saved)
    }

    /// Samples newest first.
    pub async fn list(
        &self,
        identity: &Identity,
        user_id: UserId,
        filter: DateFilter,
    ) -> ApiResult<Vec<MetricSample>> {
        visible_user(self.store.as_ref(), identity, user_id).await?;
        let mut samples = self.store.list_metrics(user_id, filter).await?;
        samples.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(samples)
    }
}

#[derive(Clone)]
pub struct LogService {
    store: Arc<dyn ProgressStore>,
}

impl LogService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    async fn assigned_plan(
        &self,
        user: &UserProfile,
        kind: PlanKind,
        plan_id: PlanId,
    ) -> Result<(), ProgressError> {
        self.store.get_plan(kind, plan_id).await?;
        if !user.has_plan(kind, plan_id) {
            return Err(ProgressError::Forbidden(format!(
                "{kind} plan {plan_id} is not assigned to user {}",
                user.id
            )));
        }
        Ok(())
    }

    /// Record whether the calling user followed one of their plans.
    pub async fn record(
        &self,
        identity: &Identity,
        kind: PlanKind,
        input: NewProgressLogEntry,
        today: NaiveDate,
    ) -> ApiResult<ProgressLogEntry> {
        let user_id = identity.as_user()?;
        let user = self.store.get_user(user_id).await?;
        self.assigned_plan(&user, kind, input.plan_id).await?;

        let entry = ProgressLogEntry {
            id: 0,
            user_id,
            kind,
            plan_id: input.plan_id,
            date: input.date.unwrap_or(today),
            completed: input.completed,
            notes: input.notes,
        };
        let saved = self.store.insert_progress(entry).await?;
        metrics::counter!("coach_progress_logs_recorded_total", "kind" => kind.to_string())
            .increment(1);
        Ok(saved)
    }

    /// The caller's own entries for one plan, newest first. History stays
    /// readable after the plan is unassigned or removed.
    pub async fn list_own(
        &self,
        identity: &Identity,
        kind: PlanKind,
        plan_id: PlanId,
        filter: DateFilter,
    ) -> ApiResult<Vec<ProgressLogEntry>> {
        let user_id = identity.as_user()?;
        let entries = self
            .store
            .list_progress(kind, user_id, Some(plan_id), filter)
            .await?;
        Ok(newest_first(entries))
    }

    /// A client's entries as seen by their trainer or an admin.
    pub async fn list_for_user(
        &self,
        identity: &Identity,
        user_id: UserId,
        kind: PlanKind,
        plan_id: Option<PlanId>,
        filter: DateFilter,
    ) -> ApiResult<Vec<ProgressLogEntry>> {
        visible_user(self.store.as_ref(), identity, user_id).await?;
        let entries = self
            .store
            .list_progress(kind, user_id, plan_id, filter)
            .await?;
        Ok(newest_first(entries))
    }
}

fn newest_first(mut entries: Vec<ProgressLogEntry>) -> Vec<ProgressLogEntry> {
    entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    entries
}

#[derive(Clone)]
pub struct ProgressService {
    store: Arc<dyn ProgressStore>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    async fn logs(
        &self,
        user_id: UserId,
        range: DateRange,
    ) -> Result<(Vec<ProgressLogEntry>, Vec<ProgressLogEntry>), ProgressError> {
        let workout = self
            .store
            .list_progress(PlanKind::Workout, user_id, None, range.into())
            .await?;
        let nutrition = self
            .store
            .list_progress(PlanKind::Nutrition, user_id, None, range.into())
            .await?;
        Ok((workout, nutrition))
    }

    pub async fn overview(
        &self,
        identity: &Identity,
        user_id: UserId,
        range: DateRange,
    ) -> ApiResult<ProgressOverview> {
        visible_user(self.store.as_ref(), identity, user_id).await?;
        let samples = self.store.list_metrics(user_id, range.into()).await?;
        let (workout, nutrition) = self.logs(user_id, range).await?;
        Ok(ProgressOverview::build(
            user_id, range, &samples, &workout, &nutrition,
        ))
    }

    pub async fn completion(
        &self,
        identity: &Identity,
        user_id: UserId,
        range: DateRange,
    ) -> ApiResult<CompletionRates> {
        visible_user(self.store.as_ref(), identity, user_id).await?;
        let (workout, nutrition) = self.logs(user_id, range).await?;
        Ok(completion_rates(user_id, range, &workout, &nutrition))
    }
}

#[derive(Clone)]
pub struct GoalService {
    store: Arc<dyn ProgressStore>,
}

impl GoalService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, identity: &Identity, user_id: UserId) -> ApiResult<UserGoals> {
        let user = visible_user(self.store.as_ref(), identity, user_id).await?;
        Ok(user.goals)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        user_id: UserId,
        update: UserGoals,
    ) -> ApiResult<UserGoals> {
        visible_user(self.store.as_ref(), identity, user_id).await?;
        update.validate()?;
        Ok(self.store.update_goals(user_id, &update).await?)
    }

    /// Recompute goals from the user's metric history and persist them.
    /// Nothing is written when the history has no weight.
    pub async fn recommend(&self, identity: &Identity, user_id: UserId) -> ApiResult<GoalSet> {
        let user = visible_user(self.store.as_ref(), identity, user_id).await?;
        let samples = self.store.list_metrics(user_id, DateFilter::ALL).await?;
        let goals = recommend_from_history(&user, &samples)?;
        self.store.save_goals(user_id, &goals).await?;
        metrics::counter!("coach_goal_recommendations_total").increment(1);
        tracing::info!(user_id, calories = goals.calories_goal, "goals recomputed");
        Ok(goals)
    }
}

/// A rendered document ready to be sent as an attachment.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ProgressStore>,
    renderer: Arc<dyn DocumentRenderer>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ProgressStore>, renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self { store, renderer }
    }

    pub async fn render(
        &self,
        identity: &Identity,
        user_id: UserId,
        range: DateRange,
    ) -> ApiResult<RenderedReport> {
        let user = visible_user(self.store.as_ref(), identity, user_id).await?;
        let samples = self.store.list_metrics(user_id, range.into()).await?;
        let workout = self
            .store
            .list_progress(PlanKind::Workout, user_id, None, range.into())
            .await?;
        let nutrition = self
            .store
            .list_progress(PlanKind::Nutrition, user_id, None, range.into())
            .await?;
        let data = ReportData::build(&user, range, &samples, &workout, &nutrition);

        let renderer = self.renderer.clone();
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&data))
            .await
            .map_err(|e| ApiError::Internal(format!("report task failed: {e}")))??;
        metrics::counter!("coach_reports_rendered_total").increment(1);

        Ok(RenderedReport {
            filename: report_filename(user_id, &range),
            content_type: self.renderer.content_type(),
            bytes,
        })
    }
}

pub const RESET_REQUEST_MESSAGE: &str =
    "If the email is registered, instructions to reset the password have been sent";

#[derive(Clone)]
pub struct PasswordResetService {
    store: Arc<dyn ProgressStore>,
    resets: PasswordResets,
    delivery: Arc<dyn ResetDelivery>,
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        resets: PasswordResets,
        delivery: Arc<dyn ResetDelivery>,
    ) -> Self {
        Self {
            store,
            resets,
            delivery,
        }
    }

    /// Issue and deliver a token when `email` belongs to an account. The
    /// caller gets the same answer either way.
    pub async fn request(&self, email: &str, now: DateTime<Utc>) -> ApiResult<&'static str> {
        let email = email.trim();
        let Some(user) = self.store.find_user_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(RESET_REQUEST_MESSAGE);
        };
        let token = self.resets.issue(&user.email, now).await?;
        self.delivery
            .deliver(&user.email, &token)
            .await
            .map_err(|e| ApiError::Internal(format!("could not send reset email: {e}")))?;
        Ok(RESET_REQUEST_MESSAGE)
    }

    pub async fn confirm(
        &self,
        token: &SecretString,
        new_password: SecretString,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        use secrecy::ExposeSecret;
        if new_password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            return Err(ProgressError::Validation(format!(
                "new password must be at least {MIN_PASSWORD_LEN} characters"
            ))
            .into());
        }
        let email = self.resets.redeem(token, now).await?;
        self.store.replace_credential(&email, new_password).await?;
        tracing::info!(%email, "password replaced through reset token");
        Ok(())
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> ApiResult<usize> {
        Ok(self.resets.purge_expired(now).await?)
    }
}
