//! Progress-and-goals computation layer for the coaching backend, plus the
//! `ProgressStore` trait the surrounding server persists through.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod completion;
pub mod config;
pub mod goals;
pub mod identity;
pub mod memory_store;
pub mod metrics;
pub mod observability;
pub mod overview;
pub mod report;
pub mod reset;
pub mod utils;

pub use completion::{CompletionRates, CompletionStats};
pub use goals::{GoalInputs, GoalSet, UserGoals};
pub use identity::{Identity, Role};
pub use metrics::ProgressStats;
pub use overview::ProgressOverview;

pub type UserId = u64;
pub type PlanId = u64;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Inclusive calendar date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ProgressError> {
        if start > end {
            return Err(ProgressError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to and including `today`.
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        Self {
            start: today - Duration::days(i64::from(days)),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Listing filter where each bound applies only when given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateFilter {
    pub const ALL: Self = Self {
        start: None,
        end: None,
    };

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

impl From<DateRange> for DateFilter {
    fn from(range: DateRange) -> Self {
        Self {
            start: Some(range.start),
            end: Some(range.end),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Workout,
    Nutrition,
}

impl std::fmt::Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanKind::Workout => f.write_str("workout"),
            PlanKind::Nutrition => f.write_str("nutrition"),
        }
    }
}

impl std::str::FromStr for PlanKind {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workout" => Ok(PlanKind::Workout),
            "nutrition" => Ok(PlanKind::Nutrition),
            other => Err(ProgressError::Validation(format!(
                "unknown plan kind: {other}"
            ))),
        }
    }
}

/// A dated physiological snapshot. Heights are centimetres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub id: u64,
    pub user_id: UserId,
    pub date: NaiveDate,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub body_fat: Option<f64>,
    #[serde(default)]
    pub muscle_mass: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payload for recording a metric sample; the store assigns the id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMetricSample {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub body_fat: Option<f64>,
    #[serde(default)]
    pub muscle_mass: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewMetricSample {
    pub fn validate(&self) -> Result<(), ProgressError> {
        let fields = [
            ("weight", self.weight),
            ("body_fat", self.body_fat),
            ("muscle_mass", self.muscle_mass),
            ("height", self.height),
        ];
        for (name, value) in fields {
            if let Some(v) = value
                && (!v.is_finite() || v < 0.0)
            {
                return Err(ProgressError::Validation(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        if let Some(bf) = self.body_fat
            && bf > 100.0
        {
            return Err(ProgressError::Validation(format!(
                "body_fat is a percentage, got {bf}"
            )));
        }
        Ok(())
    }
}

/// Whether a user followed a plan on a given day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressLogEntry {
    pub id: u64,
    pub user_id: UserId,
    pub kind: PlanKind,
    pub plan_id: PlanId,
    pub date: NaiveDate,
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProgressLogEntry {
    pub plan_id: PlanId,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub kind: PlanKind,
    pub name: String,
    #[serde(default)]
    pub trainer_id: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    /// Centimetres.
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub fitness_goal: Option<String>,
    #[serde(default)]
    pub trainer_id: Option<u64>,
    #[serde(default)]
    pub workout_plan_ids: Vec<PlanId>,
    #[serde(default)]
    pub nutrition_plan_ids: Vec<PlanId>,
    #[serde(default)]
    pub goals: UserGoals,
}

impl UserProfile {
    pub fn has_plan(&self, kind: PlanKind, plan_id: PlanId) -> bool {
        match kind {
            PlanKind::Workout => self.workout_plan_ids.contains(&plan_id),
            PlanKind::Nutrition => self.nutrition_plan_ids.contains(&plan_id),
        }
    }
}

/// Relational store collaborator. Implementations must make each goal write
/// atomic: either every supplied field lands or none does.
#[async_trait]
pub trait ProgressStore: Send + Sync + 'static {
    async fn get_user(&self, user_id: UserId) -> Result<UserProfile, ProgressError>;

    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserProfile>, ProgressError>;

    /// Samples for a user within `filter`, in storage order.
    async fn list_metrics(
        &self,
        user_id: UserId,
        filter: DateFilter,
    ) -> Result<Vec<MetricSample>, ProgressError>;

    /// Append a sample. The store assigns `id`.
    async fn insert_metric(&self, sample: MetricSample) -> Result<MetricSample, ProgressError>;

    async fn get_plan(&self, kind: PlanKind, plan_id: PlanId) -> Result<Plan, ProgressError>;

    async fn list_progress(
        &self,
        kind: PlanKind,
        user_id: UserId,
        plan_id: Option<PlanId>,
        filter: DateFilter,
    ) -> Result<Vec<ProgressLogEntry>, ProgressError>;

    /// Append a log entry. The store assigns `id`.
    async fn insert_progress(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, ProgressError>;

    /// Replace all goal fields of a user with a freshly computed set.
    async fn save_goals(&self, user_id: UserId, goals: &GoalSet)
    -> Result<UserGoals, ProgressError>;

    /// Overwrite only the goal fields present in `update`.
    async fn update_goals(
        &self,
        user_id: UserId,
        update: &UserGoals,
    ) -> Result<UserGoals, ProgressError>;

    async fn replace_credential(
        &self,
        email: &str,
        secret: SecretString,
    ) -> Result<(), ProgressError>;
}

/// Round half away from zero at `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
