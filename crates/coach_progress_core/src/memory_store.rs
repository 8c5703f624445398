//! [`ProgressStore`] backed by in-process tables.
//!
//! Each table sits behind its own `tokio::sync::RwLock`. Goal writes take
//! the users write lock once, so a write lands completely or not at all.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    DateFilter, GoalSet, MetricSample, Plan, PlanId, PlanKind, ProgressError, ProgressLogEntry,
    ProgressStore, UserGoals, UserId, UserProfile,
};

/// Initial contents, usually loaded from a JSON file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub metrics: Vec<MetricSample>,
    #[serde(default)]
    pub progress: Vec<ProgressLogEntry>,
}

#[derive(Default)]
pub struct InMemoryProgressStore {
    users: RwLock<BTreeMap<UserId, UserProfile>>,
    plans: RwLock<HashMap<(PlanKind, PlanId), Plan>>,
    metrics: RwLock<Vec<MetricSample>>,
    progress: RwLock<Vec<ProgressLogEntry>>,
    credentials: RwLock<HashMap<String, SecretString>>,
    next_metric_id: AtomicU64,
    next_progress_id: AtomicU64,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::from_seed(SeedData::default())
    }

    pub fn from_seed(seed: SeedData) -> Self {
        let next_metric_id = seed.metrics.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let next_progress_id = seed.progress.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        Self {
            users: RwLock::new(seed.users.into_iter().map(|u| (u.id, u)).collect()),
            plans: RwLock::new(seed.plans.into_iter().map(|p| ((p.kind, p.id), p)).collect()),
            metrics: RwLock::new(seed.metrics),
            progress: RwLock::new(seed.progress),
            credentials: RwLock::new(HashMap::new()),
            next_metric_id: AtomicU64::new(next_metric_id),
            next_progress_id: AtomicU64::new(next_progress_id),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ProgressError> {
        let seed: SeedData = serde_json::from_str(json)?;
        Ok(Self::from_seed(seed))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ProgressError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProgressError::Config(format!("cannot read seed file {}: {e}", path.display()))
        })?;
        let store = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            users = store.users.read().await.len(),
            "loaded seed data"
        );
        Ok(store)
    }

    pub async fn insert_user(&self, user: UserProfile) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn insert_plan(&self, plan: Plan) {
        self.plans.write().await.insert((plan.kind, plan.id), plan);
    }

    /// Whether a credential has been stored for `email`.
    pub async fn has_credential(&self, email: &str) -> bool {
        self.credentials
            .read()
            .await
            .contains_key(&email.to_ascii_lowercase())
    }
}

fn user_not_found(user_id: UserId) -> ProgressError {
    ProgressError::NotFound(format!("user {user_id}"))
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn get_user(&self, user_id: UserId) -> Result<UserProfile, ProgressError> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserProfile>, ProgressError> {
        let email = email.trim();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_metrics(
        &self,
        user_id: UserId,
        filter: DateFilter,
    ) -> Result<Vec<MetricSample>, ProgressError> {
        Ok(self
            .metrics
            .read()
            .await
            .iter()
            .filter(|m| m.user_id == user_id && filter.contains(m.date))
            .cloned()
            .collect())
    }

    async fn insert_metric(&self, mut sample: MetricSample) -> Result<MetricSample, ProgressError> {
        if !self.users.read().await.contains_key(&sample.user_id) {
            return Err(user_not_found(sample.user_id));
        }
        sample.id = self.next_metric_id.fetch_add(1, Ordering::Relaxed);
        self.metrics.write().await.push(sample.clone());
        Ok(sample)
    }

    async fn get_plan(&self, kind: PlanKind, plan_id: PlanId) -> Result<Plan, ProgressError> {
        self.plans
            .read()
            .await
            .get(&(kind, plan_id))
            .cloned()
            .ok_or_else(|| ProgressError::NotFound(format!("{kind} plan {plan_id}")))
    }

    async fn list_progress(
        &self,
        kind: PlanKind,
        user_id: UserId,
        plan_id: Option<PlanId>,
        filter: DateFilter,
    ) -> Result<Vec<ProgressLogEntry>, ProgressError> {
        Ok(self
            .progress
            .read()
            .await
            .iter()
            .filter(|e| {
                e.kind == kind
                    && e.user_id == user_id
                    && plan_id.is_none_or(|p| e.plan_id == p)
                    && filter.contains(e.date)
            })
            .cloned()
            .collect())
    }

    async fn insert_progress(
        &self,
        mut entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, ProgressError> {
        if !self.plans.read().await.contains_key(&(entry.kind, entry.plan_id)) {
            return Err(ProgressError::NotFound(format!(
                "{} plan {}",
                entry.kind, entry.plan_id
            )));
        }
        entry.id = self.next_progress_id.fetch_add(1, Ordering::Relaxed);
        self.progress.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn save_goals(
        &self,
        user_id: UserId,
        goals: &GoalSet,
    ) -> Result<UserGoals, ProgressError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or_else(|| user_not_found(user_id))?;
        user.goals = UserGoals::from(goals);
        Ok(user.goals.clone())
    }

    async fn update_goals(
        &self,
        user_id: UserId,
        update: &UserGoals,
    ) -> Result<UserGoals, ProgressError> {
        update.validate()?;
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or_else(|| user_not_found(user_id))?;
        user.goals.apply(update);
        Ok(user.goals.clone())
    }

    async fn replace_credential(
        &self,
        email: &str,
        secret: SecretString,
    ) -> Result<(), ProgressError> {
        let known = self
            .users
            .read()
            .await
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email.trim()));
        if !known {
            return Err(ProgressError::NotFound(format!("account {email}")));
        }
        self.credentials
            .write()
            .await
            .insert(email.trim().to_ascii_lowercase(), secret);
        Ok(())
    }
}
