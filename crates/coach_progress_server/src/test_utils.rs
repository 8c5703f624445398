//! Shared fixtures for unit tests: a seeded store, a recording delivery and
//! a ready-made application state.
#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use coach_progress_core::config::Config;
use coach_progress_core::memory_store::{InMemoryProgressStore, SeedData};
use coach_progress_core::report::pdf::PdfRenderer;
use coach_progress_core::reset::{InMemoryTokenStore, ResetDelivery};
use coach_progress_core::{
    Identity, MetricSample, Plan, PlanKind, ProgressError, ProgressLogEntry, UserGoals,
    UserProfile,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use crate::state::AppState;

pub const ADMIN_ID: u64 = 1;
pub const TRAINER_ID: u64 = 10;
pub const CLIENT_ID: u64 = 100;
pub const OTHER_CLIENT_ID: u64 = 101;
pub const WORKOUT_PLAN_ID: u64 = 5;
pub const NUTRITION_PLAN_ID: u64 = 6;

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn user(id: u64, email: &str, name: &str, trainer_id: Option<u64>) -> UserProfile {
    UserProfile {
        id,
        email: email.into(),
        full_name: name.into(),
        height_cm: Some(175.0),
        fitness_goal: Some("Weight loss".into()),
        trainer_id,
        workout_plan_ids: vec![],
        nutrition_plan_ids: vec![],
        goals: UserGoals::default(),
    }
}

fn metric(id: u64, date: &str, weight: f64, body_fat: f64) -> MetricSample {
    MetricSample {
        id,
        user_id: CLIENT_ID,
        date: d(date),
        weight: Some(weight),
        body_fat: Some(body_fat),
        muscle_mass: None,
        height: None,
        bmi: None,
        notes: None,
    }
}

fn log(id: u64, kind: PlanKind, plan_id: u64, date: &str, completed: bool) -> ProgressLogEntry {
    ProgressLogEntry {
        id,
        user_id: CLIENT_ID,
        kind,
        plan_id,
        date: d(date),
        completed,
        notes: None,
    }
}

/// Client 100 (trainer 10) has January 2024 metrics going 90 kg to 85 kg,
/// three workout logs (two completed) and two completed nutrition logs.
/// Client 101 has no trainer, no plans and no metrics.
pub fn seed() -> SeedData {
    let mut client = user(CLIENT_ID, "client@example.com", "Casey Client", Some(TRAINER_ID));
    client.workout_plan_ids = vec![WORKOUT_PLAN_ID];
    client.nutrition_plan_ids = vec![NUTRITION_PLAN_ID];
    let other = user(OTHER_CLIENT_ID, "other@example.com", "Olive Other", None);

    SeedData {
        users: vec![client, other],
        plans: vec![
            Plan {
                id: WORKOUT_PLAN_ID,
                kind: PlanKind::Workout,
                name: "Full body".into(),
                trainer_id: Some(TRAINER_ID),
            },
            Plan {
                id: NUTRITION_PLAN_ID,
                kind: PlanKind::Nutrition,
                name: "Lean".into(),
                trainer_id: Some(TRAINER_ID),
            },
        ],
        metrics: vec![
            metric(1, "2024-01-01", 90.0, 25.0),
            metric(2, "2024-01-15", 87.5, 24.0),
            metric(3, "2024-01-31", 85.0, 23.0),
        ],
        progress: vec![
            log(1, PlanKind::Workout, WORKOUT_PLAN_ID, "2024-01-02", true),
            log(2, PlanKind::Workout, WORKOUT_PLAN_ID, "2024-01-04", false),
            log(3, PlanKind::Workout, WORKOUT_PLAN_ID, "2024-01-06", true),
            log(4, PlanKind::Nutrition, NUTRITION_PLAN_ID, "2024-01-02", true),
            log(5, PlanKind::Nutrition, NUTRITION_PLAN_ID, "2024-01-03", true),
        ],
    }
}

pub fn seeded_store() -> InMemoryProgressStore {
    InMemoryProgressStore::from_seed(seed())
}

/// Keeps the last delivered token so tests can redeem it.
#[derive(Default)]
pub struct RecordingDelivery {
    last: Mutex<Option<(String, String)>>,
}

impl RecordingDelivery {
    pub async fn last(&self) -> Option<(String, SecretString)> {
        self.last
            .lock()
            .await
            .as_ref()
            .map(|(email, token)| (email.clone(), SecretString::new(token.clone().into())))
    }
}

#[async_trait]
impl ResetDelivery for RecordingDelivery {
    async fn deliver(&self, email: &str, token: &SecretString) -> Result<(), ProgressError> {
        *self.last.lock().await = Some((email.to_string(), token.expose_secret().to_string()));
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config::from_env_with(|k| match k {
        "COACH_JWT_SECRET" => Some("unit-test-secret".into()),
        _ => None,
    })
    .unwrap()
}

pub struct Fixture {
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryProgressStore>,
    pub delivery: Arc<RecordingDelivery>,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(seeded_store());
    let delivery = Arc::new(RecordingDelivery::default());
    let state = AppState::new(
        &test_config(),
        store.clone(),
        Arc::new(InMemoryTokenStore::new()),
        delivery.clone(),
        Arc::new(PdfRenderer),
    );
    Fixture {
        state: Arc::new(state),
        store,
        delivery,
    }
}

pub fn bearer(state: &AppState, identity: Identity) -> String {
    format!("Bearer {}", state.auth.issue(identity, 1).unwrap())
}
