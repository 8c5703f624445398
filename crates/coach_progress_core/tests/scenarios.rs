use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use coach_progress_core::completion::completion_rates;
use coach_progress_core::goals::{FitnessGoal, GoalInputs, compute_goals, recommend_from_history};
use coach_progress_core::memory_store::InMemoryProgressStore;
use coach_progress_core::metrics::calculate_progress_stats;
use coach_progress_core::report::pdf::PdfRenderer;
use coach_progress_core::report::{DocumentRenderer, ReportData};
use coach_progress_core::reset::{InMemoryTokenStore, PasswordResets};
use coach_progress_core::{DateFilter, DateRange, ProgressError, ProgressStore, UserGoals};
use secrecy::SecretString;

const SEED: &str = r#"{
    "users": [
        {"id": 1, "email": "ana@example.com", "full_name": "Ana Ruiz", "height_cm": 175.0,
         "fitness_goal": "Pérdida de peso", "workout_plan_ids": [1]},
        {"id": 2, "email": "ben@example.com", "full_name": "Ben Ode"}
    ],
    "plans": [{"id": 1, "kind": "workout", "name": "Base"}],
    "metrics": [
        {"id": 1, "user_id": 1, "date": "2024-01-31", "weight": 85.0},
        {"id": 2, "user_id": 1, "date": "2024-01-01", "weight": 90.0, "body_fat": 25.0},
        {"id": 3, "user_id": 2, "date": "2024-01-10", "body_fat": 30.0}
    ],
    "progress": [
        {"id": 1, "user_id": 1, "kind": "workout", "plan_id": 1, "date": "2024-01-02", "completed": true},
        {"id": 2, "user_id": 1, "kind": "workout", "plan_id": 1, "date": "2024-01-03", "completed": false},
        {"id": 3, "user_id": 1, "kind": "workout", "plan_id": 1, "date": "2024-01-04", "completed": false}
    ]
}"#;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn january() -> DateRange {
    DateRange::new(d("2024-01-01"), d("2024-01-31")).unwrap()
}

#[tokio::test]
async fn metrics_summary_sorts_by_date_not_insertion() {
    let store = InMemoryProgressStore::from_json(SEED).unwrap();
    let samples = store.list_metrics(1, january().into()).await.unwrap();
    let stats = calculate_progress_stats(&samples).unwrap();
    assert_eq!(stats.initial_weight, Some(90.0));
    assert_eq!(stats.current_weight, Some(85.0));
    assert_eq!(stats.weight_change, Some(-5.0));
    assert_eq!(stats.days_tracked, 30);
    // Body fat only on the first day, so no change can be computed.
    assert_eq!(stats.initial_body_fat, Some(25.0));
    assert_eq!(stats.body_fat_change, None);
}

#[tokio::test]
async fn completion_rate_from_store() {
    let store = InMemoryProgressStore::from_json(SEED).unwrap();
    let workout = store
        .list_progress(coach_progress_core::PlanKind::Workout, 1, None, january().into())
        .await
        .unwrap();
    let rates = completion_rates(1, january(), &workout, &[]);
    assert_eq!(rates.workout.total, 3);
    assert_eq!(rates.workout.rate, 33.33);
    assert_eq!(rates.nutrition.rate, 0.0);
}

#[tokio::test]
async fn legacy_goal_label_and_latest_weight_drive_recommendation() {
    let store = InMemoryProgressStore::from_json(SEED).unwrap();
    let user = store.get_user(1).await.unwrap();
    let samples = store.list_metrics(1, DateFilter::ALL).await.unwrap();
    let goals = recommend_from_history(&user, &samples).unwrap();

    let expected = compute_goals(&GoalInputs {
        weight_kg: Some(85.0),
        height_cm: Some(175.0),
        fitness_goal: FitnessGoal::WeightLoss,
    });
    assert_eq!(goals, expected);
    assert_eq!(goals.body_fat_goal, 15.0);

    let saved = store.save_goals(1, &goals).await.unwrap();
    assert_eq!(saved, UserGoals::from(&goals));
}

#[tokio::test]
async fn no_weighed_sample_means_insufficient_data() {
    let store = InMemoryProgressStore::from_json(SEED).unwrap();
    let user = store.get_user(2).await.unwrap();
    let samples = store.list_metrics(2, DateFilter::ALL).await.unwrap();
    assert_eq!(samples.len(), 1);
    assert!(matches!(
        recommend_from_history(&user, &samples),
        Err(ProgressError::InsufficientData(_))
    ));
}

#[tokio::test]
async fn report_contains_only_present_series() {
    let store = InMemoryProgressStore::from_json(SEED).unwrap();
    let user = store.get_user(2).await.unwrap();
    let samples = store.list_metrics(2, january().into()).await.unwrap();
    let data = ReportData::build(&user, january(), &samples, &[], &[]);
    assert_eq!(data.charts.len(), 1);
    assert_eq!(data.charts[0].title, "Body Fat Progress");

    let bytes = PdfRenderer.render(&data).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[tokio::test]
async fn reset_token_then_credential_replacement() {
    let store = InMemoryProgressStore::from_json(SEED).unwrap();
    let resets = PasswordResets::new(Arc::new(InMemoryTokenStore::new()), Duration::minutes(60));
    let now = Utc::now();

    let token = resets.issue("ben@example.com", now).await.unwrap();
    let email = resets.redeem(&token, now + Duration::minutes(59)).await.unwrap();
    store
        .replace_credential(&email, SecretString::new("new-password".into()))
        .await
        .unwrap();
    assert!(store.has_credential("ben@example.com").await);
}
