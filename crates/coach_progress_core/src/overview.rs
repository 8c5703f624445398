//! One-shot progress overview for a user and range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::completion::completion_rates;
use crate::metrics::calculate_progress_stats;
use crate::{DateRange, MetricSample, ProgressLogEntry, UserId};

/// Workout counts plus both completion rates and the metric summary. The
/// metric fields are all `None` when the range holds no samples.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressOverview {
    pub total_workouts: u64,
    pub completed_workouts: u64,
    pub completion_rate: f64,
    pub nutrition_completion_rate: f64,
    pub initial_weight: Option<f64>,
    pub current_weight: Option<f64>,
    pub weight_change: Option<f64>,
    pub initial_body_fat: Option<f64>,
    pub current_body_fat: Option<f64>,
    pub body_fat_change: Option<f64>,
    pub initial_date: Option<NaiveDate>,
    pub current_date: Option<NaiveDate>,
    pub days_tracked: Option<i64>,
}

impl ProgressOverview {
    pub fn build(
        user_id: UserId,
        range: DateRange,
        samples: &[MetricSample],
        workout: &[ProgressLogEntry],
        nutrition: &[ProgressLogEntry],
    ) -> Self {
        let in_range: Vec<MetricSample> = samples
            .iter()
            .filter(|s| s.user_id == user_id && range.contains(s.date))
            .cloned()
            .collect();
        let rates = completion_rates(user_id, range, workout, nutrition);

        let mut overview = Self {
            total_workouts: rates.workout.total,
            completed_workouts: rates.workout.completed,
            completion_rate: rates.workout.rate,
            nutrition_completion_rate: rates.nutrition.rate,
            ..Self::default()
        };
        if let Some(stats) = calculate_progress_stats(&in_range) {
            overview.initial_weight = stats.initial_weight;
            overview.current_weight = stats.current_weight;
            overview.weight_change = stats.weight_change;
            overview.initial_body_fat = stats.initial_body_fat;
            overview.current_body_fat = stats.current_body_fat;
            overview.body_fat_change = stats.body_fat_change;
            overview.initial_date = Some(stats.initial_date);
            overview.current_date = Some(stats.current_date);
            overview.days_tracked = Some(stats.days_tracked);
        }
        overview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlanKind;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn log(date: &str, completed: bool) -> ProgressLogEntry {
        ProgressLogEntry {
            id: 0,
            user_id: 1,
            kind: PlanKind::Workout,
            plan_id: 1,
            date: d(date),
            completed,
            notes: None,
        }
    }

    #[test]
    fn empty_inputs_give_zero_counts_and_null_metrics() {
        let range = DateRange::new(d("2024-01-01"), d("2024-01-31")).unwrap();
        let o = ProgressOverview::build(1, range, &[], &[], &[]);
        assert_eq!(o.total_workouts, 0);
        assert_eq!(o.completion_rate, 0.0);
        assert!(o.weight_change.is_none());
        assert!(o.days_tracked.is_none());

        let json = serde_json::to_value(&o).unwrap();
        assert!(json["initial_weight"].is_null());
    }

    #[test]
    fn combines_logs_and_metrics() {
        let range = DateRange::new(d("2024-01-01"), d("2024-01-31")).unwrap();
        let sample = |date: &str, w: f64| MetricSample {
            id: 0,
            user_id: 1,
            date: d(date),
            weight: Some(w),
            body_fat: None,
            muscle_mass: None,
            height: None,
            bmi: None,
            notes: None,
        };
        let samples = [sample("2024-01-31", 85.0), sample("2024-01-01", 90.0)];
        let workouts = [
            log("2024-01-02", true),
            log("2024-01-03", false),
            log("2024-02-03", true),
        ];
        let o = ProgressOverview::build(1, range, &samples, &workouts, &[]);
        assert_eq!(o.total_workouts, 2);
        assert_eq!(o.completed_workouts, 1);
        assert_eq!(o.completion_rate, 50.0);
        assert_eq!(o.weight_change, Some(-5.0));
        assert_eq!(o.days_tracked, Some(30));
    }
}
