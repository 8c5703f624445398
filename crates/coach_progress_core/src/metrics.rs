//! Folding metric samples into a first-vs-last progress summary, and BMI.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{MetricSample, round_to};

/// Body-mass index from a weight in kilograms and a height in centimetres.
///
/// Heights are stored in centimetres everywhere in this crate; the
/// conversion to metres happens here and nowhere else. Returns `None` for a
/// non-positive height. Rounded to 2 decimals.
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if height_cm <= 0.0 || !height_cm.is_finite() || !weight_kg.is_finite() {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(round_to(weight_kg / (height_m * height_m), 2))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub initial_weight: Option<f64>,
    pub current_weight: Option<f64>,
    pub weight_change: Option<f64>,
    pub initial_body_fat: Option<f64>,
    pub current_body_fat: Option<f64>,
    pub body_fat_change: Option<f64>,
    pub initial_date: NaiveDate,
    pub current_date: NaiveDate,
    pub days_tracked: i64,
}

/// Summarise the earliest and latest samples by date.
///
/// Returns `None` for an empty slice. Changes are `current - initial`,
/// rounded half away from zero to 2 decimals, and `None` when either end
/// lacks the value. Ties on date keep input order (stable sort), so the
/// last-inserted sample of the final day is "current".
pub fn calculate_progress_stats(samples: &[MetricSample]) -> Option<ProgressStats> {
    let mut sorted: Vec<&MetricSample> = samples.iter().collect();
    sorted.sort_by_key(|s| s.date);

    let initial = *sorted.first()?;
    let current = *sorted.last()?;

    Some(ProgressStats {
        initial_weight: initial.weight,
        current_weight: current.weight,
        weight_change: change(initial.weight, current.weight),
        initial_body_fat: initial.body_fat,
        current_body_fat: current.body_fat,
        body_fat_change: change(initial.body_fat, current.body_fat),
        initial_date: initial.date,
        current_date: current.date,
        days_tracked: current.date.signed_duration_since(initial.date).num_days(),
    })
}

fn change(initial: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (initial, current) {
        (Some(a), Some(b)) => Some(round_to(b - a, 2)),
        _ => None,
    }
}

/// Most recent non-null weight by date.
pub fn latest_weight(samples: &[MetricSample]) -> Option<f64> {
    samples
        .iter()
        .filter(|s| s.weight.is_some())
        .max_by_key(|s| s.date)
        .and_then(|s| s.weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(date: &str, weight: Option<f64>, body_fat: Option<f64>) -> MetricSample {
        MetricSample {
            id: 0,
            user_id: 1,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            weight,
            body_fat,
            muscle_mass: None,
            height: None,
            bmi: None,
            notes: None,
        }
    }

    #[test]
    fn empty_input_has_no_summary() {
        assert!(calculate_progress_stats(&[]).is_none());
    }

    #[test]
    fn month_of_weight_loss() {
        let samples = vec![
            sample("2024-01-01", Some(90.0), None),
            sample("2024-01-31", Some(85.0), None),
        ];
        let stats = calculate_progress_stats(&samples).unwrap();
        assert_eq!(stats.weight_change, Some(-5.0));
        assert_eq!(stats.days_tracked, 30);
        assert_eq!(stats.body_fat_change, None);
    }

    #[test]
    fn endpoints_come_from_dates_not_insertion_order() {
        let samples = vec![
            sample("2024-03-10", Some(82.4), Some(20.1)),
            sample("2024-03-01", Some(84.0), Some(21.0)),
            sample("2024-03-05", Some(83.0), None),
        ];
        let stats = calculate_progress_stats(&samples).unwrap();
        assert_eq!(stats.initial_weight, Some(84.0));
        assert_eq!(stats.current_weight, Some(82.4));
        assert_eq!(stats.weight_change, Some(-1.6));
        assert_eq!(stats.body_fat_change, Some(-0.9));
        assert_eq!(stats.days_tracked, 9);
    }

    #[test]
    fn single_sample_changes_are_zero_or_null() {
        let with_weight = calculate_progress_stats(&[sample("2024-05-01", Some(70.0), None)])
            .unwrap();
        assert_eq!(with_weight.weight_change, Some(0.0));
        assert_eq!(with_weight.body_fat_change, None);
        assert_eq!(with_weight.days_tracked, 0);

        let with_fat = calculate_progress_stats(&[sample("2024-05-01", None, Some(22.0))])
            .unwrap();
        assert_eq!(with_fat.weight_change, None);
        assert_eq!(with_fat.body_fat_change, Some(0.0));
    }

    #[test]
    fn missing_weight_on_an_endpoint_is_null_not_zero() {
        let samples = vec![
            sample("2024-01-01", None, Some(25.0)),
            sample("2024-02-01", Some(80.0), Some(23.5)),
        ];
        let stats = calculate_progress_stats(&samples).unwrap();
        assert_eq!(stats.weight_change, None);
        assert_eq!(stats.body_fat_change, Some(-1.5));
    }

    #[test]
    fn days_tracked_is_never_negative() {
        let samples = vec![
            sample("2024-06-30", Some(70.0), None),
            sample("2023-06-30", Some(75.0), None),
        ];
        let stats = calculate_progress_stats(&samples).unwrap();
        assert_eq!(stats.days_tracked, 366);
        assert_eq!(stats.weight_change, Some(-5.0));
    }

    #[test]
    fn bmi_uses_centimetres() {
        assert_eq!(calculate_bmi(80.0, 200.0), Some(20.0));
        assert_eq!(calculate_bmi(70.0, 175.0), Some(22.86));
        assert_eq!(calculate_bmi(70.0, 0.0), None);
    }

    #[test]
    fn latest_weight_skips_unweighed_samples() {
        let samples = vec![
            sample("2024-01-01", Some(90.0), None),
            sample("2024-01-20", Some(88.0), None),
            sample("2024-02-01", None, Some(19.0)),
        ];
        assert_eq!(latest_weight(&samples), Some(88.0));
        assert_eq!(latest_weight(&samples[2..]), None);
    }
}
