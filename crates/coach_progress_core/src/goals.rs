//! Goal recommendation engine.
//!
//! Harris-Benedict BMR with a fixed age and a sedentary activity factor,
//! then fixed macro splits. [`compute_goals`] is pure and applies the weight
//! and height defaults; [`recommend_from_history`] is the gate that refuses
//! to compute anything for a user without a single weighed metric sample.

use serde::{Deserialize, Serialize};

use crate::metrics::latest_weight;
use crate::{MetricSample, ProgressError, UserProfile, round_to};

pub const DEFAULT_WEIGHT_KG: f64 = 70.0;
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;
pub const DEFAULT_AGE_YEARS: f64 = 25.0;
pub const SEDENTARY_ACTIVITY_FACTOR: f64 = 1.2;
/// Training days per week.
pub const ACTIVITY_LEVEL_GOAL: u32 = 4;
pub const STEPS_GOAL: u32 = 10_000;

const WEIGHT_LOSS: &str = "weight loss";
const WEIGHT_LOSS_LEGACY: &str = "pérdida de peso";

/// A complete set of recommended targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalSet {
    pub weight_goal: f64,
    pub body_fat_goal: f64,
    pub muscle_mass_goal: f64,
    pub activity_level_goal: u32,
    pub calories_goal: u32,
    pub protein_goal: u32,
    pub carbs_goal: u32,
    pub fat_goal: u32,
    pub water_goal: f64,
    pub steps_goal: u32,
}

/// Goal fields as persisted on a user. Also the partial-update payload:
/// `None` fields are left untouched by [`UserGoals::apply`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserGoals {
    #[serde(default)]
    pub weight_goal: Option<f64>,
    #[serde(default)]
    pub body_fat_goal: Option<f64>,
    #[serde(default)]
    pub muscle_mass_goal: Option<f64>,
    #[serde(default)]
    pub activity_level_goal: Option<u32>,
    #[serde(default)]
    pub calories_goal: Option<u32>,
    #[serde(default)]
    pub protein_goal: Option<u32>,
    #[serde(default)]
    pub carbs_goal: Option<u32>,
    #[serde(default)]
    pub fat_goal: Option<u32>,
    #[serde(default)]
    pub water_goal: Option<f64>,
    #[serde(default)]
    pub steps_goal: Option<u32>,
}

impl From<&GoalSet> for UserGoals {
    fn from(g: &GoalSet) -> Self {
        Self {
            weight_goal: Some(g.weight_goal),
            body_fat_goal: Some(g.body_fat_goal),
            muscle_mass_goal: Some(g.muscle_mass_goal),
            activity_level_goal: Some(g.activity_level_goal),
            calories_goal: Some(g.calories_goal),
            protein_goal: Some(g.protein_goal),
            carbs_goal: Some(g.carbs_goal),
            fat_goal: Some(g.fat_goal),
            water_goal: Some(g.water_goal),
            steps_goal: Some(g.steps_goal),
        }
    }
}

impl UserGoals {
    /// Overwrite the fields present in `update`, keep the rest.
    pub fn apply(&mut self, update: &UserGoals) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if update.$field.is_some() { self.$field = update.$field; })*
            };
        }
        merge!(
            weight_goal,
            body_fat_goal,
            muscle_mass_goal,
            activity_level_goal,
            calories_goal,
            protein_goal,
            carbs_goal,
            fat_goal,
            water_goal,
            steps_goal
        );
    }

    pub fn validate(&self) -> Result<(), ProgressError> {
        let floats = [
            ("weight_goal", self.weight_goal),
            ("body_fat_goal", self.body_fat_goal),
            ("muscle_mass_goal", self.muscle_mass_goal),
            ("water_goal", self.water_goal),
        ];
        for (name, value) in floats {
            if let Some(v) = value
                && (!v.is_finite() || v < 0.0)
            {
                return Err(ProgressError::Validation(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        if let Some(days) = self.activity_level_goal
            && days > 7
        {
            return Err(ProgressError::Validation(format!(
                "activity_level_goal is days per week, got {days}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FitnessGoal {
    WeightLoss,
    Other(String),
}

impl FitnessGoal {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return FitnessGoal::Other(String::new());
        };
        let normalized = raw.trim().to_lowercase();
        if normalized == WEIGHT_LOSS || normalized == WEIGHT_LOSS_LEGACY {
            FitnessGoal::WeightLoss
        } else {
            FitnessGoal::Other(raw.trim().to_string())
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GoalInputs {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub fitness_goal: FitnessGoal,
}

/// Harris-Benedict basal metabolic rate (male form) at the default age.
pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64) -> f64 {
    88.362 + 13.397 * weight_kg + 4.799 * height_cm - 5.677 * DEFAULT_AGE_YEARS
}

/// Compute a full goal set. Missing weight or height fall back to
/// [`DEFAULT_WEIGHT_KG`] and [`DEFAULT_HEIGHT_CM`].
pub fn compute_goals(inputs: &GoalInputs) -> GoalSet {
    let weight = inputs.weight_kg.unwrap_or(DEFAULT_WEIGHT_KG);
    let height = inputs.height_cm.unwrap_or(DEFAULT_HEIGHT_CM);

    let tdee = basal_metabolic_rate(weight, height) * SEDENTARY_ACTIVITY_FACTOR;

    let (weight_goal, body_fat_goal) = match inputs.fitness_goal {
        FitnessGoal::WeightLoss => (round_to(weight * 0.9, 1), 15.0),
        FitnessGoal::Other(_) => (weight, 20.0),
    };

    GoalSet {
        weight_goal,
        body_fat_goal,
        muscle_mass_goal: round_to(weight * 0.75, 1),
        activity_level_goal: ACTIVITY_LEVEL_GOAL,
        calories_goal: truncate(tdee),
        protein_goal: truncate(weight * 2.0),
        // 50% of energy from carbohydrate at 4 kcal/g
        carbs_goal: truncate(tdee * 0.5 / 4.0),
        // 30% of energy from fat at 9 kcal/g
        fat_goal: truncate(tdee * 0.3 / 9.0),
        water_goal: round_to(weight * 0.033, 1),
        steps_goal: STEPS_GOAL,
    }
}

fn truncate(value: f64) -> u32 {
    // `as` saturates: negatives become 0, NaN becomes 0.
    value.trunc() as u32
}

/// Recommend goals for `user` from their metric history.
///
/// Fails with [`ProgressError::InsufficientData`] unless at least one sample
/// carries a weight. The most recent weighed sample supplies the weight.
pub fn recommend_from_history(
    user: &UserProfile,
    samples: &[MetricSample],
) -> Result<GoalSet, ProgressError> {
    let weight = latest_weight(samples).ok_or_else(|| {
        ProgressError::InsufficientData(format!(
            "user {} has no weight measurements to base a recommendation on",
            user.id
        ))
    })?;

    let inputs = GoalInputs {
        weight_kg: Some(weight),
        height_cm: user.height_cm.filter(|h| *h > 0.0),
        fitness_goal: FitnessGoal::parse(user.fitness_goal.as_deref()),
    };
    tracing::debug!(user_id = user.id, weight, "computing goal recommendation");
    Ok(compute_goals(&inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn user(height_cm: Option<f64>, goal: Option<&str>) -> UserProfile {
        UserProfile {
            id: 7,
            email: "ana@example.com".into(),
            full_name: "Ana".into(),
            height_cm,
            fitness_goal: goal.map(str::to_string),
            trainer_id: None,
            workout_plan_ids: vec![],
            nutrition_plan_ids: vec![],
            goals: UserGoals::default(),
        }
    }

    fn sample(date: &str, weight: Option<f64>) -> MetricSample {
        MetricSample {
            id: 0,
            user_id: 7,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            weight,
            body_fat: None,
            muscle_mass: None,
            height: None,
            bmi: None,
            notes: None,
        }
    }

    #[test]
    fn weight_loss_scenario() {
        let goals = compute_goals(&GoalInputs {
            weight_kg: Some(80.0),
            height_cm: Some(175.0),
            fitness_goal: FitnessGoal::parse(Some("weight loss")),
        });
        // 88.362 + 1071.76 + 839.825 - 141.925
        assert!((basal_metabolic_rate(80.0, 175.0) - 1858.022).abs() < 1e-9);
        assert_eq!(goals.weight_goal, 72.0);
        assert_eq!(goals.body_fat_goal, 15.0);
        assert_eq!(goals.muscle_mass_goal, 60.0);
        assert_eq!(goals.activity_level_goal, 4);
        // 1858.022 * 1.2 = 2229.6264
        assert_eq!(goals.calories_goal, 2229);
        assert_eq!(goals.protein_goal, 160);
        assert_eq!(goals.carbs_goal, 278);
        assert_eq!(goals.fat_goal, 74);
        assert_eq!(goals.water_goal, 2.6);
        assert_eq!(goals.steps_goal, 10_000);
    }

    #[test]
    fn other_objectives_keep_current_weight() {
        let goals = compute_goals(&GoalInputs {
            weight_kg: Some(80.0),
            height_cm: Some(175.0),
            fitness_goal: FitnessGoal::parse(Some("muscle gain")),
        });
        assert_eq!(goals.weight_goal, 80.0);
        assert_eq!(goals.body_fat_goal, 20.0);
        assert_eq!(goals.calories_goal, 2229);
    }

    #[test]
    fn defaults_apply_when_measurements_missing() {
        let goals = compute_goals(&GoalInputs {
            weight_kg: None,
            height_cm: None,
            fitness_goal: FitnessGoal::Other(String::new()),
        });
        // 88.362 + 13.397*70 + 4.799*170 - 141.925 = 1700.057; * 1.2 = 2040.0684
        assert_eq!(goals.calories_goal, 2040);
        assert_eq!(goals.protein_goal, 140);
        assert_eq!(goals.carbs_goal, 255);
        assert_eq!(goals.fat_goal, 68);
        assert_eq!(goals.water_goal, 2.3);
        assert_eq!(goals.muscle_mass_goal, 52.5);
    }

    #[test]
    fn goal_matching_is_trimmed_and_case_insensitive() {
        assert_eq!(FitnessGoal::parse(Some("  Weight Loss ")), FitnessGoal::WeightLoss);
        assert_eq!(FitnessGoal::parse(Some("pérdida de peso")), FitnessGoal::WeightLoss);
        assert_eq!(
            FitnessGoal::parse(Some("endurance")),
            FitnessGoal::Other("endurance".into())
        );
        assert!(matches!(FitnessGoal::parse(None), FitnessGoal::Other(_)));
    }

    #[test]
    fn identical_inputs_give_identical_goals() {
        let inputs = GoalInputs {
            weight_kg: Some(63.4),
            height_cm: Some(162.0),
            fitness_goal: FitnessGoal::WeightLoss,
        };
        assert_eq!(compute_goals(&inputs), compute_goals(&inputs));
    }

    #[test]
    fn history_without_weight_is_insufficient() {
        let err = recommend_from_history(&user(Some(175.0), None), &[]).unwrap_err();
        assert!(matches!(err, ProgressError::InsufficientData(_)));

        let unweighed = vec![sample("2024-01-01", None)];
        let err = recommend_from_history(&user(Some(175.0), None), &unweighed).unwrap_err();
        assert!(matches!(err, ProgressError::InsufficientData(_)));
    }

    #[test]
    fn history_uses_latest_weight_and_profile_height() {
        let samples = vec![
            sample("2024-02-01", Some(80.0)),
            sample("2024-01-01", Some(95.0)),
            sample("2024-02-10", None),
        ];
        let goals =
            recommend_from_history(&user(Some(175.0), Some("weight loss")), &samples).unwrap();
        assert_eq!(goals.weight_goal, 72.0);
        assert_eq!(goals.calories_goal, 2229);
    }

    #[test]
    fn partial_update_only_touches_supplied_fields() {
        let mut stored = UserGoals::from(&compute_goals(&GoalInputs {
            weight_kg: Some(80.0),
            height_cm: Some(175.0),
            fitness_goal: FitnessGoal::WeightLoss,
        }));
        stored.apply(&UserGoals {
            steps_goal: Some(12_000),
            water_goal: Some(3.0),
            ..Default::default()
        });
        assert_eq!(stored.steps_goal, Some(12_000));
        assert_eq!(stored.water_goal, Some(3.0));
        assert_eq!(stored.calories_goal, Some(2229));
    }

    #[test]
    fn goal_update_validation() {
        let bad = UserGoals {
            activity_level_goal: Some(9),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = UserGoals {
            water_goal: Some(-1.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(UserGoals::default().validate().is_ok());
    }
}
