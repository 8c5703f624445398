use serde::{Deserialize, Serialize};

use crate::{DateRange, ProgressLogEntry, UserId, round_to};

/// Counts for one plan category. `rate` is a percentage in `[0, 100]`, and
/// is `0.0` when `total == 0`; check `total` to tell "no data" apart from
/// "0% compliance".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionStats {
    pub total: u64,
    pub completed: u64,
    pub rate: f64,
}

impl CompletionStats {
    pub fn from_counts(total: u64, completed: u64) -> Self {
        let completed = completed.min(total);
        let rate = if total == 0 {
            0.0
        } else {
            round_to(completed as f64 / total as f64 * 100.0, 2)
        };
        Self {
            total,
            completed,
            rate,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRates {
    pub workout: CompletionStats,
    pub nutrition: CompletionStats,
}

/// Tally entries belonging to `user_id` whose date lies in `range`.
pub fn tally(entries: &[ProgressLogEntry], user_id: UserId, range: DateRange) -> CompletionStats {
    let (total, completed) = entries
        .iter()
        .filter(|e| e.user_id == user_id && range.contains(e.date))
        .fold((0u64, 0u64), |(total, done), e| {
            (total + 1, done + u64::from(e.completed))
        });
    CompletionStats::from_counts(total, completed)
}

/// Completion rates for both plan categories over an inclusive range.
pub fn completion_rates(
    user_id: UserId,
    range: DateRange,
    workout: &[ProgressLogEntry],
    nutrition: &[ProgressLogEntry],
) -> CompletionRates {
    CompletionRates {
        workout: tally(workout, user_id, range),
        nutrition: tally(nutrition, user_id, range),
    }
}
