//! Progress report assembly.
//!
//! This module only selects and shapes the data a report shows: the chart
//! series and the completion figures. Turning that into a document is the
//! job of a [`DocumentRenderer`]; [`pdf::PdfRenderer`] is the bundled one.

use chrono::NaiveDate;
use serde::Serialize;

use crate::completion::{CompletionRates, completion_rates};
use crate::metrics::{ProgressStats, calculate_progress_stats};
use crate::{DateRange, MetricSample, ProgressError, ProgressLogEntry, UserId, UserProfile};

pub mod pdf;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// One line chart: date-ordered points plus labels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub y_label: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl ChartSeries {
    fn from_samples(
        title: &str,
        y_label: &str,
        samples: &[MetricSample],
        value: impl Fn(&MetricSample) -> Option<f64>,
    ) -> Option<Self> {
        let mut points: Vec<(NaiveDate, f64)> = samples
            .iter()
            .filter_map(|s| value(s).map(|v| (s.date, v)))
            .collect();
        if points.is_empty() {
            return None;
        }
        points.sort_by_key(|(date, _)| *date);
        Some(Self {
            title: title.to_string(),
            y_label: y_label.to_string(),
            points,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportData {
    pub user_id: UserId,
    pub user_name: String,
    pub range: DateRange,
    pub charts: Vec<ChartSeries>,
    pub progress: Option<ProgressStats>,
    pub completion: CompletionRates,
}

impl ReportData {
    /// Shape a user's records for the report. Charts appear only for
    /// measurements that have at least one value: weight first, then body fat.
    pub fn build(
        user: &UserProfile,
        range: DateRange,
        samples: &[MetricSample],
        workout: &[ProgressLogEntry],
        nutrition: &[ProgressLogEntry],
    ) -> Self {
        let in_range: Vec<MetricSample> = samples
            .iter()
            .filter(|s| s.user_id == user.id && range.contains(s.date))
            .cloned()
            .collect();

        let charts = [
            ChartSeries::from_samples("Weight Progress", "Weight (kg)", &in_range, |s| s.weight),
            ChartSeries::from_samples("Body Fat Progress", "Body Fat %", &in_range, |s| {
                s.body_fat
            }),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            user_id: user.id,
            user_name: user.full_name.clone(),
            range,
            charts,
            progress: calculate_progress_stats(&in_range),
            completion: completion_rates(user.id, range, workout, nutrition),
        }
    }

    pub fn title(&self) -> String {
        format!("Progress Report - {}", self.user_name)
    }
}

/// Renders shaped report data into a binary document.
pub trait DocumentRenderer: Send + Sync + 'static {
    fn content_type(&self) -> &'static str;

    fn render(&self, report: &ReportData) -> Result<Vec<u8>, ProgressError>;
}

/// `report_{user_id}_{start}_{end}.pdf`
pub fn report_filename(user_id: UserId, range: &DateRange) -> String {
    format!(
        "report_{}_{}_{}.pdf",
        user_id,
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d")
    )
}
