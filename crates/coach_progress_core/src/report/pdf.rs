//! Minimal PDF 1.4 writer for progress reports.
//!
//! A4 pages, the two built-in Helvetica faces and vector line charts. Pages
//! break automatically when the next block would cross the bottom margin.

use std::fmt::Write as _;

use super::{ChartSeries, DocumentRenderer, PDF_CONTENT_TYPE, ReportData};
use crate::ProgressError;

const PAGE_WIDTH: f64 = 595.28;
const PAGE_HEIGHT: f64 = 841.89;
const MM: f64 = 72.0 / 25.4;
const LEFT: f64 = 10.0 * MM;
const TOP_MARGIN: f64 = 10.0 * MM;
const BOTTOM_MARGIN: f64 = 15.0 * MM;
const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * LEFT;
const CHART_HEIGHT: f64 = 190.0;
/// Average Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f64 = 0.5;

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Bundled [`DocumentRenderer`] producing `application/pdf`.
#[derive(Clone, Debug, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    fn render(&self, report: &ReportData) -> Result<Vec<u8>, ProgressError> {
        let mut layout = Layout::new();

        layout.text(Font::Bold, 16.0, &report.title(), true);
        layout.gap(10.0 * MM);

        layout.section("User Information");
        layout.text(Font::Regular, 12.0, &format!("Name: {}", report.user_name), false);
        layout.text(
            Font::Regular,
            12.0,
            &format!(
                "Report Period: {} to {}",
                report.range.start.format("%Y-%m-%d"),
                report.range.end.format("%Y-%m-%d")
            ),
            false,
        );
        layout.gap(5.0 * MM);

        for chart in &report.charts {
            layout.chart(chart);
        }

        layout.section("Progress Statistics");
        layout.text(
            Font::Regular,
            12.0,
            &format!(
                "Workout Completion Rate: {}%",
                format_rate(report.completion.workout.rate)
            ),
            false,
        );
        layout.text(
            Font::Regular,
            12.0,
            &format!(
                "Nutrition Plan Adherence: {}%",
                format_rate(report.completion.nutrition.rate)
            ),
            false,
        );
        if let Some(progress) = &report.progress {
            if let Some(change) = progress.weight_change {
                layout.text(
                    Font::Regular,
                    12.0,
                    &format!("Weight Change: {change:+.2} kg over {} days", progress.days_tracked),
                    false,
                );
            }
            if let Some(change) = progress.body_fat_change {
                layout.text(
                    Font::Regular,
                    12.0,
                    &format!("Body Fat Change: {change:+.2} points"),
                    false,
                );
            }
        }

        let pages = layout.finish();
        tracing::debug!(
            user_id = report.user_id,
            pages = pages.len(),
            charts = report.charts.len(),
            "rendered pdf report"
        );
        Ok(assemble(&report.title(), &pages))
    }
}

fn format_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        format!("{rate:.1}")
    } else {
        format!("{rate}")
    }
}

/// Content streams of finished pages plus a cursor on the current one.
struct Layout {
    pages: Vec<String>,
    current: String,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            y: PAGE_HEIGHT - TOP_MARGIN,
        }
    }

    fn ensure_space(&mut self, height: f64) {
        if self.y - height < BOTTOM_MARGIN {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = PAGE_HEIGHT - TOP_MARGIN;
        }
    }

    fn gap(&mut self, height: f64) {
        self.y -= height;
    }

    fn section(&mut self, title: &str) {
        self.text(Font::Bold, 12.0, title, false);
    }

    fn text(&mut self, font: Font, size: f64, text: &str, centered: bool) {
        let line_height = size * 1.6;
        self.ensure_space(line_height);
        self.y -= line_height;
        let x = if centered {
            let width = text.chars().count() as f64 * size * AVG_GLYPH_WIDTH;
            (LEFT + (CONTENT_WIDTH - width) / 2.0).max(LEFT)
        } else {
            LEFT
        };
        self.put_text(font, size, x, self.y + size * 0.4, text);
    }

    fn put_text(&mut self, font: Font, size: f64, x: f64, y: f64, text: &str) {
        let _ = writeln!(
            self.current,
            "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET",
            font.resource(),
            size,
            x,
            y,
            escape_text(text)
        );
    }

    fn chart(&mut self, series: &ChartSeries) {
        if series.points.is_empty() {
            return;
        }
        let title_height = 12.0 * 1.6;
        let axis_labels = 16.0;
        self.ensure_space(title_height + CHART_HEIGHT + axis_labels + 5.0 * MM);
        self.text(Font::Bold, 11.0, &series.title, true);

        let plot_left = LEFT + 40.0;
        let plot_width = CONTENT_WIDTH - 50.0;
        let plot_top = self.y - 6.0;
        let plot_bottom = plot_top - CHART_HEIGHT;

        let _ = writeln!(
            self.current,
            "0.6 G 0.5 w {:.2} {:.2} {:.2} {:.2} re S",
            plot_left, plot_bottom, plot_width, CHART_HEIGHT
        );

        let (min, max) = value_bounds(&series.points);
        let first_date = series.points[0].0;
        let last_date = series.points[series.points.len() - 1].0;
        let span_days = (last_date - first_date).num_days().max(0) as f64;

        let project = |date: chrono::NaiveDate, value: f64| -> (f64, f64) {
            let x = if span_days == 0.0 {
                plot_left + plot_width / 2.0
            } else {
                plot_left + (date - first_date).num_days() as f64 / span_days * plot_width
            };
            let y = plot_bottom + (value - min) / (max - min) * CHART_HEIGHT;
            (x, y)
        };

        let mut path = String::new();
        for (i, (date, value)) in series.points.iter().enumerate() {
            let (x, y) = project(*date, *value);
            let op = if i == 0 { "m" } else { "l" };
            let _ = write!(path, "{x:.2} {y:.2} {op} ");
        }
        if series.points.len() > 1 {
            let _ = writeln!(self.current, "0.12 0.47 0.71 RG 1.5 w {path}S");
        } else {
            let (x, y) = project(series.points[0].0, series.points[0].1);
            let _ = writeln!(
                self.current,
                "0.12 0.47 0.71 rg {:.2} {:.2} 4 4 re f",
                x - 2.0,
                y - 2.0
            );
        }
        let _ = writeln!(self.current, "0 G 0 g");

        self.put_text(Font::Regular, 8.0, LEFT, plot_top - 8.0, &format!("{max:.1}"));
        self.put_text(Font::Regular, 8.0, LEFT, plot_bottom, &format!("{min:.1}"));
        self.put_text(Font::Regular, 8.0, LEFT, plot_top + 4.0, &series.y_label);
        let axis_y = plot_bottom - 12.0;
        self.put_text(
            Font::Regular,
            8.0,
            plot_left,
            axis_y,
            &first_date.format("%Y-%m-%d").to_string(),
        );
        self.put_text(
            Font::Regular,
            8.0,
            plot_left + plot_width - 45.0,
            axis_y,
            &last_date.format("%Y-%m-%d").to_string(),
        );

        self.y = plot_bottom - axis_labels - 5.0 * MM;
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn value_bounds(points: &[(chrono::NaiveDate, f64)]) -> (f64, f64) {
    let min = points.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

/// Escape for a PDF literal string in WinAnsi encoding. Latin-1 characters
/// become octal escapes; anything outside Latin-1 becomes `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            ' '..='~' => out.push(ch),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", ch as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

/// Serialise page content streams into a complete document.
fn assemble(title: &str, pages: &[String]) -> Vec<u8> {
    // 1 catalog, 2 page tree, 3-4 fonts, 5 info, then (page, content) pairs.
    const FIRST_PAGE_OBJ: usize = 6;
    let page_obj = |i: usize| FIRST_PAGE_OBJ + 2 * i;

    let mut objects: Vec<Vec<u8>> = Vec::new();
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", page_obj(i)))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            pages.len()
        )
        .into_bytes(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    objects.push(
        format!(
            "<< /Title ({}) /Producer (coach-progress) >>",
            escape_text(title)
        )
        .into_bytes(),
    );

    for (i, content) in pages.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                page_obj(i) + 1
            )
            .into_bytes(),
        );
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content.as_bytes());
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        let _ = writeln!(xref, "{offset:010} 00000 n ");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    );
    out.extend_from_slice(xref.as_bytes());
    out
}
