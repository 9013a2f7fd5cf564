//! Nyquist and Bode charts drawn with ratatui's [`Chart`] widget.
//!
//! Single-file kinds draw the selected export; comparison kinds overlay every
//! loaded export, one colour per file.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use eis_core::formatting::{format_axis_value, format_frequency};
use eis_core::models::{Field, MeasurementTable, ParsedExport};

use crate::themes::Theme;

/// Relative padding added around data bounds, like a plotting library's
/// default axis margins.
const AXIS_MARGIN: f64 = 0.05;

// ── RenderKind ────────────────────────────────────────────────────────────────

/// Which visualisation to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// Z' against -Z" for the selected file.
    Nyquist,
    /// Nyquist curves of every file overlaid.
    CompareNyquist,
    /// |Z| and phase against log frequency for the selected file.
    Bode,
    /// Bode curves of every file overlaid.
    CompareBode,
    /// Nyquist and Bode side by side for the selected file.
    NyquistBode,
    /// Nyquist and Bode side by side with every file overlaid.
    Comparison,
}

impl RenderKind {
    pub const ALL: [RenderKind; 6] = [
        RenderKind::Nyquist,
        RenderKind::CompareNyquist,
        RenderKind::Bode,
        RenderKind::CompareBode,
        RenderKind::NyquistBode,
        RenderKind::Comparison,
    ];

    /// Command-line name, e.g. `compare-bode`.
    pub fn as_str(self) -> &'static str {
        match self {
            RenderKind::Nyquist => "nyquist",
            RenderKind::CompareNyquist => "compare-nyquist",
            RenderKind::Bode => "bode",
            RenderKind::CompareBode => "compare-bode",
            RenderKind::NyquistBode => "nyquist-bode",
            RenderKind::Comparison => "comparison",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    pub fn title(self) -> &'static str {
        match self {
            RenderKind::Nyquist => "Nyquist",
            RenderKind::CompareNyquist => "Nyquist comparison",
            RenderKind::Bode => "Bode",
            RenderKind::CompareBode => "Bode comparison",
            RenderKind::NyquistBode => "Nyquist + Bode",
            RenderKind::Comparison => "Multi-file comparison",
        }
    }

    /// Whether this kind overlays every file instead of the selected one.
    pub fn is_multi_file(self) -> bool {
        matches!(
            self,
            RenderKind::CompareNyquist | RenderKind::CompareBode | RenderKind::Comparison
        )
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

// ── Bounds ────────────────────────────────────────────────────────────────────

/// Min/max of the finite values in `values`, or `None` when there are none.
pub fn data_range<I: IntoIterator<Item = f64>>(values: I) -> Option<[f64; 2]> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some([v, v]),
            Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
        })
}

/// Widen `range` by [`AXIS_MARGIN`] on both sides; a zero-width range gets
/// a unit of room so the chart never divides by zero.
pub fn padded(range: [f64; 2]) -> [f64; 2] {
    let [lo, hi] = range;
    let span = hi - lo;
    if span <= 0.0 {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * AXIS_MARGIN };
        return [lo - pad, hi + pad];
    }
    [lo - span * AXIS_MARGIN, hi + span * AXIS_MARGIN]
}

/// Shared limits for both Nyquist axes: the smaller of the two lower bounds
/// and the larger of the two upper bounds, so the plot keeps a 1:1 scale.
pub fn nyquist_bounds(tables: &[&MeasurementTable]) -> Option<[f64; 2]> {
    let x = data_range(tables.iter().flat_map(|t| t.column(Field::ZReal)))?;
    let y = data_range(
        tables
            .iter()
            .flat_map(|t| t.column(Field::ZImag).into_iter().map(|v| -v)),
    )?;
    let [x_lo, x_hi] = padded(x);
    let [y_lo, y_hi] = padded(y);
    Some([x_lo.min(y_lo), x_hi.max(y_hi)])
}

/// Three evenly spaced tick labels across `bounds`.
pub fn linear_labels(bounds: [f64; 2]) -> Vec<String> {
    let [lo, hi] = bounds;
    [lo, (lo + hi) / 2.0, hi]
        .into_iter()
        .map(format_axis_value)
        .collect()
}

/// Tick labels for a log10-frequency axis, rendered back as frequencies.
pub fn frequency_labels(bounds: [f64; 2]) -> Vec<String> {
    let [lo, hi] = bounds;
    [lo, (lo + hi) / 2.0, hi]
        .into_iter()
        .map(|exp| format_frequency(10f64.powf(exp)))
        .collect()
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Draw `kind` for `exports` into `area`.
///
/// `selected` picks the file for single-file kinds and is clamped to the
/// available range.
pub fn render_chart(
    frame: &mut Frame,
    area: Rect,
    kind: RenderKind,
    exports: &[ParsedExport],
    selected: usize,
    theme: &Theme,
) {
    if exports.is_empty() {
        render_no_data(frame, area, theme);
        return;
    }

    let selected = selected.min(exports.len() - 1);
    let series: Vec<(usize, &ParsedExport)> = if kind.is_multi_file() {
        exports.iter().enumerate().collect()
    } else {
        vec![(selected, &exports[selected])]
    };

    let title = if kind.is_multi_file() {
        format!("{} ({} files)", kind.title(), exports.len())
    } else {
        format!("{} - {}", kind.title(), exports[selected].display_name())
    };

    match kind {
        RenderKind::Nyquist | RenderKind::CompareNyquist => {
            render_nyquist(frame, area, &title, &series, theme)
        }
        RenderKind::Bode | RenderKind::CompareBode => {
            render_bode(frame, area, &title, &series, theme)
        }
        RenderKind::NyquistBode | RenderKind::Comparison => {
            let [left, right] =
                Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .areas(area);
            render_nyquist(frame, left, &title, &series, theme);
            render_bode(frame, right, "Bode", &series, theme);
        }
    }
}

/// Placeholder shown when there is nothing to plot.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        "No measurements loaded",
        theme.dim,
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border)
            .title(Span::styled(" EIS ", theme.title)),
    );
    frame.render_widget(paragraph, area);
}

fn render_nyquist(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    series: &[(usize, &ParsedExport)],
    theme: &Theme,
) {
    let tables: Vec<&MeasurementTable> = series.iter().map(|(_, e)| &e.table).collect();
    let Some(bounds) = nyquist_bounds(&tables) else {
        render_no_data(frame, area, theme);
        return;
    };

    let points: Vec<Vec<(f64, f64)>> = tables.iter().map(|t| t.nyquist_points()).collect();
    let datasets = datasets(series, &points, theme);

    let chart = Chart::new(datasets)
        .block(chart_block(title, theme))
        .x_axis(linear_axis("Z'/ohm", bounds, theme))
        .y_axis(linear_axis("-Z\"/ohm", bounds, theme));
    frame.render_widget(chart, area);
}

/// Magnitude on top, phase below, sharing the log-frequency axis.
fn render_bode(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    series: &[(usize, &ParsedExport)],
    theme: &Theme,
) {
    let magnitude: Vec<Vec<(f64, f64)>> = series
        .iter()
        .map(|(_, e)| e.table.bode_magnitude_points())
        .collect();
    let phase: Vec<Vec<(f64, f64)>> = series
        .iter()
        .map(|(_, e)| e.table.bode_phase_points())
        .collect();

    let Some(x) = data_range(magnitude.iter().flatten().map(|p| p.0)) else {
        render_no_data(frame, area, theme);
        return;
    };
    let x = padded(x);
    let mag_y = data_range(magnitude.iter().flatten().map(|p| p.1)).map_or([0.0, 1.0], padded);
    let phase_y = data_range(phase.iter().flatten().map(|p| p.1)).map_or([0.0, 1.0], padded);

    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);

    let mag_chart = Chart::new(datasets(series, &magnitude, theme))
        .block(chart_block(title, theme))
        .x_axis(frequency_axis(x, theme))
        .y_axis(linear_axis("|Z|/ohm", mag_y, theme));
    frame.render_widget(mag_chart, top);

    let phase_chart = Chart::new(datasets(series, &phase, theme))
        .block(chart_block("Phase", theme))
        .x_axis(frequency_axis(x, theme))
        .y_axis(linear_axis("Phase/deg", phase_y, theme));
    frame.render_widget(phase_chart, bottom);
}

// ── Widget helpers ────────────────────────────────────────────────────────────

fn datasets<'a>(
    series: &[(usize, &ParsedExport)],
    points: &'a [Vec<(f64, f64)>],
    theme: &Theme,
) -> Vec<Dataset<'a>> {
    series
        .iter()
        .zip(points)
        .map(|((idx, export), pts)| {
            Dataset::default()
                .name(export.display_name())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(theme.series_style(*idx))
                .data(pts)
        })
        .collect()
}

fn chart_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(format!(" {title} "), theme.title))
}

fn linear_axis<'a>(title: &'a str, bounds: [f64; 2], theme: &Theme) -> Axis<'a> {
    Axis::default()
        .title(Span::styled(title, theme.axis_title))
        .style(theme.axis)
        .bounds(bounds)
        .labels(linear_labels(bounds))
}

fn frequency_axis<'a>(bounds: [f64; 2], theme: &Theme) -> Axis<'a> {
    Axis::default()
        .title(Span::styled("f", theme.axis_title))
        .style(theme.axis)
        .bounds(bounds)
        .labels(frequency_labels(bounds))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
