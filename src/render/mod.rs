// Turns the final series snapshot into one traffic chart per port and direction

pub mod chart;

use crate::error::RenderError;
use crate::store::{Direction, PortSeries, SeriesSnapshot};
use chart::{ChartRequest, ChartSink};
use std::path::PathBuf;
use std::sync::Arc;

/// Bytes per plotted unit (KB)
pub const UNIT_SCALE: f64 = 1024.0;

pub const CHART_TITLE: &str = "Traffic statistics";
pub const X_LABEL: &str = "time (1s ticks)";
pub const Y_LABEL: &str = "traffic (KB)";

/// Per-tick deltas `(tick, KB in that tick)` for ticks 1..N.
///
/// Ticks listed in `breaks` start a new owning process; no delta is computed
/// across them. Counter regressions without a recorded break plot as 0.
pub fn delta_points(samples: &[u64], breaks: &[usize]) -> Vec<(f64, f64)> {
    samples
        .windows(2)
        .enumerate()
        .map(|(i, pair)| (i + 1, pair))
        .filter(|(tick, _)| !breaks.contains(tick))
        .map(|(tick, pair)| {
            let delta = pair[1].saturating_sub(pair[0]);
            (tick as f64, delta as f64 / UNIT_SCALE)
        })
        .collect()
}

/// Whether a series moved at all within any owner segment.
///
/// Without breaks this is `len >= 2 && first != last`.
pub fn has_traffic(samples: &[u64], breaks: &[usize]) -> bool {
    if samples.len() < 2 {
        return false;
    }

    let mut start = 0;
    for &end in breaks.iter().chain(std::iter::once(&samples.len())) {
        if end > start && end <= samples.len() && samples[start] != samples[end - 1] {
            return true;
        }
        start = end;
    }
    false
}

/// File name of the chart for one port and direction
pub fn artifact_name(port: u16, direction: Direction) -> String {
    format!("{}-{}.png", port, direction.label())
}

/// Outcome of rendering a whole snapshot
#[derive(Debug, Default)]
pub struct RenderReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<(u16, Direction)>,
    pub failures: Vec<RenderError>,
}

impl RenderReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct SnapshotRenderer {
    chart: Arc<dyn ChartSink>,
    output_dir: PathBuf,
    size: (u32, u32),
}

impl SnapshotRenderer {
    pub fn new(chart: Arc<dyn ChartSink>, output_dir: impl Into<PathBuf>, size: (u32, u32)) -> Self {
        Self {
            chart,
            output_dir: output_dir.into(),
            size,
        }
    }

    /// Render every port; one failed chart never prevents the others.
    pub fn render_all(&self, snapshot: &SeriesSnapshot) -> RenderReport {
        let mut report = RenderReport::default();

        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            report.failures.push(RenderError::OutputDir(
                self.output_dir.display().to_string(),
                e.to_string(),
            ));
            return report;
        }

        for (&port, series) in snapshot {
            self.render(port, series, &mut report);
        }

        report
    }

    /// Render both directions of one port into `report`.
    pub fn render(&self, port: u16, series: &PortSeries, report: &mut RenderReport) {
        for direction in Direction::ALL {
            let samples = series.series(direction);
            if !has_traffic(samples, &series.breaks) {
                log::debug!("{}: no {} traffic, skipping chart", port, direction);
                report.skipped.push((port, direction));
                continue;
            }

            let points = delta_points(samples, &series.breaks);
            let series_label = format!("{}-{}", port, direction.label());
            let path = self.output_dir.join(artifact_name(port, direction));
            let request = ChartRequest {
                title: CHART_TITLE,
                x_label: X_LABEL,
                y_label: Y_LABEL,
                series_label: &series_label,
                points: &points,
                size: self.size,
                path: &path,
            };

            match self.chart.draw_line_chart(&request) {
                Ok(()) => {
                    log::info!("Saved {} ({} point(s))", path.display(), points.len());
                    report.written.push(path);
                }
                Err(e) => {
                    let err = RenderError::Chart(
                        path.display().to_string(),
                        format!("{:#}", e),
                    );
                    log::error!("{}", err);
                    report.failures.push(err);
                }
            }
        }
    }
}
