// Line chart output

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

/// Everything needed to draw one traffic chart
#[derive(Debug, Clone, Copy)]
pub struct ChartRequest<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub series_label: &'a str,
    pub points: &'a [(f64, f64)],
    /// Canvas size in pixels
    pub size: (u32, u32),
    pub path: &'a Path,
}

/// Chart backend trait
pub trait ChartSink: Send + Sync {
    /// Draw `request.points` as a line chart and write it to `request.path`,
    /// replacing any existing file.
    fn draw_line_chart(&self, request: &ChartRequest<'_>) -> Result<()>;
}

/// PNG line charts via plotters' bitmap backend
#[derive(Debug, Default, Clone, Copy)]
pub struct PlottersChart;

fn plot_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow::anyhow!("{}", e)
}

/// Axis ranges that always have a non-zero span
fn axis_bounds(points: &[(f64, f64)]) -> (f64, f64) {
    let x_max = points.iter().map(|p| p.0).fold(1.0, f64::max);
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max);
    (x_max, if y_max > 0.0 { y_max * 1.05 } else { 1.0 })
}

impl ChartSink for PlottersChart {
    fn draw_line_chart(&self, request: &ChartRequest<'_>) -> Result<()> {
        let (x_max, y_max) = axis_bounds(request.points);

        let root = BitMapBackend::new(request.path, request.size).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(request.title, ("sans-serif", 48))
            .margin(24)
            .x_label_area_size(80)
            .y_label_area_size(120)
            .build_cartesian_2d(0f64..x_max, 0f64..y_max)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_desc(request.x_label)
            .y_desc(request.y_label)
            .axis_desc_style(("sans-serif", 32))
            .label_style(("sans-serif", 24))
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(LineSeries::new(request.points.iter().copied(), &BLUE))
            .map_err(plot_err)?
            .label(request.series_label)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], &BLUE));

        chart
            .draw_series(
                request
                    .points
                    .iter()
                    .map(|&point| Circle::new(point, 4, BLUE.filled())),
            )
            .map_err(plot_err)?;

        chart
            .configure_series_labels()
            .label_font(("sans-serif", 28))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)?;

        root.present()
            .map_err(plot_err)
            .with_context(|| format!("Failed to write chart {:?}", request.path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG";

    fn request<'a>(points: &'a [(f64, f64)], path: &'a Path) -> ChartRequest<'a> {
        ChartRequest {
            title: "Traffic statistics",
            x_label: "time (1s ticks)",
            y_label: "traffic (KB)",
            series_label: "8080-Received",
            points,
            size: (640, 480),
            path,
        }
    }

    #[test]
    fn test_writes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("8080-Received.png");
        let points = [(1.0, 0.0), (2.0, 1.0), (3.0, 0.0)];

        PlottersChart.draw_line_chart(&request(&points, &path)).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(PNG_MAGIC));
    }

    #[test]
    fn test_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("8080-Received.png");
        std::fs::write(&path, b"stale chart").unwrap();
        let points = [(1.0, 4.0)];

        PlottersChart.draw_line_chart(&request(&points, &path)).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(PNG_MAGIC));
        assert!(bytes.len() > b"stale chart".len());
    }

    #[test]
    fn test_axis_bounds_never_collapse() {
        assert_eq!(axis_bounds(&[]), (1.0, 1.0));
        assert_eq!(axis_bounds(&[(1.0, 0.0), (2.0, 0.0)]), (2.0, 1.0));

        let (x_max, y_max) = axis_bounds(&[(1.0, 10.0), (3.0, 20.0)]);
        assert_eq!(x_max, 3.0);
        assert!(y_max > 20.0);
    }
}
