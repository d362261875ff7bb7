//! # labtrack-plot
//!
//! The plotting collaborator: renders an ordered `(x, y)` series as a 2D
//! line chart in an SVG file. Each call overwrites the destination file, so
//! a plot is always a current-snapshot view.

use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use thiserror::Error;

const PLOT_SIZE: (u32, u32) = (800, 480);

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("chart rendering failed for {path}: {message}")]
    Render { path: PathBuf, message: String },

    #[error("failed to write plot file: {0}")]
    Io(#[from] std::io::Error),
}

impl PlotError {
    fn render(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Render {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Draw `series` as a line chart into the SVG file at `path`.
///
/// `title` doubles as the y-axis label. An empty series produces an empty
/// chart rather than an error.
pub fn render_series(
    path: &Path,
    title: &str,
    x_label: &str,
    series: &[(f64, f64)],
) -> Result<(), PlotError> {
    // Render into a buffer first so filesystem failures surface as one
    // clean i/o error instead of a backend drop.
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, PLOT_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(|e| PlotError::render(path, e))?;

        let (x_range, y_range) = axis_ranges(series);
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(16)
            .x_label_area_size(40)
            .y_label_area_size(56)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| PlotError::render(path, e))?;

        chart
            .configure_mesh()
            .x_desc(x_label)
            .y_desc(title)
            .draw()
            .map_err(|e| PlotError::render(path, e))?;

        chart
            .draw_series(LineSeries::new(series.iter().copied(), &BLUE))
            .map_err(|e| PlotError::render(path, e))?;

        root.present().map_err(|e| PlotError::render(path, e))?;
    }

    std::fs::write(path, svg)?;
    Ok(())
}

// Plotters rejects degenerate ranges, so pad empty and single-value extents.
fn axis_ranges(series: &[(f64, f64)]) -> (Range<f64>, Range<f64>) {
    if series.is_empty() {
        return (0.0..1.0, 0.0..1.0);
    }

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in series {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    (pad(x_min, x_max), pad(y_min, y_max))
}

fn pad(min: f64, max: f64) -> Range<f64> {
    if min == max {
        (min - 0.5)..(max + 0.5)
    } else {
        min..max
    }
}
