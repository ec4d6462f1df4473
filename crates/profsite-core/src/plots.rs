//! Trend plots derived from the sorted dataset

use crate::dataset::Dataset;
use crate::error::{BuildError, BuildResult};
use indexmap::IndexMap;
use profsite_render::{ChartRenderer, LineChart};
use std::path::{Path, PathBuf};

/// Name of the runtime plot, also its heading on the statistics page
pub const RUNTIME_PLOT: &str = "CPU Time";

/// Render every trend plot into `plot_dir`
///
/// Returns plot names mapped to image paths, in the order the plots are
/// meant to appear. Rows without a duration are left out of the series.
///
/// # Errors
/// - `BuildError::Unsorted` if the dataset has not been sorted
/// - `BuildError::Chart` or `BuildError::Io` if an image cannot be written
pub fn make_plots(
    dataset: &Dataset,
    charts: &dyn ChartRenderer,
    plot_dir: &Path,
) -> BuildResult<IndexMap<String, PathBuf>> {
    dataset.ensure_sorted("plotting")?;
    std::fs::create_dir_all(plot_dir).map_err(|e| BuildError::io_error(plot_dir, e))?;

    let mut plots = IndexMap::new();

    let points: Vec<_> = dataset
        .records()
        .iter()
        .filter_map(|r| Some((r.sort_key(), r.duration_seconds?)))
        .collect();
    let omitted = dataset.len() - points.len();
    if omitted > 0 {
        tracing::debug!("{} rows without duration left out of {}", omitted, RUNTIME_PLOT);
    }
    let chart = LineChart::new("Profiling script CPU runtime", "Run triggered on", "Runtime (s)")
        .with_points(points);
    let output = plot_dir.join(format!("runtime_figure.{}", charts.extension()));
    charts.render_line_chart(&chart, &output)?;
    tracing::info!("Wrote plot {}", output.display());
    plots.insert(RUNTIME_PLOT.to_string(), output);

    Ok(plots)
}
