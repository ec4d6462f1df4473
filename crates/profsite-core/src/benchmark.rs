//! Benchmark record for continuous benchmark tracking
//!
//! Written in the "customSmallerIsBetter" entry shape consumed by
//! github-action-benchmark: a JSON array of `{name, unit, value}` entries
//! with optional `range` and `extra`.

use crate::dataset::Dataset;
use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Entry name of the runtime benchmark
pub const RUNTIME_BENCHMARK: &str = "CPU runtime";

/// One benchmark data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub name: String,
    pub unit: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl BenchmarkEntry {
    /// Create entry without range or extra
    #[must_use]
    pub fn new(name: impl Into<String>, unit: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            value,
            range: None,
            extra: None,
        }
    }

    /// With free-form extra text
    #[inline]
    #[must_use]
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

/// Entries describing the latest run that has a duration
///
/// # Errors
/// Returns `BuildError::Unsorted` if the dataset has not been sorted
pub fn latest_entries(dataset: &Dataset) -> BuildResult<Vec<BenchmarkEntry>> {
    dataset.ensure_sorted("recording benchmarks")?;
    let Some((latest, duration)) = dataset
        .records()
        .iter()
        .rev()
        .find_map(|r| r.duration_seconds.map(|d| (r, d)))
    else {
        return Ok(Vec::new());
    };

    let mut entry = BenchmarkEntry::new(RUNTIME_BENCHMARK, "s", duration);
    let commit = latest.commit_sha.as_deref().unwrap_or_default();
    let trigger = latest.triggered_by.as_deref().unwrap_or_default();
    if !commit.is_empty() || !trigger.is_empty() {
        entry = entry.with_extra(format!("commit: {commit}\ntriggered by: {trigger}"));
    }
    Ok(vec![entry])
}

/// Write the benchmark record for `dataset` to `output`
///
/// # Errors
/// - `BuildError::Unsorted` if the dataset has not been sorted
/// - `BuildError::Serialize` or `BuildError::Io` if the file cannot be written
pub fn write_benchmark_record(dataset: &Dataset, output: &Path) -> BuildResult<usize> {
    let entries = latest_entries(dataset)?;
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(output, json).map_err(|e| BuildError::io_error(output, e))?;
    tracing::info!("Wrote {} benchmark entries to {}", entries.len(), output.display());
    Ok(entries.len())
}
