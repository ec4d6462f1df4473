//! Page assembly
//!
//! Each page template carries exactly one sentinel marking where generated
//! markdown goes. A template with no sentinel, or more than one, is
//! rejected before anything is written.

use crate::config::{SiteConfig, INDEX_PAGE, LOOKUP_PAGE, STATS_PAGE};
use crate::dataset::Dataset;
use crate::error::{BuildError, BuildResult};
use crate::markdown;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Template structure errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// Sentinel does not occur
    #[error("sentinel '{0}' not found")]
    MissingSentinel(String),

    /// Sentinel occurs more than once
    #[error("sentinel '{sentinel}' occurs {count} times, expected once")]
    RepeatedSentinel { sentinel: String, count: usize },

    /// Sentinel is the empty string
    #[error("sentinel must not be empty")]
    EmptySentinel,
}

/// Template split at its single sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    before: &'a str,
    after: &'a str,
}

impl<'a> Template<'a> {
    /// Split `text` at `sentinel`
    ///
    /// # Errors
    /// Returns `TemplateError` unless `sentinel` is non-empty and occurs
    /// exactly once
    pub fn parse(text: &'a str, sentinel: &str) -> Result<Self, TemplateError> {
        if sentinel.is_empty() {
            return Err(TemplateError::EmptySentinel);
        }
        let count = text.matches(sentinel).count();
        match count {
            0 => Err(TemplateError::MissingSentinel(sentinel.to_string())),
            1 => {
                let (before, after) = text
                    .split_once(sentinel)
                    .ok_or_else(|| TemplateError::MissingSentinel(sentinel.to_string()))?;
                Ok(Self { before, after })
            }
            count => Err(TemplateError::RepeatedSentinel {
                sentinel: sentinel.to_string(),
                count,
            }),
        }
    }

    /// Text with `injected` in place of the sentinel
    #[must_use]
    pub fn splice(&self, injected: &str) -> String {
        let mut out = String::with_capacity(self.before.len() + injected.len() + self.after.len());
        out.push_str(self.before);
        out.push_str(injected);
        out.push_str(self.after);
        out
    }
}

/// Replace the single `sentinel` in `template` with `injected`
///
/// # Errors
/// See [`Template::parse`]
pub fn splice(template: &str, sentinel: &str, injected: &str) -> Result<String, TemplateError> {
    Template::parse(template, sentinel).map(|t| t.splice(injected))
}

fn splice_file(template_path: &Path, sentinel: &str, injected: &str, output: &Path) -> BuildResult<()> {
    let text = std::fs::read_to_string(template_path)
        .map_err(|e| BuildError::io_error(template_path, e))?;
    let page = splice(&text, sentinel, injected).map_err(|source| {
        tracing::error!("Template {} rejected: {}", template_path.display(), source);
        BuildError::Template {
            path: template_path.to_path_buf(),
            source,
        }
    })?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::io_error(parent, e))?;
    }
    std::fs::write(output, page).map_err(|e| BuildError::io_error(output, e))?;
    tracing::info!("Wrote {}", output.display());
    Ok(())
}

/// Write the lookup-table page into `build_dir`
///
/// # Errors
/// - `BuildError::Unsorted` if the dataset has not been sorted
/// - `BuildError::Template` or `BuildError::Io` for template problems
pub fn write_lookup_page(config: &SiteConfig, dataset: &Dataset, build_dir: &Path) -> BuildResult<PathBuf> {
    dataset.ensure_sorted("writing the lookup table")?;
    let table = dataset.to_markdown(&dataset.lookup_columns());
    let output = build_dir.join(LOOKUP_PAGE);
    splice_file(&config.lookup_template_path(), &config.table_sentinel, &table, &output)?;
    Ok(output)
}

/// Markdown embedding each plot under its own heading, in map order
#[must_use]
pub fn plots_markdown(plots: &IndexMap<String, PathBuf>, build_dir: &Path) -> String {
    plots
        .iter()
        .map(|(name, path)| format!("\n### {name} \n{}", markdown::md_image(path, build_dir, name)))
        .collect()
}

/// Write the run-statistics page into `build_dir`
///
/// # Errors
/// `BuildError::Template` or `BuildError::Io` for template problems
pub fn write_stats_page(
    config: &SiteConfig,
    plots: &IndexMap<String, PathBuf>,
    build_dir: &Path,
) -> BuildResult<PathBuf> {
    let output = build_dir.join(STATS_PAGE);
    splice_file(
        &config.stats_template_path(),
        &config.stats_sentinel,
        &plots_markdown(plots, build_dir),
        &output,
    )?;
    Ok(output)
}

/// Copy the static landing page verbatim
///
/// # Errors
/// `BuildError::Io` if the copy fails
pub fn copy_index_page(config: &SiteConfig, build_dir: &Path) -> BuildResult<PathBuf> {
    let source = config.index_page_path();
    let output = build_dir.join(INDEX_PAGE);
    std::fs::create_dir_all(build_dir).map_err(|e| BuildError::io_error(build_dir, e))?;
    std::fs::copy(&source, &output).map_err(|e| BuildError::io_error(&source, e))?;
    tracing::info!("Copied {} to {}", source.display(), output.display());
    Ok(output)
}
