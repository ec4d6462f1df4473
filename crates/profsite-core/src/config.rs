//! Site build configuration
//!
//! Every field has a default matching the repository layout the site is
//! normally built from, so a config file only needs to name what differs.
//! Relative paths resolve against the repository root.
//!
//! ```toml
//! artifact_pattern = "*.pyisession"
//! supplementary_columns = ["peak_memory_mb"]
//!
//! [renderer]
//! program = "pyinstrument"
//! ```

use profsite_render::{CommandRenderer, RenderTarget};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sentinel replaced by the lookup table.
pub const TABLE_SENTINEL: &str = "<<<MATCH_PATTERN_FOR_MARKDOWN_TABLE_INSERT>>>";

/// Sentinel replaced by the plot embeds.
pub const STATS_SENTINEL: &str = "<<<MATCH_PATTERN_FOR_RUN_STATISTICS_INSERT>>>";

/// Output file names under the build root
pub const INDEX_PAGE: &str = "index.md";
pub const LOOKUP_PAGE: &str = "profiling_index.md";
pub const STATS_PAGE: &str = "run_statistics.md";
pub const REPORTS_DIR: &str = "reports";
pub const PLOTS_DIR: &str = "plots";
pub const BENCHMARK_RECORD: &str = "benchmark.json";

/// Site build configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Repository root; anchor for relative paths and the clean safety check
    pub repo_root: PathBuf,
    /// Build directory used when none is given on the command line
    pub build_dir: PathBuf,
    /// Shell pattern selecting session files on the source branch
    pub artifact_pattern: String,
    /// Template of the lookup-table page
    pub lookup_template: PathBuf,
    /// Template of the run-statistics page
    pub stats_template: PathBuf,
    /// Static landing page copied verbatim
    pub index_page: PathBuf,
    /// Injection marker inside `lookup_template`
    pub table_sentinel: String,
    /// Injection marker inside `stats_template`
    pub stats_sentinel: String,
    /// Extra columns read from a sibling stats file, in table order
    pub supplementary_columns: Vec<String>,
    /// Suffix replacing the session extension to name the sibling stats file
    pub stats_suffix: String,
    /// Text of each report hyperlink
    pub link_text: String,
    /// External session renderer
    pub renderer: RendererConfig,
}

impl SiteConfig {
    /// Default configuration rooted at `repo_root`
    #[must_use]
    pub fn for_repository(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            ..Self::default()
        }
    }

    /// Load from a TOML file, then anchor at `repo_root` unless the file names one
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed
    pub fn load(path: &Path, repo_root: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.repo_root.as_os_str().is_empty() {
            config.repo_root = repo_root.to_path_buf();
        } else if config.repo_root.is_relative() {
            config.repo_root = repo_root.join(&config.repo_root);
        }
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.repo_root.join(path)
    }

    /// Absolute default build directory
    #[must_use]
    pub fn default_build_dir(&self) -> PathBuf {
        self.resolve(&self.build_dir)
    }

    /// Absolute lookup template path
    #[must_use]
    pub fn lookup_template_path(&self) -> PathBuf {
        self.resolve(&self.lookup_template)
    }

    /// Absolute run-statistics template path
    #[must_use]
    pub fn stats_template_path(&self) -> PathBuf {
        self.resolve(&self.stats_template)
    }

    /// Absolute static index page path
    #[must_use]
    pub fn index_page_path(&self) -> PathBuf {
        self.resolve(&self.index_page)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::new(),
            build_dir: PathBuf::from("build"),
            artifact_pattern: "*.pyisession".to_string(),
            lookup_template: PathBuf::from("src/profiling_index.md"),
            stats_template: PathBuf::from("src/run_statistics.md"),
            index_page: PathBuf::from("src/index.md"),
            table_sentinel: TABLE_SENTINEL.to_string(),
            stats_sentinel: STATS_SENTINEL.to_string(),
            supplementary_columns: Vec::new(),
            stats_suffix: ".stats.json".to_string(),
            link_text: "Profiling results".to_string(),
            renderer: RendererConfig::default(),
        }
    }
}

/// External renderer invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Program to run
    pub program: String,
    /// Renderer name producing the HTML report
    pub rich_report: Option<String>,
    /// Renderer name producing the JSON metrics record
    pub metrics_record: Option<String>,
}

impl RendererConfig {
    /// Build the command renderer described by this config
    #[must_use]
    pub fn command(&self) -> CommandRenderer {
        let mut renderer = CommandRenderer::new(&self.program);
        if let Some(name) = &self.rich_report {
            renderer = renderer.with_target(RenderTarget::RichReport, name);
        }
        if let Some(name) = &self.metrics_record {
            renderer = renderer.with_target(RenderTarget::MetricsRecord, name);
        }
        renderer
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "pyinstrument".to_string(),
            rich_report: Some("html".to_string()),
            metrics_record: Some("json".to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file malformed
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
