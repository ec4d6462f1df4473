//! Build orchestration
//!
//! One invocation walks a fixed sequence of phases:
//!
//! ```text
//! Init → [Clean] → CollectStats → RenderHtml → WriteLookup → WriteStatsPage → CopyStatic → Cleanup → Done
//! ```
//!
//! The scratch workspace is removed in `Cleanup` whether or not the earlier
//! phases succeeded. A cleanup failure fails the build even when every page
//! was written.

use crate::benchmark::write_benchmark_record;
use crate::config::{SiteConfig, BENCHMARK_RECORD, PLOTS_DIR, REPORTS_DIR};
use crate::dataset::{Dataset, NamingPolicy, StageContext};
use crate::error::{BuildError, BuildResult};
use crate::pages::{copy_index_page, write_lookup_page, write_stats_page};
use crate::plots::make_plots;
use crate::workspace::{clean_build_directory, ScratchWorkspace};
use indexmap::IndexMap;
use profsite_render::{ArtifactRenderer, ChartRenderer};
use profsite_source::ContentSource;
use std::fmt;
use std::path::PathBuf;

/// Phase of a build invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    Init,
    Clean,
    CollectStats,
    RenderHtml,
    WriteLookup,
    WriteStatsPage,
    CopyStatic,
    Cleanup,
    Done,
}

impl BuildPhase {
    /// Phases reachable from this one
    ///
    /// Any phase may jump to `Cleanup` when it fails.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [BuildPhase] {
        use BuildPhase::{
            Clean, Cleanup, CollectStats, CopyStatic, Done, Init, RenderHtml, WriteLookup,
            WriteStatsPage,
        };
        match self {
            Init => &[Clean, CollectStats, Cleanup],
            Clean => &[CollectStats, Cleanup],
            CollectStats => &[RenderHtml, Cleanup],
            RenderHtml => &[WriteLookup, Cleanup],
            WriteLookup => &[WriteStatsPage, Cleanup],
            WriteStatsPage => &[CopyStatic, Cleanup],
            CopyStatic => &[Cleanup],
            Cleanup => &[Done],
            Done => &[],
        }
    }

    /// Whether `next` may follow this phase
    #[inline]
    #[must_use]
    pub fn can_advance_to(self, next: BuildPhase) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Clean => "clean",
            Self::CollectStats => "collect-stats",
            Self::RenderHtml => "render-html",
            Self::WriteLookup => "write-lookup",
            Self::WriteStatsPage => "write-stats-page",
            Self::CopyStatic => "copy-static",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-invocation options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Branch holding the session files
    pub source_branch: String,
    /// Build output root
    pub build_dir: PathBuf,
    /// Use flattened report names
    pub flatten: bool,
    /// Remove the build directory first
    pub clean_build: bool,
    /// Also write a benchmark record
    pub benchmark_record: bool,
}

impl BuildOptions {
    /// Options with every flag off
    #[must_use]
    pub fn new(source_branch: impl Into<String>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_branch: source_branch.into(),
            build_dir: build_dir.into(),
            flatten: false,
            clean_build: false,
            benchmark_record: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_clean_build(mut self, clean_build: bool) -> Self {
        self.clean_build = clean_build;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_benchmark_record(mut self, benchmark_record: bool) -> Self {
        self.benchmark_record = benchmark_record;
        self
    }

    /// Report naming policy selected by the flags
    #[must_use]
    pub fn naming_policy(&self) -> NamingPolicy {
        if self.flatten {
            NamingPolicy::Flattened
        } else {
            NamingPolicy::PreserveStructure
        }
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Final, chronologically sorted dataset
    pub dataset: Dataset,
    /// Build output root
    pub build_dir: PathBuf,
    /// Pages written, in write order
    pub pages: Vec<PathBuf>,
    /// Plot names and their images
    pub plots: IndexMap<String, PathBuf>,
    /// Benchmark record, when requested
    pub benchmark_record: Option<PathBuf>,
    /// Whether the build directory was removed first
    pub cleaned: bool,
}

impl BuildReport {
    /// Rows that recorded at least one issue
    #[must_use]
    pub fn rows_with_issues(&self) -> usize {
        self.dataset
            .records()
            .iter()
            .filter(|r| !r.issues.is_empty())
            .count()
    }
}

/// Builds the profiling site from a content source
pub struct SiteBuilder<'a> {
    config: SiteConfig,
    source: &'a dyn ContentSource,
    renderer: &'a dyn ArtifactRenderer,
    charts: &'a dyn ChartRenderer,
}

impl<'a> SiteBuilder<'a> {
    /// Create builder over explicit collaborators
    #[must_use]
    pub fn new(
        config: SiteConfig,
        source: &'a dyn ContentSource,
        renderer: &'a dyn ArtifactRenderer,
        charts: &'a dyn ChartRenderer,
    ) -> Self {
        Self {
            config,
            source,
            renderer,
            charts,
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Run one build
    ///
    /// # Errors
    /// - `BuildError::CleanOutsideRepository` if asked to clean a directory
    ///   outside the repository root
    /// - `BuildError::ScratchExists` / `BuildError::ScratchCleanup` for
    ///   scratch workspace problems
    /// - `BuildError::Source` if the branch cannot be listed
    /// - `BuildError::Render` for an unsupported render target
    /// - `BuildError::Template`, `BuildError::Chart` or `BuildError::Io`
    ///   if a page or plot cannot be written
    pub fn build(&self, options: &BuildOptions) -> BuildResult<BuildReport> {
        let mut phase = BuildPhase::Init;
        let build_dir = options.build_dir.as_path();
        tracing::info!(
            "Building site from branch '{}' into {}",
            options.source_branch,
            build_dir.display()
        );

        let mut cleaned = false;
        if options.clean_build {
            advance(&mut phase, BuildPhase::Clean);
            cleaned = clean_build_directory(build_dir, &self.config.repo_root)?;
        }

        std::fs::create_dir_all(build_dir).map_err(|e| BuildError::io_error(build_dir, e))?;
        let scratch = ScratchWorkspace::create(build_dir)?;

        let outcome = self.run_phases(options, &scratch, &mut phase);
        let last_phase = phase;

        advance(&mut phase, BuildPhase::Cleanup);
        let removed = scratch.remove();

        let mut report = match (outcome, removed) {
            (Ok(report), Ok(())) => report,
            (Ok(_), Err(cleanup)) => {
                tracing::error!("Pages were written but {}", cleanup);
                return Err(cleanup);
            }
            (Err(e), Ok(())) => {
                tracing::error!("Build failed during {}: {}", last_phase, e);
                return Err(e);
            }
            (Err(e), Err(cleanup)) => {
                tracing::error!("Build failed: {}; additionally {}", e, cleanup);
                return Err(e);
            }
        };
        report.cleaned = cleaned;

        advance(&mut phase, BuildPhase::Done);
        tracing::info!(
            "Built {} runs ({} with issues) into {}",
            report.dataset.len(),
            report.rows_with_issues(),
            build_dir.display()
        );
        Ok(report)
    }

    fn run_phases(
        &self,
        options: &BuildOptions,
        scratch: &ScratchWorkspace,
        phase: &mut BuildPhase,
    ) -> BuildResult<BuildReport> {
        let build_dir = options.build_dir.as_path();
        let ctx = StageContext {
            source: self.source,
            renderer: self.renderer,
            branch: &options.source_branch,
            scratch,
        };

        advance(phase, BuildPhase::CollectStats);
        let artifacts = self
            .source
            .list(&options.source_branch, &self.config.artifact_pattern)?;
        let mut dataset = Dataset::seed(artifacts, self.config.supplementary_columns.clone())?;
        dataset.apply_filename_metadata(self.source);
        dataset.apply_run_stats(ctx, &self.config.stats_suffix)?;
        dataset.sort_chronological();

        advance(phase, BuildPhase::RenderHtml);
        dataset.apply_html_outputs(
            ctx,
            options.naming_policy(),
            &build_dir.join(REPORTS_DIR),
            build_dir,
            &self.config.link_text,
        )?;

        advance(phase, BuildPhase::WriteLookup);
        let mut pages = vec![write_lookup_page(&self.config, &dataset, build_dir)?];

        advance(phase, BuildPhase::WriteStatsPage);
        let plots = make_plots(&dataset, self.charts, &build_dir.join(PLOTS_DIR))?;
        pages.push(write_stats_page(&self.config, &plots, build_dir)?);

        advance(phase, BuildPhase::CopyStatic);
        pages.push(copy_index_page(&self.config, build_dir)?);
        let benchmark_record = if options.benchmark_record {
            let path = build_dir.join(BENCHMARK_RECORD);
            write_benchmark_record(&dataset, &path)?;
            Some(path)
        } else {
            None
        };

        Ok(BuildReport {
            dataset,
            build_dir: build_dir.to_path_buf(),
            pages,
            plots,
            benchmark_record,
            cleaned: false,
        })
    }
}

fn advance(phase: &mut BuildPhase, next: BuildPhase) {
    debug_assert!(
        phase.can_advance_to(next),
        "illegal build phase transition {phase} -> {next}"
    );
    tracing::debug!("Build phase {} -> {}", phase, next);
    *phase = next;
}
