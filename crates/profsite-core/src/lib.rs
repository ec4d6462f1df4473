//! profsite Core
//!
//! Builds the static profiling site from sessions stored on a branch:
//!
//! 1. List session files and seed one [`RunRecord`] per file
//! 2. Read commit and trigger from each file name, render each session's
//!    metrics record and read its start time and duration
//! 3. Sort chronologically
//! 4. Render each session's HTML report
//! 5. Write the lookup table page, the trend plots and the statistics page
//! 6. Copy the static landing page
//!
//! Collaborators (content source, session renderer, chart renderer) are
//! passed in, so a build can run entirely against in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use profsite_core::prelude::*;
//!
//! let source = GitContentSource::discover(Path::new("."))?;
//! let config = SiteConfig::for_repository(source.repository_root());
//! let renderer = config.renderer.command();
//! let charts = SvgChartRenderer::default();
//!
//! let builder = SiteBuilder::new(config, &source, &renderer, &charts);
//! let report = builder.build(&BuildOptions::new("profiling-results", "build"))?;
//! println!("{}", report.dataset.to_markdown(&report.dataset.lookup_columns()));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod benchmark;
pub mod builder;
pub mod config;
pub mod dataset;
pub mod error;
pub mod markdown;
pub mod pages;
pub mod plots;
pub mod stats;
pub mod workspace;

pub use builder::{BuildOptions, BuildPhase, BuildReport, SiteBuilder};
pub use config::{RendererConfig, SiteConfig};
pub use dataset::{Column, Dataset, NamingPolicy, RunRecord, StageContext};
pub use error::{BuildError, BuildResult, RowIssue};
pub use pages::{splice, Template, TemplateError};
pub use stats::{RunMetrics, UNKNOWN_START};
pub use workspace::{clean_build_directory, ScratchWorkspace};

/// Common imports for driving a build
pub mod prelude {
    pub use crate::builder::{BuildOptions, BuildReport, SiteBuilder};
    pub use crate::config::SiteConfig;
    pub use crate::dataset::{Column, Dataset};
    pub use crate::error::{BuildError, BuildResult};
    pub use profsite_artifact::ArtifactPath;
    pub use profsite_render::{CommandRenderer, SvgChartRenderer};
    pub use profsite_source::{ContentSource, GitContentSource};
    pub use std::path::Path;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
