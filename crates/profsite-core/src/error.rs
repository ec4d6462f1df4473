//! Error types for the site build
//!
//! Two families:
//! - [`BuildError`]: fatal or structural, stops the build
//! - [`RowIssue`]: recoverable, recorded on the affected row and logged

use crate::pages::TemplateError;
use profsite_artifact::ArtifactPath;
use profsite_render::{ChartError, RenderError, RenderTarget};
use profsite_source::SourceError;
use std::path::PathBuf;

/// Main build error type
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Clean target lies outside the repository root
    #[error(
        "refusing to remove {target}: it is not inside repository root {root}; clear it manually"
    )]
    CleanOutsideRepository { target: PathBuf, root: PathBuf },

    /// Scratch directory name already taken
    #[error("scratch workspace {0} already exists")]
    ScratchExists(PathBuf),

    /// Scratch directory could not be removed at the end of the build
    #[error("failed to remove scratch workspace {path}: {source}")]
    ScratchCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Render error that is a caller mistake
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Content source failure outside any single row
    #[error("content source error: {0}")]
    Source(#[from] SourceError),

    /// Template does not contain exactly one sentinel
    #[error("template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// Chart rendering failed
    #[error("chart error: {0}")]
    Chart(#[from] ChartError),

    /// The same artifact was listed twice
    #[error("duplicate artifact path: {0}")]
    DuplicateArtifact(ArtifactPath),

    /// A consumer ran before the chronological sort
    #[error("dataset must be sorted chronologically before {0}")]
    Unsorted(&'static str),

    /// Output could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// IO error
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error comes from the destructive-operation safety check
    #[inline]
    #[must_use]
    pub fn is_safety_violation(&self) -> bool {
        matches!(self, Self::CleanOutsideRepository { .. })
    }
}

/// Recoverable problem with a single row
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowIssue {
    /// File name does not follow the naming convention
    #[error("filename metadata: {0}")]
    Metadata(String),

    /// Commit token in the file name did not resolve
    #[error("commit resolution: {0}")]
    CommitResolution(String),

    /// Artifact bytes could not be fetched
    #[error("fetch: {0}")]
    Fetch(String),

    /// Renderer failed for this artifact
    #[error("render {target}: {message}")]
    Render {
        target: RenderTarget,
        message: String,
    },

    /// Metrics or supplementary stats could not be read
    #[error("stats: {0}")]
    Stats(String),
}

/// Result type alias for build operations
pub type BuildResult<T> = Result<T, BuildError>;
