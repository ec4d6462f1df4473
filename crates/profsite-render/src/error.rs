//! Error types for rendering
//!
//! Provides error handling for:
//! - Session rendering (artifact → report / metrics record)
//! - Chart rendering (series → image)

use std::path::PathBuf;

/// Errors while rendering a profiling session
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Target format is not produced by this renderer
    #[error("unsupported render target: {0}")]
    UnsupportedTarget(String),

    /// External renderer exited unsuccessfully
    #[error("renderer failed on {input}: {message}")]
    Failed { input: PathBuf, message: String },

    /// IO error while preparing or writing output
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error is a caller mistake that must stop the build
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedTarget(_))
    }
}

/// Errors while rendering a chart
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    /// IO error writing the image
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Formatting the image failed
    #[error("chart formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}
