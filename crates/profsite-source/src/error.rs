//! Error types for content source access

use profsite_artifact::ArtifactPath;
use std::path::PathBuf;

/// Errors raised by a [`ContentSource`](crate::ContentSource)
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Branch does not exist
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Path does not exist on the branch
    #[error("{path} not found on branch {branch}")]
    NotFound { branch: String, path: ArtifactPath },

    /// Commit token does not name a known commit
    #[error("cannot resolve commit: {0}")]
    UnresolvedCommit(String),

    /// Listing pattern is not a valid glob
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Underlying version-control command failed
    #[error("git {args} failed: {stderr}")]
    Command { args: String, stderr: String },

    /// IO error
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is the "missing path" condition
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for content source operations
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguishable() {
        let err = SourceError::NotFound {
            branch: "results".into(),
            path: "a.stats.json".parse().unwrap(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "a.stats.json not found on branch results");
        assert!(!SourceError::BranchNotFound("x".into()).is_not_found());
    }
}
