//! Filename convention for CI profiling sessions
//!
//! Sessions are saved as `path/to/{event}_{run_id}_{commit_sha}.extension`.
//! The event that triggered the run and the commit it profiled can both be
//! recovered from the stem alone.
//!
//! `workflow_dispatch` is the only event name containing an underscore that
//! is understood. Other multi-word event names (`pull_request`,
//! `merge_group`, ...) will report only their first word.

use crate::path::ArtifactPath;

/// First token of a manually dispatched run.
pub const WORKFLOW_DISPATCH_MARKER: &str = "workflow";

/// Label reported for manually dispatched runs.
pub const WORKFLOW_DISPATCH_LABEL: &str = "workflow dispatch";

/// Minimum number of underscore-separated tokens: event, run id, sha.
const MIN_TOKENS: usize = 3;

/// Information recovered from an artifact's file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameMetadata {
    /// Commit token exactly as it appears in the file name
    pub commit_sha: String,
    /// Human label of the triggering event
    pub triggered_by: String,
}

impl FilenameMetadata {
    /// Parse the stem of `path`
    ///
    /// # Errors
    /// Returns [`MetadataError::MalformedFilename`] when the stem has fewer
    /// than three underscore-separated tokens or any token is empty.
    pub fn from_path(path: &ArtifactPath) -> Result<Self, MetadataError> {
        let stem = path.stem();
        let tokens: Vec<&str> = stem.split('_').collect();
        if tokens.len() < MIN_TOKENS || tokens.iter().any(|t| t.is_empty()) {
            return Err(MetadataError::MalformedFilename(path.to_string()));
        }

        let commit_sha = tokens[tokens.len() - 1].to_string();
        let triggered_by = if tokens[0] == WORKFLOW_DISPATCH_MARKER {
            WORKFLOW_DISPATCH_LABEL.to_string()
        } else {
            tokens[0].to_string()
        };

        Ok(Self {
            commit_sha,
            triggered_by,
        })
    }
}

/// Errors while reading the filename convention
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MetadataError {
    /// Stem does not follow `{event}_{run_id}_{sha}`
    #[error("file name does not follow <event>_<run-id>_<commit-sha>: {0}")]
    MalformedFilename(String),
}
