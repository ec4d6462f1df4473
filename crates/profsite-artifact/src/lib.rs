//! profsite Artifact Model
//!
//! Value types describing a stored profiling session before anything has
//! been fetched or rendered.
//!
//! # Core Concepts
//!
//! - [`ArtifactPath`]: Validated branch-relative location of a session file
//! - [`FilenameMetadata`]: Commit token and trigger label parsed from the name
//!
//! # Example
//!
//! ```rust
//! use profsite_artifact::{ArtifactPath, FilenameMetadata};
//!
//! let path: ArtifactPath = "push_1_aaa1111.pyisession".parse().unwrap();
//! let meta = FilenameMetadata::from_path(&path).unwrap();
//! assert_eq!(meta.triggered_by, "push");
//! assert_eq!(meta.commit_sha, "aaa1111");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod filename;
mod path;

pub use filename::{
    FilenameMetadata, MetadataError, WORKFLOW_DISPATCH_LABEL, WORKFLOW_DISPATCH_MARKER,
};
pub use path::{ArtifactPath, PathError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
