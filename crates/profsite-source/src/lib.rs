//! profsite Content Source
//!
//! Read-only access to profiling artifacts stored on version-control
//! branches.
//!
//! # Core Operations
//!
//! - **List**: every file on a branch, depth-first, filtered by a shell glob
//! - **Fetch**: raw bytes of one file, optionally written through to disk
//! - **Resolve**: commit token → short hash
//!
//! # Example
//!
//! ```rust,ignore
//! use profsite_source::{ContentSource, GitContentSource};
//!
//! let source = GitContentSource::discover(std::path::Path::new("."))?;
//! for path in source.list("profiling-results", "*.pyisession")? {
//!     let bytes = source.fetch("profiling-results", &path)?;
//!     println!("{path}: {} bytes", bytes.len());
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
mod git;
mod source;

pub use error::{SourceError, SourceResult};
pub use git::GitContentSource;
pub use source::{filter_matching, ContentSource, ShellPattern};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
