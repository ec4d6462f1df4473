//! Artifact paths on the content source
//!
//! Provides [`ArtifactPath`], the branch-relative location of a stored
//! profiling session. Paths are validated on construction so they can be
//! mirrored beneath a local directory without escaping it.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Path of an artifact relative to the branch root
///
/// Hierarchical structure using `/`-separated segments.
///
/// # Examples
/// - `["push_1_aaa1111.pyisession"]` → `push_1_aaa1111.pyisession`
/// - `["nightly", "profile.pyisession"]` → `nightly/profile.pyisession`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactPath(Vec<String>);

impl ArtifactPath {
    /// Create path from pre-validated segments
    ///
    /// # Errors
    /// Returns error if any segment is empty, `.`, `..` or contains a separator
    pub fn new(segments: Vec<String>) -> Result<Self, PathError> {
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        for seg in &segments {
            validate_segment(seg)?;
        }
        Ok(Self(segments))
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; an artifact path names at least a file
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Final segment (the file name)
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// File name without its final extension
    ///
    /// `run.tar.pyisession` → `run.tar`; a name without a dot is its own stem.
    #[must_use]
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Directory segments above the file name
    #[inline]
    #[must_use]
    pub fn parent_segments(&self) -> &[String] {
        &self.0[..self.0.len() - 1]
    }

    /// Path of a file in the same directory
    ///
    /// # Errors
    /// Returns error if `file_name` is not a valid segment
    pub fn sibling(&self, file_name: impl Into<String>) -> Result<Self, PathError> {
        let file_name = file_name.into();
        validate_segment(&file_name)?;
        let mut segments = self.parent_segments().to_vec();
        segments.push(file_name);
        Ok(Self(segments))
    }

    /// Mirror this path beneath a local directory
    #[must_use]
    pub fn under(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for seg in &self.0 {
            out.push(seg);
        }
        out
    }

    /// Mirror only the directory part beneath a local directory
    #[must_use]
    pub fn parent_under(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for seg in self.parent_segments() {
            out.push(seg);
        }
        out
    }
}

fn validate_segment(seg: &str) -> Result<(), PathError> {
    if seg.is_empty() {
        Err(PathError::EmptySegment)
    } else if seg == "." || seg == ".." {
        Err(PathError::RelativeSegment(seg.to_string()))
    } else if seg.contains(['/', '\\', '\0']) {
        Err(PathError::InvalidSegment(seg.to_string()))
    } else {
        Ok(())
    }
}

impl Display for ArtifactPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for ArtifactPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        if s.starts_with('/') {
            return Err(PathError::Absolute(s.to_string()));
        }
        let segments: Vec<String> = s.split('/').map(str::to_string).collect();
        Self::new(segments)
    }
}

/// Errors related to artifact paths
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    /// No segments at all
    #[error("artifact path is empty")]
    Empty,

    /// Empty segment in path
    #[error("artifact path contains empty segment")]
    EmptySegment,

    /// `.` or `..` segment
    #[error("artifact path contains relative segment: {0}")]
    RelativeSegment(String),

    /// Invalid segment characters
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// Leading separator
    #[error("artifact path must be relative: {0}")]
    Absolute(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_from_str_nested() {
        let path: ArtifactPath = "nightly/linux/profile.pyisession".parse().unwrap();
        assert_eq!(path.segments(), &["nightly", "linux", "profile.pyisession"]);
        assert_eq!(path.len(), 3);
        assert_eq!(path.file_name(), "profile.pyisession");
        assert_eq!(path.parent_segments(), &["nightly", "linux"]);
    }

    #[test]
    fn path_stem() {
        let path: ArtifactPath = "push_1_aaa1111.pyisession".parse().unwrap();
        assert_eq!(path.stem(), "push_1_aaa1111");

        let bare: ArtifactPath = "README".parse().unwrap();
        assert_eq!(bare.stem(), "README");

        let hidden: ArtifactPath = ".profile".parse().unwrap();
        assert_eq!(hidden.stem(), ".profile");
    }

    #[test]
    fn path_sibling_keeps_directory() {
        let path: ArtifactPath = "a/b/run.pyisession".parse().unwrap();
        let stats = path.sibling("run.stats.json").unwrap();
        assert_eq!(stats.to_string(), "a/b/run.stats.json");
    }

    #[test]
    fn path_sibling_rejects_separator() {
        let path: ArtifactPath = "run.pyisession".parse().unwrap();
        assert!(matches!(
            path.sibling("../escape"),
            Err(PathError::InvalidSegment(_))
        ));
    }

    #[test]
    fn path_under_mirrors_structure() {
        let path: ArtifactPath = "a/b/run.pyisession".parse().unwrap();
        let root = Path::new("/tmp/scratch");
        assert_eq!(
            path.under(root),
            PathBuf::from("/tmp/scratch/a/b/run.pyisession")
        );
        assert_eq!(path.parent_under(root), PathBuf::from("/tmp/scratch/a/b"));
    }

    #[test]
    fn path_rejects_escape() {
        assert_eq!(
            "../x.pyisession".parse::<ArtifactPath>(),
            Err(PathError::RelativeSegment("..".into()))
        );
        assert_eq!("a//b".parse::<ArtifactPath>(), Err(PathError::EmptySegment));
        assert!(matches!(
            "/etc/passwd".parse::<ArtifactPath>(),
            Err(PathError::Absolute(_))
        ));
        assert_eq!("".parse::<ArtifactPath>(), Err(PathError::Empty));
    }

    #[test]
    fn path_display_roundtrip() {
        let path: ArtifactPath = "x/y.pyisession".parse().unwrap();
        assert_eq!(path.to_string(), "x/y.pyisession");
        assert_eq!(path.to_string().parse::<ArtifactPath>().unwrap(), path);
    }
}
