//! The content source seam
//!
//! Builds receive a [`ContentSource`] instead of reaching for a global
//! repository handle, so tests can substitute an in-memory branch.

use crate::error::{SourceError, SourceResult};
use glob::{MatchOptions, Pattern};
use profsite_artifact::ArtifactPath;
use std::path::Path;

/// Read-only view of artifacts stored on version-control branches
pub trait ContentSource {
    /// All files on `branch`, depth-first, matching the shell pattern
    ///
    /// # Errors
    /// - `SourceError::BranchNotFound` if the branch does not exist
    /// - `SourceError::InvalidPattern` if `pattern` is not a valid glob
    fn list(&self, branch: &str, pattern: &str) -> SourceResult<Vec<ArtifactPath>>;

    /// Raw bytes of `path` on `branch`
    ///
    /// # Errors
    /// Returns `SourceError::NotFound` if the path does not exist on the branch
    fn fetch(&self, branch: &str, path: &ArtifactPath) -> SourceResult<Vec<u8>>;

    /// Short hash of the commit named by `token`
    ///
    /// # Errors
    /// Returns `SourceError::UnresolvedCommit` if the token names no commit
    fn resolve_commit(&self, token: &str) -> SourceResult<String>;

    /// Working tree root of the repository backing this source
    fn repository_root(&self) -> &Path;

    /// Fetch `path` and also write it to `dest`, creating missing parents
    ///
    /// # Errors
    /// Propagates fetch errors and IO errors while writing `dest`
    fn fetch_to(&self, branch: &str, path: &ArtifactPath, dest: &Path) -> SourceResult<Vec<u8>> {
        let bytes = self.fetch(branch, path)?;
        if let Some(parent) = dest.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| SourceError::io_error(parent, e))?;
            }
        }
        std::fs::write(dest, &bytes).map_err(|e| SourceError::io_error(dest, e))?;
        Ok(bytes)
    }
}

/// Compiled shell-style pattern over `/`-joined paths
///
/// `*` is allowed to cross `/`, so `*.pyisession` matches at any depth.
#[derive(Debug, Clone)]
pub struct ShellPattern {
    compiled: Pattern,
}

impl ShellPattern {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    /// # Errors
    /// Returns `SourceError::InvalidPattern` if `pattern` cannot be compiled
    pub fn new(pattern: &str) -> SourceResult<Self> {
        let compiled = Pattern::new(pattern).map_err(|e| SourceError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { compiled })
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        self.compiled.matches_with(raw, Self::OPTIONS)
    }
}

/// Keep the paths matching a shell-style pattern, preserving order
///
/// # Errors
/// Returns `SourceError::InvalidPattern` if `pattern` cannot be compiled
pub fn filter_matching<I>(paths: I, pattern: &str) -> SourceResult<Vec<ArtifactPath>>
where
    I: IntoIterator<Item = ArtifactPath>,
{
    let pattern = ShellPattern::new(pattern)?;
    Ok(paths
        .into_iter()
        .filter(|p| pattern.matches(&p.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(raw: &[&str]) -> Vec<ArtifactPath> {
        raw.iter().map(|p| p.parse().unwrap()).collect()
    }

    #[test]
    fn filter_matches_any_depth() {
        let all = paths(&[
            "push_1_a.pyisession",
            "README.md",
            "nested/dir/schedule_2_b.pyisession",
            "nested/push_3_c.stats.json",
        ]);
        let matched = filter_matching(all, "*.pyisession").unwrap();
        let names: Vec<String> = matched.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["push_1_a.pyisession", "nested/dir/schedule_2_b.pyisession"]
        );
    }

    #[test]
    fn filter_rejects_bad_pattern() {
        let result = filter_matching(paths(&["a"]), "[");
        assert!(matches!(result, Err(SourceError::InvalidPattern { .. })));
    }

    #[test]
    fn pattern_matches_raw_strings() {
        let pattern = ShellPattern::new("*.pyisession").unwrap();
        assert!(pattern.matches("a/b/push_1_a.pyisession"));
        assert!(!pattern.matches("notes\\windows.txt"));
        assert!(!pattern.matches("push_1_a.PYISESSION"));
    }
}
