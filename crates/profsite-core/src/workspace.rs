//! Build directory management
//!
//! - [`clean_build_directory`]: the only destructive operation of a build,
//!   refused for anything outside the repository root
//! - [`ScratchWorkspace`]: per-build staging directory for fetched sessions
//!   and intermediate metrics records

use crate::error::{BuildError, BuildResult};
use chrono::{DateTime, Utc};
use profsite_artifact::ArtifactPath;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against `base` and fold `.` and `..` without
/// touching the filesystem
#[must_use]
pub fn normalize_path(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `path` lies strictly below `root`
#[must_use]
pub fn is_strict_descendant(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

/// Remove the build directory before a fresh build
///
/// Returns whether anything was removed. A target that does not exist is
/// a no-op.
///
/// # Errors
/// - `BuildError::CleanOutsideRepository` if `build_dir` is not strictly
///   inside `repo_root`; nothing is touched
/// - `BuildError::Io` if removal fails
pub fn clean_build_directory(build_dir: &Path, repo_root: &Path) -> BuildResult<bool> {
    let cwd = std::env::current_dir().map_err(|e| BuildError::io_error(".", e))?;
    let target = normalize_path(build_dir, &cwd);
    let root = normalize_path(repo_root, &cwd);

    if !is_strict_descendant(&target, &root) {
        tracing::error!(
            "Refusing to clean {}: outside repository root {}",
            target.display(),
            root.display()
        );
        return Err(BuildError::CleanOutsideRepository { target, root });
    }
    if !target.exists() {
        tracing::debug!("Nothing to clean at {}", target.display());
        return Ok(false);
    }

    // Symlinks along the way may lead outside the root
    let resolved = std::fs::canonicalize(&target).map_err(|e| BuildError::io_error(&target, e))?;
    let resolved_root = std::fs::canonicalize(&root).map_err(|e| BuildError::io_error(&root, e))?;
    if !is_strict_descendant(&resolved, &resolved_root) {
        tracing::error!(
            "Refusing to clean {}: resolves to {} outside repository root {}",
            target.display(),
            resolved.display(),
            resolved_root.display()
        );
        return Err(BuildError::CleanOutsideRepository {
            target: resolved,
            root: resolved_root,
        });
    }

    std::fs::remove_dir_all(&resolved).map_err(|e| BuildError::io_error(&resolved, e))?;
    tracing::info!("Removed build directory {}", target.display());
    Ok(true)
}

/// Staging directory owned by one build
///
/// Named from the build's start minute (`%Y%m%d%H%M_tmp`) and nested under
/// the build directory. Mirrors artifact paths beneath it. Must be removed
/// explicitly with [`ScratchWorkspace::remove`] so that failure to remove
/// is reported.
#[derive(Debug)]
pub struct ScratchWorkspace {
    root: PathBuf,
}

impl ScratchWorkspace {
    /// Create the workspace for a build starting now
    ///
    /// # Errors
    /// See [`ScratchWorkspace::create_at`]
    pub fn create(build_dir: &Path) -> BuildResult<Self> {
        Self::create_at(build_dir, Utc::now())
    }

    /// Create the workspace for a build starting at `started`
    ///
    /// # Errors
    /// - `BuildError::ScratchExists` if the computed directory already exists
    /// - `BuildError::Io` if it cannot be created
    pub fn create_at(build_dir: &Path, started: DateTime<Utc>) -> BuildResult<Self> {
        let root = build_dir.join(started.format("%Y%m%d%H%M_tmp").to_string());
        if root.exists() {
            return Err(BuildError::ScratchExists(root));
        }
        std::fs::create_dir_all(&root).map_err(|e| BuildError::io_error(&root, e))?;
        tracing::debug!("Created scratch workspace {}", root.display());
        Ok(Self { root })
    }

    /// Workspace directory
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Where the raw session for `artifact` is staged
    #[must_use]
    pub fn stage_path(&self, artifact: &ArtifactPath) -> PathBuf {
        artifact.under(&self.root)
    }

    /// Where the metrics record for `artifact` is written
    #[must_use]
    pub fn metrics_path(&self, artifact: &ArtifactPath) -> PathBuf {
        artifact
            .parent_under(&self.root)
            .join(format!("{}.metrics.json", artifact.file_name()))
    }

    /// Delete the workspace and everything in it
    ///
    /// # Errors
    /// Returns `BuildError::ScratchCleanup` if removal fails
    pub fn remove(self) -> BuildResult<()> {
        std::fs::remove_dir_all(&self.root).map_err(|source| BuildError::ScratchCleanup {
            path: self.root.clone(),
            source,
        })?;
        tracing::debug!("Removed scratch workspace {}", self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(
            normalize_path(Path::new("a/./b/../c"), Path::new("/repo")),
            PathBuf::from("/repo/a/c")
        );
        assert_eq!(
            normalize_path(Path::new("/x/../y"), Path::new("/ignored")),
            PathBuf::from("/y")
        );
    }

    #[test]
    fn strict_descendant() {
        let root = Path::new("/repo");
        assert!(is_strict_descendant(Path::new("/repo/build"), root));
        assert!(!is_strict_descendant(Path::new("/repo"), root));
        assert!(!is_strict_descendant(Path::new("/repository/build"), root));
        assert!(!is_strict_descendant(Path::new("/tmp/build"), root));
    }

    #[test]
    fn clean_refuses_outside_root() {
        let repo = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let marker = outside.path().join("keep.txt");
        std::fs::write(&marker, "x").unwrap();

        let err = clean_build_directory(outside.path(), repo.path()).unwrap_err();
        assert!(err.is_safety_violation());
        assert!(marker.exists());
    }

    #[test]
    fn clean_refuses_root_itself_and_escapes() {
        let repo = tempfile::tempdir().unwrap();
        assert!(clean_build_directory(repo.path(), repo.path())
            .unwrap_err()
            .is_safety_violation());
        let sneaky = repo.path().join("build/../..");
        assert!(clean_build_directory(&sneaky, repo.path())
            .unwrap_err()
            .is_safety_violation());
        assert!(repo.path().exists());
    }

    #[test]
    fn clean_removes_descendant() {
        let repo = tempfile::tempdir().unwrap();
        let build = repo.path().join("build");
        std::fs::create_dir_all(build.join("reports")).unwrap();
        std::fs::write(build.join("reports/a.html"), "x").unwrap();

        assert!(clean_build_directory(&build, repo.path()).unwrap());
        assert!(!build.exists());
    }

    #[cfg(unix)]
    #[test]
    fn clean_refuses_symlink_escaping_root() {
        let repo = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let victim = outside.path().join("site");
        std::fs::create_dir_all(&victim).unwrap();
        std::fs::write(victim.join("keep.html"), "x").unwrap();
        std::os::unix::fs::symlink(outside.path(), repo.path().join("link")).unwrap();

        let err = clean_build_directory(&repo.path().join("link/site"), repo.path()).unwrap_err();
        assert!(err.is_safety_violation());
        assert!(victim.join("keep.html").exists());
    }

    #[cfg(unix)]
    #[test]
    fn clean_follows_symlink_staying_inside_root() {
        let repo = tempfile::tempdir().unwrap();
        let real = repo.path().join("out/site");
        std::fs::create_dir_all(&real).unwrap();
        std::os::unix::fs::symlink(repo.path().join("out"), repo.path().join("alias")).unwrap();

        assert!(clean_build_directory(&repo.path().join("alias/site"), repo.path()).unwrap());
        assert!(!real.exists());
    }

    #[test]
    fn clean_missing_descendant_is_noop() {
        let repo = tempfile::tempdir().unwrap();
        let build = repo.path().join("build");
        assert!(!clean_build_directory(&build, repo.path()).unwrap());
    }

    #[test]
    fn scratch_lifecycle() {
        let build = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 59).unwrap();
        let scratch = ScratchWorkspace::create_at(build.path(), started).unwrap();
        assert_eq!(scratch.path(), build.path().join("202403091405_tmp"));
        assert!(scratch.path().is_dir());

        let artifact: ArtifactPath = "runs/push_1_a.pyisession".parse().unwrap();
        assert_eq!(
            scratch.stage_path(&artifact),
            scratch.path().join("runs/push_1_a.pyisession")
        );
        assert_eq!(
            scratch.metrics_path(&artifact),
            scratch.path().join("runs/push_1_a.pyisession.metrics.json")
        );

        let root = scratch.path().to_path_buf();
        scratch.remove().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn scratch_refuses_existing_name() {
        let build = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let first = ScratchWorkspace::create_at(build.path(), started).unwrap();
        let err = ScratchWorkspace::create_at(build.path(), started).unwrap_err();
        assert!(matches!(err, BuildError::ScratchExists(_)));
        first.remove().unwrap();
    }

    #[test]
    fn scratch_remove_failure_propagates() {
        let build = tempfile::tempdir().unwrap();
        let scratch = ScratchWorkspace::create(build.path()).unwrap();
        std::fs::remove_dir_all(scratch.path()).unwrap();
        assert!(matches!(
            scratch.remove(),
            Err(BuildError::ScratchCleanup { .. })
        ));
    }
}
