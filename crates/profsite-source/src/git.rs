//! Git-backed content source
//!
//! Talks to the repository through the `git` command line so no libgit
//! binding is needed. Every call is read-only.

use crate::error::{SourceError, SourceResult};
use crate::source::{ContentSource, ShellPattern};
use profsite_artifact::ArtifactPath;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Content source reading branches of a local git repository
#[derive(Debug, Clone)]
pub struct GitContentSource {
    root: PathBuf,
}

impl GitContentSource {
    /// Open the repository whose working tree is `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the repository containing `dir`
    ///
    /// # Errors
    /// Returns `SourceError::Command` if `dir` is not inside a git work tree
    pub fn discover(dir: &Path) -> SourceResult<Self> {
        let out = run_git(dir, &["rev-parse", "--show-toplevel"])?;
        if !out.status.success() {
            return Err(command_error(&["rev-parse", "--show-toplevel"], &out));
        }
        let top = String::from_utf8_lossy(&out.stdout).trim().to_string();
        Ok(Self::new(top))
    }

    fn git(&self, args: &[&str]) -> SourceResult<Output> {
        run_git(&self.root, args)
    }

    fn ensure_branch(&self, branch: &str) -> SourceResult<()> {
        let refname = format!("refs/heads/{branch}");
        let out = self.git(&["rev-parse", "--verify", "--quiet", &refname])?;
        if out.status.success() {
            Ok(())
        } else {
            Err(SourceError::BranchNotFound(branch.to_string()))
        }
    }

    /// Walk one tree: its blobs first, then each subtree in turn
    fn walk(&self, branch: &str, dir: &[String], out: &mut Vec<Vec<String>>) -> SourceResult<()> {
        let treeish = format!("{branch}:{}", dir.join("/"));
        let args = ["ls-tree", "-z", treeish.as_str()];
        let listing = self.git(&args)?;
        if !listing.status.success() {
            return Err(command_error(&args, &listing));
        }

        let mut subtrees = Vec::new();
        for entry in listing.stdout.split(|b| *b == 0).filter(|e| !e.is_empty()) {
            let entry = String::from_utf8_lossy(entry);
            let Some((meta, name)) = entry.split_once('\t') else {
                continue;
            };
            let mut child = dir.to_vec();
            child.push(name.to_string());
            match meta.split(' ').nth(1) {
                Some("blob") => out.push(child),
                Some("tree") => subtrees.push(child),
                // submodules
                _ => {}
            }
        }

        for sub in subtrees {
            self.walk(branch, &sub, out)?;
        }
        Ok(())
    }
}

impl ContentSource for GitContentSource {
    fn list(&self, branch: &str, pattern: &str) -> SourceResult<Vec<ArtifactPath>> {
        let pattern = ShellPattern::new(pattern)?;
        self.ensure_branch(branch)?;
        let mut files = Vec::new();
        self.walk(branch, &[], &mut files)?;
        tracing::debug!("{} files on branch {}", files.len(), branch);

        let mut matched = Vec::new();
        for segments in files {
            let raw = segments.join("/");
            if !pattern.matches(&raw) {
                continue;
            }
            match ArtifactPath::new(segments) {
                Ok(path) => matched.push(path),
                Err(e) => tracing::warn!("Skipping {} on branch {}: {}", raw, branch, e),
            }
        }
        Ok(matched)
    }

    fn fetch(&self, branch: &str, path: &ArtifactPath) -> SourceResult<Vec<u8>> {
        let object = format!("{branch}:{path}");
        let exists = self.git(&["cat-file", "-e", &object])?;
        if !exists.status.success() {
            return Err(SourceError::NotFound {
                branch: branch.to_string(),
                path: path.clone(),
            });
        }
        let args = ["cat-file", "blob", object.as_str()];
        let out = self.git(&args)?;
        if !out.status.success() {
            return Err(command_error(&args, &out));
        }
        Ok(out.stdout)
    }

    fn resolve_commit(&self, token: &str) -> SourceResult<String> {
        let rev = format!("{token}^{{commit}}");
        let out = self.git(&["rev-parse", "--verify", "--quiet", "--short", &rev])?;
        let short = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if out.status.success() && !short.is_empty() {
            Ok(short)
        } else {
            Err(SourceError::UnresolvedCommit(token.to_string()))
        }
    }

    fn repository_root(&self) -> &Path {
        &self.root
    }
}

fn run_git(dir: &Path, args: &[&str]) -> SourceResult<Output> {
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| SourceError::io_error(dir, e))
}

fn command_error(args: &[&str], out: &Output) -> SourceError {
    SourceError::Command {
        args: args.join(" "),
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
    }
}
