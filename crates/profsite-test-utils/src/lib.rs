//! Testing utilities for the profsite workspace
//!
//! In-memory stand-ins for the build's collaborators and a throwaway
//! repository layout with page templates.

#![allow(missing_docs)]

use indexmap::IndexMap;
use profsite_artifact::ArtifactPath;
use profsite_render::{ArtifactRenderer, RenderError, RenderTarget};
use profsite_source::{filter_matching, ContentSource, SourceError, SourceResult};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Content source backed by maps; files list in insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentSource {
    root: PathBuf,
    branches: HashMap<String, IndexMap<ArtifactPath, Vec<u8>>>,
    commits: HashMap<String, String>,
}

impl InMemoryContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Create `branch` with no files
    #[must_use]
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branches.entry(branch.to_string()).or_default();
        self
    }

    /// Add a file to `branch`, creating the branch if needed
    #[must_use]
    pub fn with_file(mut self, branch: &str, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let path: ArtifactPath = path.parse().unwrap();
        self.branches
            .entry(branch.to_string())
            .or_default()
            .insert(path, bytes.into());
        self
    }

    /// Make `token` resolve to `short`
    #[must_use]
    pub fn with_commit(mut self, token: &str, short: &str) -> Self {
        self.commits.insert(token.to_string(), short.to_string());
        self
    }
}

impl ContentSource for InMemoryContentSource {
    fn list(&self, branch: &str, pattern: &str) -> SourceResult<Vec<ArtifactPath>> {
        let files = self
            .branches
            .get(branch)
            .ok_or_else(|| SourceError::BranchNotFound(branch.to_string()))?;
        filter_matching(files.keys().cloned(), pattern)
    }

    fn fetch(&self, branch: &str, path: &ArtifactPath) -> SourceResult<Vec<u8>> {
        let files = self
            .branches
            .get(branch)
            .ok_or_else(|| SourceError::BranchNotFound(branch.to_string()))?;
        files.get(path).cloned().ok_or_else(|| SourceError::NotFound {
            branch: branch.to_string(),
            path: path.clone(),
        })
    }

    fn resolve_commit(&self, token: &str) -> SourceResult<String> {
        self.commits
            .get(token)
            .cloned()
            .ok_or_else(|| SourceError::UnresolvedCommit(token.to_string()))
    }

    fn repository_root(&self) -> &Path {
        &self.root
    }
}

/// Renderer that never spawns a process
///
/// Rich reports are a stub HTML page naming the session. Metrics records are
/// the session bytes copied as-is, so fixtures store sessions as the JSON
/// they should read back as.
#[derive(Debug)]
pub struct FakeRenderer {
    targets: BTreeSet<RenderTarget>,
    failing: HashSet<String>,
    calls: RefCell<Vec<(String, RenderTarget)>>,
}

impl Default for FakeRenderer {
    fn default() -> Self {
        Self {
            targets: [RenderTarget::RichReport, RenderTarget::MetricsRecord].into(),
            failing: HashSet::new(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Support only `targets`
    #[must_use]
    pub fn with_targets(mut self, targets: &[RenderTarget]) -> Self {
        self.targets = targets.iter().copied().collect();
        self
    }

    /// Fail every render of a session with this file name
    #[must_use]
    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.failing.insert(file_name.to_string());
        self
    }

    /// Rendered session file names and targets, in call order
    pub fn calls(&self) -> Vec<(String, RenderTarget)> {
        self.calls.borrow().clone()
    }
}

impl ArtifactRenderer for FakeRenderer {
    fn supports(&self, target: RenderTarget) -> bool {
        self.targets.contains(&target)
    }

    fn render(&self, input: &Path, target: RenderTarget, output: &Path) -> Result<(), RenderError> {
        if !self.supports(target) {
            return Err(RenderError::UnsupportedTarget(target.to_string()));
        }
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.borrow_mut().push((name.clone(), target));

        if self.failing.contains(&name) {
            return Err(RenderError::Failed {
                input: input.to_path_buf(),
                message: "fake renderer told to fail".to_string(),
            });
        }
        match target {
            RenderTarget::RichReport => std::fs::write(
                output,
                format!("<html><body><h1>{name}</h1></body></html>\n"),
            ),
            RenderTarget::MetricsRecord => std::fs::copy(input, output).map(|_| ()),
        }
        .map_err(|e| RenderError::io_error(output, e))
    }
}

/// Session payload reading back as the given start time and duration
pub fn session_json(start_time: Option<f64>, duration: Option<f64>) -> Vec<u8> {
    let mut object = serde_json::Map::new();
    if let Some(start) = start_time {
        object.insert("start_time".into(), start.into());
    }
    if let Some(duration) = duration {
        object.insert("duration".into(), duration.into());
    }
    object.insert("sample_count".into(), 128.into());
    serde_json::to_vec(&serde_json::Value::Object(object)).unwrap()
}

pub const LOOKUP_TEMPLATE: &str = "src/profiling_index.md";
pub const STATS_TEMPLATE: &str = "src/run_statistics.md";
pub const INDEX_PAGE: &str = "src/index.md";

pub const INDEX_CONTENT: &str = "# Profiling\n\nSee the [lookup table](profiling_index.md).\n";

/// Throwaway repository root holding the page templates and landing page
pub struct SiteFixture {
    dir: TempDir,
}

impl SiteFixture {
    /// Write templates containing the given sentinels
    pub fn new(table_sentinel: &str, stats_sentinel: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(
            root.join(LOOKUP_TEMPLATE),
            format!("# Profiling lookup\n\n{table_sentinel}\n\nGenerated nightly.\n"),
        )
        .unwrap();
        std::fs::write(
            root.join(STATS_TEMPLATE),
            format!("# Run statistics\n{stats_sentinel}\n"),
        )
        .unwrap();
        std::fs::write(root.join(INDEX_PAGE), INDEX_CONTENT).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root().join("build")
    }

    /// Overwrite a template or other file under the root
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn read_build(&self, relative: &str) -> String {
        std::fs::read_to_string(self.build_dir().join(relative)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_lists_in_insertion_order() {
        let source = InMemoryContentSource::new("/repo")
            .with_file("results", "b/push_1_a.pyisession", "{}")
            .with_file("results", "a/push_2_b.pyisession", "{}")
            .with_file("results", "notes.txt", "x");
        let listed: Vec<String> = source
            .list("results", "*.pyisession")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(listed, vec!["b/push_1_a.pyisession", "a/push_2_b.pyisession"]);
        assert!(matches!(
            source.list("missing", "*"),
            Err(SourceError::BranchNotFound(_))
        ));
    }

    #[test]
    fn in_memory_fetch_and_resolve() {
        let source = InMemoryContentSource::new("/repo")
            .with_file("results", "x.pyisession", "abc")
            .with_commit("abc1234", "abc1234");
        let path: ArtifactPath = "x.pyisession".parse().unwrap();
        assert_eq!(source.fetch("results", &path).unwrap(), b"abc");
        let missing: ArtifactPath = "y".parse().unwrap();
        assert!(source.fetch("results", &missing).unwrap_err().is_not_found());
        assert_eq!(source.resolve_commit("abc1234").unwrap(), "abc1234");
        assert!(source.resolve_commit("zzz").is_err());
    }

    #[test]
    fn session_json_reads_back() {
        let bytes = session_json(Some(60.0), None);
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["start_time"], 60.0);
        assert!(value.get("duration").is_none());
    }
}
