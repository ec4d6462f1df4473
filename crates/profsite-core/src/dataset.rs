//! Run dataset
//!
//! One [`RunRecord`] per discovered session, filled in stage by stage:
//!
//! ```text
//! seed → apply_filename_metadata → apply_run_stats → sort_chronological → apply_html_outputs
//! ```
//!
//! Rows are keyed by their artifact path and keep the position they were
//! discovered in, which is what flattened report names are built from.
//! Row-level failures never abort a stage; they are recorded on the row.

use crate::error::{BuildError, BuildResult, RowIssue};
use crate::markdown;
use crate::stats::{self, UNKNOWN_START};
use crate::workspace::ScratchWorkspace;
use chrono::{DateTime, Utc};
use profsite_artifact::{ArtifactPath, FilenameMetadata};
use profsite_render::{render_artifact, ArtifactRenderer, RenderTarget};
use profsite_source::{ContentSource, SourceError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Everything known about one profiling session
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Location on the content source; unique within a dataset
    pub artifact_path: ArtifactPath,
    /// Position in the discovery listing
    pub discovery_index: usize,
    /// Commit token from the file name
    pub commit_sha: Option<String>,
    /// Short hash the token resolved to
    pub commit_hash_short: Option<String>,
    /// Triggering event label
    pub triggered_by: Option<String>,
    /// Run start; [`UNKNOWN_START`] when the metrics record had none
    pub start_time: Option<DateTime<Utc>>,
    /// Run duration in seconds
    pub duration_seconds: Option<f64>,
    /// Values of the declared supplementary columns, aligned by position
    pub supplementary: Vec<Option<Value>>,
    /// Rendered report location
    pub html_output_path: Option<PathBuf>,
    /// Link to the report relative to the site root
    pub link_markdown: Option<String>,
    /// Recoverable problems met while filling this row
    pub issues: Vec<RowIssue>,
}

impl RunRecord {
    fn seeded(artifact_path: ArtifactPath, discovery_index: usize, columns: usize) -> Self {
        Self {
            artifact_path,
            discovery_index,
            commit_sha: None,
            commit_hash_short: None,
            triggered_by: None,
            start_time: None,
            duration_seconds: None,
            supplementary: vec![None; columns],
            html_output_path: None,
            link_markdown: None,
            issues: Vec::new(),
        }
    }

    /// Key used by the chronological sort
    #[inline]
    #[must_use]
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.start_time.unwrap_or(UNKNOWN_START)
    }

    fn record_issue(&mut self, issue: RowIssue) {
        tracing::warn!("{}: {}", self.artifact_path, issue);
        self.issues.push(issue);
    }
}

/// Named column of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    ArtifactPath,
    StartTime,
    Duration,
    Commit,
    Sha,
    TriggeredBy,
    Html,
    Link,
    /// Declared supplementary column by position
    Supplementary(usize),
}

impl Column {
    /// Columns of the published lookup table, before supplementary ones
    pub const LOOKUP: [Column; 6] = [
        Column::StartTime,
        Column::Link,
        Column::Commit,
        Column::TriggeredBy,
        Column::Sha,
        Column::Duration,
    ];
}

/// How rendered report files are named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingPolicy {
    /// `<stem>_<discovery index>.html` directly under the reports root
    Flattened,
    /// `<source dirs>/<stem>.html`; same relative path means same file
    PreserveStructure,
}

impl NamingPolicy {
    /// Report path for `record` beneath `root`
    #[must_use]
    pub fn output_path(self, root: &Path, record: &RunRecord) -> PathBuf {
        let ext = RenderTarget::RichReport.extension();
        let stem = record.artifact_path.stem();
        match self {
            Self::Flattened => root.join(format!("{stem}_{}.{ext}", record.discovery_index)),
            Self::PreserveStructure => record
                .artifact_path
                .parent_under(root)
                .join(format!("{stem}.{ext}")),
        }
    }
}

/// Collaborators a fetch-and-render stage needs
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub source: &'a dyn ContentSource,
    pub renderer: &'a dyn ArtifactRenderer,
    pub branch: &'a str,
    pub scratch: &'a ScratchWorkspace,
}

impl StageContext<'_> {
    /// Local copy of `artifact`, fetching it on first use
    fn staged(&self, artifact: &ArtifactPath) -> Result<PathBuf, SourceError> {
        let dest = self.scratch.stage_path(artifact);
        if !dest.exists() {
            self.source.fetch_to(self.branch, artifact, &dest)?;
        }
        Ok(dest)
    }
}

/// Ordered table of run records
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    supplementary_columns: Vec<String>,
    records: Vec<RunRecord>,
    sorted: bool,
}

impl Dataset {
    /// One row per path, in listing order, every other column unset
    ///
    /// # Errors
    /// Returns `BuildError::DuplicateArtifact` if a path is listed twice
    pub fn seed(
        artifact_paths: impl IntoIterator<Item = ArtifactPath>,
        supplementary_columns: Vec<String>,
    ) -> BuildResult<Self> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for (index, path) in artifact_paths.into_iter().enumerate() {
            if !seen.insert(path.clone()) {
                return Err(BuildError::DuplicateArtifact(path));
            }
            records.push(RunRecord::seeded(path, index, supplementary_columns.len()));
        }
        tracing::info!("Seeded dataset with {} artifacts", records.len());
        Ok(Self {
            supplementary_columns,
            records,
            sorted: false,
        })
    }

    /// Rows in current order
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    #[cfg(test)]
    pub(crate) fn records_mut(&mut self) -> &mut [RunRecord] {
        &mut self.records
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Declared supplementary column names
    #[inline]
    #[must_use]
    pub fn supplementary_columns(&self) -> &[String] {
        &self.supplementary_columns
    }

    /// Row for `path`, if any
    #[must_use]
    pub fn get(&self, path: &ArtifactPath) -> Option<&RunRecord> {
        self.records.iter().find(|r| &r.artifact_path == path)
    }

    /// Whether the chronological sort has run
    #[inline]
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Fail unless sorted; `consumer` names who is asking
    ///
    /// # Errors
    /// Returns `BuildError::Unsorted` before [`Dataset::sort_chronological`]
    pub fn ensure_sorted(&self, consumer: &'static str) -> BuildResult<()> {
        if self.sorted {
            Ok(())
        } else {
            Err(BuildError::Unsorted(consumer))
        }
    }

    /// Fill commit token, short hash and trigger from each file name
    pub fn apply_filename_metadata(&mut self, source: &dyn ContentSource) {
        for record in &mut self.records {
            let meta = match FilenameMetadata::from_path(&record.artifact_path) {
                Ok(meta) => meta,
                Err(e) => {
                    record.record_issue(RowIssue::Metadata(e.to_string()));
                    continue;
                }
            };
            match source.resolve_commit(&meta.commit_sha) {
                Ok(short) => record.commit_hash_short = Some(short),
                Err(e) => record.record_issue(RowIssue::CommitResolution(e.to_string())),
            }
            record.commit_sha = Some(meta.commit_sha);
            record.triggered_by = Some(meta.triggered_by);
        }
    }

    /// Render each session's metrics record and read start time, duration
    /// and any supplementary stats into its row
    ///
    /// A supplementary stats file named `<stem><stats_suffix>` next to the
    /// session is optional; when it is missing the row's supplementary
    /// values stay unset.
    ///
    /// # Errors
    /// Returns `BuildError::Render` only for fatal render errors
    pub fn apply_run_stats(&mut self, ctx: StageContext<'_>, stats_suffix: &str) -> BuildResult<()> {
        for record in &mut self.records {
            let staged = match ctx.staged(&record.artifact_path) {
                Ok(path) => path,
                Err(e) => {
                    record.record_issue(RowIssue::Fetch(e.to_string()));
                    continue;
                }
            };

            let metrics_path = ctx.scratch.metrics_path(&record.artifact_path);
            match render_artifact(ctx.renderer, &staged, RenderTarget::MetricsRecord, &metrics_path) {
                Ok(()) => read_metrics_into(record, &metrics_path),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => record.record_issue(RowIssue::Render {
                    target: RenderTarget::MetricsRecord,
                    message: e.to_string(),
                }),
            }

            if !self.supplementary_columns.is_empty() {
                read_supplementary_into(record, &self.supplementary_columns, ctx, stats_suffix);
            }
        }
        Ok(())
    }

    /// Stable sort by start time, oldest first
    ///
    /// Must run after stats are populated and before any table or plot is
    /// produced. Running it again changes nothing.
    pub fn sort_chronological(&mut self) {
        self.records.sort_by_key(RunRecord::sort_key);
        self.sorted = true;
        tracing::debug!("Sorted {} rows by start time", self.records.len());
    }

    /// Render each session's HTML report and record its path and link
    ///
    /// `reports_root` is where reports are placed; links are written
    /// relative to `site_root`.
    ///
    /// # Errors
    /// Returns `BuildError::Render` only for fatal render errors
    pub fn apply_html_outputs(
        &mut self,
        ctx: StageContext<'_>,
        policy: NamingPolicy,
        reports_root: &Path,
        site_root: &Path,
        link_text: &str,
    ) -> BuildResult<()> {
        let mut claimed: HashMap<PathBuf, ArtifactPath> = HashMap::new();

        for record in &mut self.records {
            let output = policy.output_path(reports_root, record);
            if let Some(previous) = claimed.insert(output.clone(), record.artifact_path.clone()) {
                tracing::warn!(
                    "{} and {} both render to {}; the later report overwrites the earlier",
                    previous,
                    record.artifact_path,
                    output.display()
                );
            }

            let staged = match ctx.staged(&record.artifact_path) {
                Ok(path) => path,
                Err(e) => {
                    record.record_issue(RowIssue::Fetch(e.to_string()));
                    continue;
                }
            };

            match render_artifact(ctx.renderer, &staged, RenderTarget::RichReport, &output) {
                Ok(()) => {
                    record.link_markdown = Some(markdown::md_link(&output, site_root, link_text));
                    record.html_output_path = Some(output);
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => record.record_issue(RowIssue::Render {
                    target: RenderTarget::RichReport,
                    message: e.to_string(),
                }),
            }
        }
        Ok(())
    }

    /// Header text of `column`
    #[must_use]
    pub fn header(&self, column: Column) -> String {
        match column {
            Column::ArtifactPath => "Artifact".to_string(),
            Column::StartTime => "Start Time".to_string(),
            Column::Duration => "duration (s)".to_string(),
            Column::Commit => "Commit".to_string(),
            Column::Sha => "SHA".to_string(),
            Column::TriggeredBy => "Triggered by".to_string(),
            Column::Html => "HTML".to_string(),
            Column::Link => "Link".to_string(),
            Column::Supplementary(i) => self
                .supplementary_columns
                .get(i)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Look a column up by its header text
    #[must_use]
    pub fn column_named(&self, name: &str) -> Option<Column> {
        let fixed = [
            Column::ArtifactPath,
            Column::StartTime,
            Column::Duration,
            Column::Commit,
            Column::Sha,
            Column::TriggeredBy,
            Column::Html,
            Column::Link,
        ];
        fixed
            .into_iter()
            .chain((0..self.supplementary_columns.len()).map(Column::Supplementary))
            .find(|c| self.header(*c) == name)
    }

    /// Display text of every cell in `column`, in row order
    #[must_use]
    pub fn column(&self, column: Column) -> Vec<String> {
        self.records.iter().map(|r| cell(r, column)).collect()
    }

    /// Columns of the published lookup table
    #[must_use]
    pub fn lookup_columns(&self) -> Vec<Column> {
        Column::LOOKUP
            .into_iter()
            .chain((0..self.supplementary_columns.len()).map(Column::Supplementary))
            .collect()
    }

    /// Markdown pipe table of the given columns
    #[must_use]
    pub fn to_markdown(&self, columns: &[Column]) -> String {
        let headers: Vec<String> = columns.iter().map(|c| self.header(*c)).collect();
        let rows: Vec<Vec<String>> = self
            .records
            .iter()
            .map(|r| columns.iter().map(|c| cell(r, *c)).collect())
            .collect();
        markdown::table(&headers, &rows)
    }
}

fn cell(record: &RunRecord, column: Column) -> String {
    match column {
        Column::ArtifactPath => record.artifact_path.to_string(),
        Column::StartTime => match record.start_time {
            Some(t) if t != UNKNOWN_START => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            _ => String::new(),
        },
        Column::Duration => record
            .duration_seconds
            .map(|d| format!("{d:.3}"))
            .unwrap_or_default(),
        Column::Commit => record.commit_hash_short.clone().unwrap_or_default(),
        Column::Sha => record.commit_sha.clone().unwrap_or_default(),
        Column::TriggeredBy => record.triggered_by.clone().unwrap_or_default(),
        Column::Html => record
            .html_output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        Column::Link => record.link_markdown.clone().unwrap_or_default(),
        Column::Supplementary(i) => match record.supplementary.get(i) {
            Some(Some(Value::String(s))) => s.clone(),
            Some(Some(value)) => value.to_string(),
            _ => String::new(),
        },
    }
}

fn read_metrics_into(record: &mut RunRecord, metrics_path: &Path) {
    let bytes = match std::fs::read(metrics_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            record.record_issue(RowIssue::Stats(format!("{}: {e}", metrics_path.display())));
            return;
        }
    };
    match stats::read_metrics(&bytes) {
        Ok(metrics) => {
            record.start_time = Some(metrics.start_time);
            record.duration_seconds = metrics.duration_seconds;
            tracing::debug!(
                "{}: start {} duration {:?}",
                record.artifact_path,
                metrics.start_time,
                metrics.duration_seconds
            );
        }
        Err(e) => record.record_issue(RowIssue::Stats(e.to_string())),
    }
}

fn read_supplementary_into(
    record: &mut RunRecord,
    columns: &[String],
    ctx: StageContext<'_>,
    stats_suffix: &str,
) {
    let stats_name = format!("{}{stats_suffix}", record.artifact_path.stem());
    let stats_path = match record.artifact_path.sibling(stats_name) {
        Ok(path) => path,
        Err(e) => {
            record.record_issue(RowIssue::Stats(e.to_string()));
            return;
        }
    };

    let payload = match ctx.source.fetch(ctx.branch, &stats_path) {
        Ok(payload) => payload,
        Err(e) if e.is_not_found() => {
            tracing::info!("{}: no supplementary stats at {}", record.artifact_path, stats_path);
            return;
        }
        Err(e) => {
            record.record_issue(RowIssue::Fetch(e.to_string()));
            return;
        }
    };

    match stats::read_supplementary(&payload, columns) {
        Ok(values) => record.supplementary = values,
        Err(e) => record.record_issue(RowIssue::Stats(format!("{stats_path}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn paths(raw: &[&str]) -> Vec<ArtifactPath> {
        raw.iter().map(|p| p.parse().unwrap()).collect()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn seed_sets_only_paths() {
        let ds = Dataset::seed(paths(&["a.pyisession", "b.pyisession"]), vec!["x".into()]).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(!ds.is_sorted());
        let first = &ds.records()[0];
        assert_eq!(first.discovery_index, 0);
        assert_eq!(first.commit_sha, None);
        assert_eq!(first.start_time, None);
        assert_eq!(first.supplementary, vec![None]);
    }

    #[test]
    fn seed_rejects_duplicates() {
        let err = Dataset::seed(paths(&["a.pyisession", "a.pyisession"]), vec![]).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateArtifact(_)));
    }

    #[test]
    fn sort_orders_and_is_idempotent() {
        let mut ds = Dataset::seed(paths(&["t3", "t1", "t2"]), vec![]).unwrap();
        ds.records[0].start_time = Some(at(300));
        ds.records[1].start_time = Some(at(100));
        ds.records[2].start_time = Some(at(200));

        ds.sort_chronological();
        let order: Vec<String> = ds.column(Column::ArtifactPath);
        assert_eq!(order, vec!["t1", "t2", "t3"]);

        let snapshot = ds.clone();
        ds.sort_chronological();
        assert_eq!(ds, snapshot);
    }

    #[test]
    fn unknown_start_sorts_first_and_stably() {
        let mut ds = Dataset::seed(paths(&["late", "unknown_a", "unknown_b"]), vec![]).unwrap();
        ds.records[0].start_time = Some(at(50));
        ds.records[1].start_time = Some(UNKNOWN_START);
        ds.sort_chronological();
        assert_eq!(
            ds.column(Column::ArtifactPath),
            vec!["unknown_a", "unknown_b", "late"]
        );
    }

    #[test]
    fn ensure_sorted_guards_consumers() {
        let mut ds = Dataset::seed(paths(&["a"]), vec![]).unwrap();
        assert!(matches!(ds.ensure_sorted("plots"), Err(BuildError::Unsorted("plots"))));
        ds.sort_chronological();
        assert!(ds.ensure_sorted("plots").is_ok());
    }

    #[test]
    fn flattened_names_use_discovery_index() {
        let mut ds = Dataset::seed(
            paths(&["a/profile.pyisession", "b/profile.pyisession"]),
            vec![],
        )
        .unwrap();
        ds.records[0].start_time = Some(at(20));
        ds.records[1].start_time = Some(at(10));
        ds.sort_chronological();

        let root = Path::new("/site/reports");
        let names: Vec<PathBuf> = ds
            .records()
            .iter()
            .map(|r| NamingPolicy::Flattened.output_path(root, r))
            .collect();
        assert_eq!(
            names,
            vec![root.join("profile_1.html"), root.join("profile_0.html")]
        );
    }

    #[test]
    fn preserve_structure_mirrors_directories() {
        let ds = Dataset::seed(paths(&["nightly/linux/profile.pyisession"]), vec![]).unwrap();
        let out = NamingPolicy::PreserveStructure.output_path(Path::new("/r"), &ds.records()[0]);
        assert_eq!(out, PathBuf::from("/r/nightly/linux/profile.html"));
    }

    #[test]
    fn named_column_access() {
        let mut ds = Dataset::seed(paths(&["push_1_abc.pyisession"]), vec!["peak_mb".into()]).unwrap();
        ds.records[0].triggered_by = Some("push".into());
        ds.records[0].supplementary = vec![Some(Value::from(12.5))];

        let trig = ds.column_named("Triggered by").unwrap();
        assert_eq!(ds.column(trig), vec!["push"]);
        let peak = ds.column_named("peak_mb").unwrap();
        assert_eq!(peak, Column::Supplementary(0));
        assert_eq!(ds.column(peak), vec!["12.5"]);
        assert!(ds.column_named("nope").is_none());
    }

    #[test]
    fn markdown_blank_cells_for_unknowns() {
        let mut ds = Dataset::seed(paths(&["a"]), vec![]).unwrap();
        ds.records[0].start_time = Some(UNKNOWN_START);
        let md = ds.to_markdown(&[Column::StartTime, Column::Duration, Column::ArtifactPath]);
        assert!(md.contains("|  |  | a |"), "{md}");
    }

    mod properties {
        use super::*;
        use profsite_test_utils::{session_json, FakeRenderer, InMemoryContentSource};
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        fn unique_paths() -> impl Strategy<Value = Vec<ArtifactPath>> {
            proptest::collection::btree_set("[a-z]{1,6}(/[a-z]{1,6}){0,2}", 0..24).prop_map(|set| {
                set.into_iter()
                    .map(|p| format!("{p}.pyisession").parse().unwrap())
                    .collect()
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn stages_preserve_rows(
                paths in unique_paths(),
                starts in proptest::collection::vec(proptest::option::of(0i64..10_000), 24),
                flatten in any::<bool>(),
            ) {
                let dir = tempfile::tempdir().unwrap();
                let site = dir.path().join("build");
                let mut source = InMemoryContentSource::new(dir.path()).with_branch("results");
                for (path, start) in paths.iter().zip(&starts) {
                    // Paths without a start get no session, so their fetch fails
                    if let Some(start) = start {
                        source = source.with_file(
                            "results",
                            &path.to_string(),
                            session_json(Some(*start as f64), Some(1.0)),
                        );
                    }
                }
                let renderer = FakeRenderer::new();
                let scratch = ScratchWorkspace::create_at(&site, at(0)).unwrap();
                let ctx = StageContext {
                    source: &source,
                    renderer: &renderer,
                    branch: "results",
                    scratch: &scratch,
                };
                let policy = if flatten {
                    NamingPolicy::Flattened
                } else {
                    NamingPolicy::PreserveStructure
                };

                let mut ds = Dataset::seed(paths.clone(), vec![]).unwrap();
                ds.apply_filename_metadata(&source);
                ds.apply_run_stats(ctx, ".stats.json").unwrap();
                ds.sort_chronological();
                ds.apply_html_outputs(ctx, policy, &site.join("reports"), &site, "Profiling results")
                    .unwrap();
                scratch.remove().unwrap();

                prop_assert_eq!(ds.len(), paths.len());
                prop_assert!(ds.is_sorted());
                let keyed: BTreeMap<_, _> = ds
                    .records()
                    .iter()
                    .map(|r| (r.artifact_path.clone(), r.discovery_index))
                    .collect();
                prop_assert_eq!(keyed.len(), paths.len());
                for (index, path) in paths.iter().enumerate() {
                    prop_assert_eq!(keyed[path], index);
                }

                for record in ds.records() {
                    let start = starts[record.discovery_index];
                    prop_assert_eq!(record.link_markdown.is_some(), start.is_some());
                    if let Some(start) = start {
                        prop_assert_eq!(record.start_time, Some(at(start)));
                        prop_assert_eq!(record.duration_seconds, Some(1.0));
                        prop_assert!(record.html_output_path.as_ref().is_some_and(|p| p.is_file()));
                    } else {
                        prop_assert!(record.issues.iter().any(|i| matches!(i, RowIssue::Fetch(_))));
                    }
                }
            }
        }

        proptest! {
            #[test]
            fn sort_is_ordered_stable_and_idempotent(
                starts in proptest::collection::vec(proptest::option::of(0i64..50), 0..24),
            ) {
                let paths: Vec<ArtifactPath> =
                    (0..starts.len()).map(|i| format!("run{i}").parse().unwrap()).collect();
                let mut ds = Dataset::seed(paths, vec![]).unwrap();
                for (record, start) in ds.records_mut().iter_mut().zip(&starts) {
                    record.start_time = start.map(at);
                }
                ds.sort_chronological();

                for pair in ds.records().windows(2) {
                    prop_assert!(pair[0].sort_key() <= pair[1].sort_key());
                    if pair[0].sort_key() == pair[1].sort_key() {
                        prop_assert!(pair[0].discovery_index < pair[1].discovery_index);
                    }
                }
                let once = ds.clone();
                ds.sort_chronological();
                prop_assert_eq!(ds, once);
            }
        }
    }
}
