//! Session renderer adapter
//!
//! Profiling sessions are stored in a tool-specific format that this crate
//! never parses. An [`ArtifactRenderer`] turns one session file into either
//! a browsable report or a small JSON metrics record.

use crate::error::RenderError;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::process::Command;

/// Output shapes a session can be rendered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderTarget {
    /// Interactive HTML report
    RichReport,
    /// JSON record with `start_time` and `duration`
    MetricsRecord,
}

impl RenderTarget {
    /// File extension of rendered output
    #[inline]
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::RichReport => "html",
            Self::MetricsRecord => "json",
        }
    }
}

impl Display for RenderTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RichReport => write!(f, "rich-report"),
            Self::MetricsRecord => write!(f, "metrics-record"),
        }
    }
}

/// Converts a stored session into a target representation
pub trait ArtifactRenderer {
    /// Whether this renderer can produce `target`
    fn supports(&self, target: RenderTarget) -> bool;

    /// Render `input` to `output`; the parent of `output` already exists
    ///
    /// # Errors
    /// Returns `RenderError::Failed` if the session cannot be rendered
    fn render(&self, input: &Path, target: RenderTarget, output: &Path) -> Result<(), RenderError>;
}

/// Render one session, creating the destination directory first
///
/// # Errors
/// - `RenderError::UnsupportedTarget` if the renderer cannot produce `target`
/// - `RenderError::Io` if the destination directory cannot be created
/// - any error from the renderer itself
pub fn render_artifact(
    renderer: &dyn ArtifactRenderer,
    input: &Path,
    target: RenderTarget,
    output: &Path,
) -> Result<(), RenderError> {
    if !renderer.supports(target) {
        return Err(RenderError::UnsupportedTarget(target.to_string()));
    }
    if let Some(parent) = output.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| RenderError::io_error(parent, e))?;
        }
    }
    tracing::debug!("Rendering {} as {}", input.display(), target);
    renderer.render(input, target, output)?;
    tracing::info!("Wrote {}", output.display());
    Ok(())
}

/// Renderer backed by an external command line tool
///
/// Invoked as `<program> --load <input> -r <name> -o <output>`, where
/// `<name>` is the tool's own renderer name for the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRenderer {
    program: String,
    targets: BTreeMap<RenderTarget, String>,
}

impl CommandRenderer {
    /// Create renderer for `program` with no targets
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            targets: BTreeMap::new(),
        }
    }

    /// The `pyinstrument` command line with its `html` and `json` renderers
    #[must_use]
    pub fn pyinstrument() -> Self {
        Self::new("pyinstrument")
            .with_target(RenderTarget::RichReport, "html")
            .with_target(RenderTarget::MetricsRecord, "json")
    }

    /// Map a target to the tool's renderer name
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: RenderTarget, name: impl Into<String>) -> Self {
        self.targets.insert(target, name.into());
        self
    }

    /// Program being invoked
    #[inline]
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::pyinstrument()
    }
}

impl ArtifactRenderer for CommandRenderer {
    fn supports(&self, target: RenderTarget) -> bool {
        self.targets.contains_key(&target)
    }

    fn render(&self, input: &Path, target: RenderTarget, output: &Path) -> Result<(), RenderError> {
        let name = self
            .targets
            .get(&target)
            .ok_or_else(|| RenderError::UnsupportedTarget(target.to_string()))?;

        let out = Command::new(&self.program)
            .arg("--load")
            .arg(input)
            .arg("-r")
            .arg(name)
            .arg("-o")
            .arg(output)
            .output()
            .map_err(|e| RenderError::Failed {
                input: input.to_path_buf(),
                message: format!("cannot run {}: {e}", self.program),
            })?;

        if out.status.success() {
            Ok(())
        } else {
            Err(RenderError::Failed {
                input: input.to_path_buf(),
                message: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            })
        }
    }
}
