//! profsite Render Adapters
//!
//! Thin adapters around the two external collaborators of a site build:
//!
//! - [`ArtifactRenderer`]: stored session → HTML report or JSON metrics record
//! - [`ChartRenderer`]: time series → image
//!
//! Neither adapter knows anything about the profiling format itself.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod chart;
pub mod error;
mod renderer;

pub use chart::{ChartRenderer, LineChart, SvgChartRenderer};
pub use error::{ChartError, RenderError};
pub use renderer::{render_artifact, ArtifactRenderer, CommandRenderer, RenderTarget};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
