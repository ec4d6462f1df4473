//! Time-series charts
//!
//! The site only needs simple line charts of one value over time, written
//! as standalone SVG so they embed directly in markdown pages.

use crate::error::ChartError;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;

/// A single-series line chart over time
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    /// Chart title
    pub title: String,
    /// X axis label
    pub x_label: String,
    /// Y axis label
    pub y_label: String,
    /// Points in the order they are drawn
    pub points: Vec<(DateTime<Utc>, f64)>,
}

impl LineChart {
    /// Create chart with no points
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            points: Vec::new(),
        }
    }

    /// With data points
    #[inline]
    #[must_use]
    pub fn with_points(mut self, points: Vec<(DateTime<Utc>, f64)>) -> Self {
        self.points = points;
        self
    }
}

/// Writes charts to image files
pub trait ChartRenderer {
    /// File extension of produced images
    fn extension(&self) -> &'static str;

    /// Render `chart` to `output`, creating parent directories
    ///
    /// # Errors
    /// Returns `ChartError::Io` if the image cannot be written
    fn render_line_chart(&self, chart: &LineChart, output: &Path) -> Result<(), ChartError>;
}

/// SVG line chart writer
#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    width: u32,
    height: u32,
}

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;

impl SvgChartRenderer {
    /// Create renderer producing images of the given size in pixels
    #[inline]
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Build the SVG document text
    ///
    /// # Errors
    /// Only fails if string formatting fails
    pub fn to_svg(&self, chart: &LineChart) -> Result<String, std::fmt::Error> {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        let plot_w = w - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = h - MARGIN_TOP - MARGIN_BOTTOM;
        let x0 = MARGIN_LEFT;
        let y0 = MARGIN_TOP + plot_h;

        let mut svg = String::new();
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            self.width, self.height, self.width, self.height
        )?;
        writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="18" text-anchor="middle" font-family="sans-serif">{}</text>"#,
            w / 2.0,
            MARGIN_TOP / 2.0 + 6.0,
            escape(&chart.title)
        )?;
        writeln!(
            svg,
            r#"<line x1="{x0:.1}" y1="{y0:.1}" x2="{:.1}" y2="{y0:.1}" stroke="black"/>"#,
            x0 + plot_w
        )?;
        writeln!(
            svg,
            r#"<line x1="{x0:.1}" y1="{y0:.1}" x2="{x0:.1}" y2="{MARGIN_TOP:.1}" stroke="black"/>"#
        )?;
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="14" text-anchor="middle" font-family="sans-serif">{}</text>"#,
            x0 + plot_w / 2.0,
            h - 15.0,
            escape(&chart.x_label)
        )?;
        writeln!(
            svg,
            r#"<text x="20" y="{:.1}" font-size="14" text-anchor="middle" font-family="sans-serif" transform="rotate(-90 20 {:.1})">{}</text>"#,
            MARGIN_TOP + plot_h / 2.0,
            MARGIN_TOP + plot_h / 2.0,
            escape(&chart.y_label)
        )?;

        if chart.points.is_empty() {
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="14" text-anchor="middle" font-family="sans-serif" fill="gray">no data</text>"#,
                x0 + plot_w / 2.0,
                MARGIN_TOP + plot_h / 2.0
            )?;
            svg.push_str("</svg>\n");
            return Ok(svg);
        }

        let (t_min, t_max) = bounds(chart.points.iter().map(|(t, _)| t.timestamp() as f64));
        let (lo, v_max) = bounds(chart.points.iter().map(|(_, v)| *v));
        // Y axis starts at zero unless values are negative
        let v_min = lo.min(0.0);
        let t_span = if t_max > t_min { t_max - t_min } else { 1.0 };
        let v_span = if v_max > v_min { v_max - v_min } else { 1.0 };

        let project = |t: &DateTime<Utc>, v: f64| {
            let x = if t_max > t_min {
                x0 + (t.timestamp() as f64 - t_min) / t_span * plot_w
            } else {
                x0 + plot_w / 2.0
            };
            let y = y0 - (v - v_min) / v_span * plot_h;
            (x, y)
        };

        let mut polyline = String::new();
        for (t, v) in &chart.points {
            let (x, y) = project(t, *v);
            write!(polyline, "{x:.1},{y:.1} ")?;
        }
        writeln!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="steelblue" stroke-width="2"/>"#,
            polyline.trim_end()
        )?;
        for (t, v) in &chart.points {
            let (x, y) = project(t, *v);
            writeln!(
                svg,
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="3" fill="steelblue"><title>{}: {v}</title></circle>"#,
                t.format("%Y-%m-%d %H:%M")
            )?;
        }

        // Axis extremes
        let first = chart.points.iter().map(|(t, _)| *t).min();
        let last = chart.points.iter().map(|(t, _)| *t).max();
        if let (Some(first), Some(last)) = (first, last) {
            writeln!(
                svg,
                r#"<text x="{x0:.1}" y="{:.1}" font-size="11" text-anchor="start" font-family="sans-serif">{}</text>"#,
                y0 + 18.0,
                first.format("%Y-%m-%d")
            )?;
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end" font-family="sans-serif">{}</text>"#,
                x0 + plot_w,
                y0 + 18.0,
                last.format("%Y-%m-%d")
            )?;
        }
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end" font-family="sans-serif">{v_min}</text>"#,
            x0 - 6.0,
            y0 + 4.0
        )?;
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end" font-family="sans-serif">{v_max:.2}</text>"#,
            x0 - 6.0,
            MARGIN_TOP + 4.0
        )?;

        svg.push_str("</svg>\n");
        Ok(svg)
    }
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self::new(960, 720)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn render_line_chart(&self, chart: &LineChart, output: &Path) -> Result<(), ChartError> {
        let svg = self.to_svg(chart)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ChartError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(output, svg).map_err(|source| ChartError::Io {
            path: output.to_path_buf(),
            source,
        })
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
