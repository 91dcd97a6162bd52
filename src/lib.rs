//! Report chart capture and export
//!
//! Drives a report page through every report category, captures each chart
//! widget into a cropped raster image and assembles the per-category metrics
//! and images into a single bundle for a file generator.
//!
//! # Features
//!
//! - **Blank-safe capture**: rasters with no visible content are re-rendered
//!   from the chart's SVG markup before being given up on
//! - **Content trimming**: every image is cropped to its padded content box
//! - **Swappable backends**: the rendering layer, metrics source, file
//!   generator and notification surface are all traits
//!
//! # Example
//!
//! ```no_run
//! use report_capture::{export::{Exporter, ExportFormat, JsonFileGenerator},
//!     metrics::JsonDirMetrics, notify::LogNotifier, CaptureConfig, SceneSurface};
//!
//! # async fn run() -> report_capture::Result<()> {
//! let mut surface = SceneSurface::from_json(&std::fs::read_to_string("scene.json")?)?;
//! let metrics = JsonDirMetrics::new("metrics");
//! let exporter = Exporter::new(CaptureConfig::default())?;
//! let bytes = exporter
//!     .run(&mut surface, &metrics, &JsonFileGenerator, &LogNotifier, ExportFormat::Json)
//!     .await?;
//! std::fs::write("report.json", bytes)?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod capture;
pub mod cycle;
pub mod export;
pub mod metrics;
pub mod notify;
pub mod rendering;
pub mod surface;

// CDP backend: captures charts from a live report page in headless Chrome
#[cfg(feature = "cdp")]
pub mod cdp;

pub use capture::ChartCapturer;
pub use cycle::{ActiveCategoryGuard, ReportCycle};
pub use export::{CategoryReport, ReportBundle};
pub use rendering::RasterImage;
pub use surface::{RenderSurface, SceneSurface};

/// One of the fixed report kinds, each with its own metrics and chart set.
///
/// The derived ordering follows declaration order, which is also the order an
/// export run visits categories in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportCategory {
    Inventory,
    Warranty,
    Utilization,
    Maintenance,
    Activity,
}

impl ReportCategory {
    /// Every category in visitation order
    pub const ALL: [ReportCategory; 5] = [
        ReportCategory::Inventory,
        ReportCategory::Warranty,
        ReportCategory::Utilization,
        ReportCategory::Maintenance,
        ReportCategory::Activity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCategory::Inventory => "inventory",
            ReportCategory::Warranty => "warranty",
            ReportCategory::Utilization => "utilization",
            ReportCategory::Maintenance => "maintenance",
            ReportCategory::Activity => "activity",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ReportCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::ConfigError(format!("Unknown report category: {}", s)))
    }
}

/// Reference to one rendered chart widget
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartHandle {
    pub category: ReportCategory,
    pub chart_id: String,
}

impl ChartHandle {
    pub fn new(category: ReportCategory, chart_id: impl Into<String>) -> Self {
        Self {
            category,
            chart_id: chart_id.into(),
        }
    }
}

impl fmt::Display for ChartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.chart_id)
    }
}

/// The terminal artifact of one successful chart capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedChart {
    pub category: ReportCategory,
    pub chart_id: String,
    /// `data:image/jpeg;base64,...` encoded, trimmed raster
    pub image: String,
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Configuration for an export run
///
/// The defaults mirror what the report page needs in practice:
/// - categories are visited in `ReportCategory::ALL` order
/// - captures are never smaller than 400x300
/// - each category gets 3s to re-render and each chart 1s to animate in
/// - images are encoded as JPEG at quality 92 over a white background
///
/// # Examples
///
/// ```
/// let cfg = report_capture::CaptureConfig::default();
/// assert_eq!(cfg.categories.len(), 5);
/// assert_eq!(cfg.min_capture.width, 400);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Categories to visit, in order
    pub categories: Vec<ReportCategory>,
    /// Floor applied to the chart's layout size before capture
    pub min_capture: Size,
    /// Settlement delay after switching category, in milliseconds
    pub category_settle_ms: u64,
    /// Settlement delay before each chart capture, in milliseconds
    pub chart_settle_ms: u64,
    /// JPEG quality (1-100) for the final encoded images
    pub jpeg_quality: u8,
    /// Solid RGBA fill placed behind every capture
    pub background: [u8; 4],
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            categories: ReportCategory::ALL.to_vec(),
            min_capture: Size::new(400, 300),
            category_settle_ms: 3000,
            chart_settle_ms: 1000,
            jpeg_quality: 92,
            background: [255, 255, 255, 255],
        }
    }
}

impl CaptureConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: CaptureConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::ConfigError("at least one category is required".into()));
        }
        for (i, c) in self.categories.iter().enumerate() {
            if self.categories[..i].contains(c) {
                return Err(Error::ConfigError(format!("category {} listed twice", c)));
            }
        }
        if self.min_capture.width == 0 || self.min_capture.height == 0 {
            return Err(Error::ConfigError("min_capture must be non-zero".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::ConfigError(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    pub fn category_settle(&self) -> Duration {
        Duration::from_millis(self.category_settle_ms)
    }

    pub fn chart_settle(&self) -> Duration {
        Duration::from_millis(self.chart_settle_ms)
    }
}
