//! Bundle assembly and the export run
//!
//! `Exporter::run` is the whole pipeline: fetch metrics for every category,
//! cycle through the categories capturing charts, merge both into a
//! `ReportBundle` and hand it to a `FileGenerator`. Only a generator failure
//! fails the run.

use crate::capture::ChartCapturer;
use crate::cycle::{CategoryImages, ReportCycle};
use crate::metrics::{fetch_all, CategoryMetrics, MetricsSource};
use crate::notify::{ExportEvent, Notifier, Phase};
use crate::surface::RenderSurface;
use crate::{CaptureConfig, CapturedChart, Error, ReportCategory, Result};
use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// User-selected output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Pdf,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Everything exported for one category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    /// Externally fetched metrics; `None` if the fetch failed
    pub metrics: Option<Value>,
    pub images: Vec<CapturedChart>,
}

/// Per-category metrics and images of one export run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportBundle {
    pub categories: IndexMap<ReportCategory, CategoryReport>,
}

impl ReportBundle {
    pub fn get(&self, category: ReportCategory) -> Option<&CategoryReport> {
        self.categories.get(&category)
    }

    pub fn image_count(&self) -> usize {
        self.categories.values().map(|r| r.images.len()).sum()
    }
}

/// Merge metrics and images into a bundle with one entry per category in
/// `categories`, in that order. Missing images become an empty list.
pub fn assemble(
    categories: &[ReportCategory],
    mut metrics: CategoryMetrics,
    mut images: CategoryImages,
) -> ReportBundle {
    let categories = categories
        .iter()
        .map(|&c| {
            let report = CategoryReport {
                metrics: metrics.swap_remove(&c).flatten(),
                images: images.swap_remove(&c).unwrap_or_default(),
            };
            (c, report)
        })
        .collect();
    ReportBundle { categories }
}

/// Produces the downloadable artifact from a finished bundle
pub trait FileGenerator {
    fn generate(&self, bundle: ReportBundle, format: ExportFormat) -> Result<Vec<u8>>;
}

/// Writes the bundle as pretty-printed JSON
pub struct JsonFileGenerator;

impl FileGenerator for JsonFileGenerator {
    fn generate(&self, bundle: ReportBundle, format: ExportFormat) -> Result<Vec<u8>> {
        if format != ExportFormat::Json {
            return Err(Error::UnsupportedFormat(format.to_string()));
        }
        Ok(serde_json::to_vec_pretty(&bundle)?)
    }
}

/// Runs complete exports with one configuration
pub struct Exporter {
    config: CaptureConfig,
    capturer: ChartCapturer,
}

impl Exporter {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        config.validate()?;
        let capturer = ChartCapturer::new(&config);
        Ok(Self { config, capturer })
    }

    /// Fetch metrics, capture every category and assemble the bundle.
    pub async fn collect<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        metrics: &dyn MetricsSource,
        notifier: &dyn Notifier,
    ) -> ReportBundle {
        notifier.notify(&ExportEvent::Progress(Phase::FetchingMetrics));
        let fetched = fetch_all(metrics, &self.config.categories).await;

        let images = ReportCycle::new(&self.config, &self.capturer, notifier)
            .run(surface)
            .await;

        let bundle = assemble(&self.config.categories, fetched, images);
        info!(
            "Assembled bundle: {} categories, {} images",
            bundle.categories.len(),
            bundle.image_count()
        );
        bundle
    }

    /// Full export run. Exactly one terminal notification is emitted.
    pub async fn run<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        metrics: &dyn MetricsSource,
        generator: &dyn FileGenerator,
        notifier: &dyn Notifier,
        format: ExportFormat,
    ) -> Result<Vec<u8>> {
        notifier.notify(&ExportEvent::Started { format });
        let bundle = self.collect(surface, metrics, notifier).await;

        notifier.notify(&ExportEvent::Progress(Phase::Generating));
        match generator.generate(bundle, format) {
            Ok(bytes) => {
                notifier.notify(&ExportEvent::Succeeded { format });
                Ok(bytes)
            }
            Err(e) => {
                notifier.notify(&ExportEvent::Failed { reason: e.to_string() });
                Err(e)
            }
        }
    }
}
