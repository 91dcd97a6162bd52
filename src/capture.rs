//! Per-chart capture: raster, validate, fall back to SVG, trim, encode.

use crate::rendering::raster::capture_raster;
use crate::rendering::trim::trim_and_encode;
use crate::rendering::validate::has_content;
use crate::rendering::vector::VectorRenderer;
use crate::rendering::RasterImage;
use crate::surface::RenderSurface;
use crate::{CaptureConfig, CapturedChart, ChartHandle, Result, Size};
use log::{debug, warn};

/// Captures individual charts with a fixed fallback/skip policy.
///
/// A chart whose raster has no visible content is re-rendered from its SVG
/// markup. If that is not possible, or anything along the way fails, the
/// chart is skipped and `capture` returns `None`.
pub struct ChartCapturer {
    min_capture: Size,
    background: [u8; 4],
    jpeg_quality: u8,
    vector: VectorRenderer,
}

impl ChartCapturer {
    pub fn new(config: &CaptureConfig) -> Self {
        Self::with_vector_renderer(config, VectorRenderer::new())
    }

    pub fn with_vector_renderer(config: &CaptureConfig, vector: VectorRenderer) -> Self {
        Self {
            min_capture: config.min_capture,
            background: config.background,
            jpeg_quality: config.jpeg_quality,
            vector,
        }
    }

    /// Capture one chart, or `None` if it has to be skipped.
    pub fn capture<S: RenderSurface + ?Sized>(&self, surface: &mut S, chart: &ChartHandle) -> Option<CapturedChart> {
        match self.try_capture(surface, chart) {
            Ok(Some(image)) => Some(CapturedChart {
                category: chart.category,
                chart_id: chart.chart_id.clone(),
                image,
            }),
            Ok(None) => {
                warn!("Skipping chart {}: blank raster and no usable vector fallback", chart);
                None
            }
            Err(e) => {
                warn!("Skipping chart {}: {}", chart, e);
                None
            }
        }
    }

    fn try_capture<S: RenderSurface + ?Sized>(&self, surface: &mut S, chart: &ChartHandle) -> Result<Option<String>> {
        let raster = capture_raster(surface, chart, self.min_capture, self.background)?;

        let validated = if has_content(&raster) {
            raster
        } else {
            debug!("Raster of chart {} is blank, trying vector fallback", chart);
            match self.vector_fallback(surface, chart, raster.size()) {
                Some(img) => img,
                None => return Ok(None),
            }
        };

        trim_and_encode(&validated, self.jpeg_quality).map(Some)
    }

    /// Re-render the chart's SVG at `size`. Missing or undecodable markup
    /// yields `None`.
    fn vector_fallback<S: RenderSurface + ?Sized>(
        &self,
        surface: &S,
        chart: &ChartHandle,
        size: Size,
    ) -> Option<RasterImage> {
        let markup = match surface.vector_markup(chart) {
            Ok(Some(markup)) => markup,
            Ok(None) => {
                debug!("Chart {} has no SVG representation", chart);
                return None;
            }
            Err(e) => {
                warn!("Failed to read SVG of chart {}: {}", chart, e);
                return None;
            }
        };
        match self.vector.render(&markup, size) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("Vector fallback for chart {} failed: {}", chart, e);
                None
            }
        }
    }
}
