//! The chart rendering layer seam
//!
//! `RenderSurface` is everything the pipeline needs from whatever owns the
//! charts: switching the active report category, enumerating the charts
//! tagged under it, pinning their size and rasterizing them. `SceneSurface`
//! is a deterministic in-process implementation driven by paint commands.

use crate::rendering::layout::{Rect, SizeStyle};
use crate::rendering::paint::{paint, PaintCommand};
use crate::rendering::RasterImage;
use crate::{ChartHandle, Error, ReportCategory, Result, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::watch;

/// Core trait for chart rendering layers
pub trait RenderSurface {
    /// Category currently shown, if any
    fn active_category(&self) -> Option<ReportCategory>;

    /// Switch the shown category. Charts re-render asynchronously.
    fn set_active_category(&mut self, category: Option<ReportCategory>) -> Result<()>;

    /// Charts currently rendered for `category`, in document order
    fn charts(&self, category: ReportCategory) -> Result<Vec<ChartHandle>>;

    /// Current layout box of a chart element
    fn layout_box(&self, chart: &ChartHandle) -> Result<Rect>;

    /// Inline width/height styling currently applied to a chart element
    fn size_style(&self, chart: &ChartHandle) -> Result<SizeStyle>;

    /// Replace the inline width/height styling of a chart element
    fn apply_size_style(&mut self, chart: &ChartHandle, style: &SizeStyle) -> Result<()>;

    /// Force a synchronous layout pass so pending style changes take effect
    fn force_layout(&mut self, chart: &ChartHandle) -> Result<()>;

    /// Rasterize a chart element at `size` over a `background` fill.
    fn rasterize(&mut self, chart: &ChartHandle, size: Size, background: [u8; 4]) -> Result<RasterImage>;

    /// Serialized SVG embedded in the chart's subtree, if it has one
    fn vector_markup(&self, chart: &ChartHandle) -> Result<Option<String>>;

    /// Render-complete notifications: the receiver's value is the category
    /// whose charts finished rendering most recently. Layers without such a
    /// signal return `None` and callers fall back to timed waits.
    fn render_signal(&self) -> Option<watch::Receiver<Option<ReportCategory>>> {
        None
    }
}

/// One chart in an in-process scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneChart {
    pub category: ReportCategory,
    pub id: String,
    #[serde(default = "SceneChart::default_layout")]
    pub layout: Rect,
    /// Commands drawn on a transparent surface at capture time
    #[serde(default)]
    pub paint: Vec<PaintCommand>,
    #[serde(default)]
    pub svg: Option<String>,
    /// Make rasterization of this chart fail
    #[serde(default)]
    pub fail: bool,
}

impl SceneChart {
    fn default_layout() -> Rect {
        Rect::new(0.0, 0.0, 640.0, 360.0)
    }

    pub fn new(category: ReportCategory, id: impl Into<String>) -> Self {
        Self {
            category,
            id: id.into(),
            layout: Self::default_layout(),
            paint: Vec::new(),
            svg: None,
            fail: false,
        }
    }

    pub fn with_paint(mut self, paint: Vec<PaintCommand>) -> Self {
        self.paint = paint;
        self
    }

    pub fn with_svg(mut self, svg: impl Into<String>) -> Self {
        self.svg = Some(svg.into());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

/// Serialized form of a scene file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub active: Option<ReportCategory>,
    #[serde(default)]
    pub charts: Vec<SceneChart>,
}

/// A record of one rasterization, kept for inspection
#[derive(Debug, Clone, PartialEq)]
pub struct RasterRecord {
    pub chart: ChartHandle,
    pub size: Size,
    /// Styling in effect while the raster was taken
    pub style: SizeStyle,
}

/// Deterministic rendering layer that renders charts from paint commands.
///
/// Only the charts of the active category are considered rendered, like a
/// report page that swaps its chart panel when the category changes.
pub struct SceneSurface {
    active: Option<ReportCategory>,
    charts: Vec<SceneChart>,
    styles: HashMap<ChartHandle, SizeStyle>,
    history: Vec<Option<ReportCategory>>,
    rasters: Vec<RasterRecord>,
    signal: Option<watch::Sender<Option<ReportCategory>>>,
}

impl SceneSurface {
    pub fn new(scene: Scene) -> Self {
        Self {
            active: scene.active,
            charts: scene.charts,
            styles: HashMap::new(),
            history: Vec::new(),
            rasters: Vec::new(),
            signal: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(json)?;
        Ok(Self::new(scene))
    }

    /// Publish a render-complete signal whenever the category changes.
    pub fn with_render_signal(mut self) -> Self {
        let (tx, _rx) = watch::channel(self.active);
        self.signal = Some(tx);
        self
    }

    /// Every value passed to `set_active_category`, in order
    pub fn history(&self) -> &[Option<ReportCategory>] {
        &self.history
    }

    pub fn rasters(&self) -> &[RasterRecord] {
        &self.rasters
    }

    fn chart(&self, handle: &ChartHandle) -> Result<&SceneChart> {
        if self.active != Some(handle.category) {
            return Err(Error::RenderError(format!("chart {} is not rendered", handle)));
        }
        self.charts
            .iter()
            .find(|c| c.category == handle.category && c.id == handle.chart_id)
            .ok_or_else(|| Error::RenderError(format!("no chart {}", handle)))
    }
}

impl RenderSurface for SceneSurface {
    fn active_category(&self) -> Option<ReportCategory> {
        self.active
    }

    fn set_active_category(&mut self, category: Option<ReportCategory>) -> Result<()> {
        self.active = category;
        self.history.push(category);
        if let Some(tx) = &self.signal {
            tx.send_replace(category);
        }
        Ok(())
    }

    fn charts(&self, category: ReportCategory) -> Result<Vec<ChartHandle>> {
        if self.active != Some(category) {
            return Ok(Vec::new());
        }
        Ok(self
            .charts
            .iter()
            .filter(|c| c.category == category)
            .map(|c| ChartHandle::new(c.category, c.id.clone()))
            .collect())
    }

    fn layout_box(&self, chart: &ChartHandle) -> Result<Rect> {
        Ok(self.chart(chart)?.layout)
    }

    fn size_style(&self, chart: &ChartHandle) -> Result<SizeStyle> {
        self.chart(chart)?;
        Ok(self.styles.get(chart).cloned().unwrap_or_default())
    }

    fn apply_size_style(&mut self, chart: &ChartHandle, style: &SizeStyle) -> Result<()> {
        self.chart(chart)?;
        if *style == SizeStyle::default() {
            self.styles.remove(chart);
        } else {
            self.styles.insert(chart.clone(), style.clone());
        }
        Ok(())
    }

    fn force_layout(&mut self, chart: &ChartHandle) -> Result<()> {
        self.chart(chart).map(|_| ())
    }

    fn rasterize(&mut self, chart: &ChartHandle, size: Size, background: [u8; 4]) -> Result<RasterImage> {
        let scene = self.chart(chart)?;
        if scene.fail {
            return Err(Error::RenderError(format!("rasterizing {} failed", chart)));
        }
        // The charting layer paints onto its own transparent canvas; the
        // background only shows through where nothing was drawn.
        let raster = paint(&scene.paint, size).flatten_onto(background, size);
        let style = self.styles.get(chart).cloned().unwrap_or_default();
        self.rasters.push(RasterRecord { chart: chart.clone(), size, style });
        Ok(raster)
    }

    fn vector_markup(&self, chart: &ChartHandle) -> Result<Option<String>> {
        Ok(self.chart(chart)?.svg.clone())
    }

    fn render_signal(&self) -> Option<watch::Receiver<Option<ReportCategory>>> {
        self.signal.as_ref().map(|tx| tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> SceneSurface {
        SceneSurface::new(Scene {
            active: Some(ReportCategory::Inventory),
            charts: vec![
                SceneChart::new(ReportCategory::Inventory, "racks"),
                SceneChart::new(ReportCategory::Warranty, "expiring"),
                SceneChart::new(ReportCategory::Inventory, "devices"),
            ],
        })
    }

    #[test]
    fn only_active_category_is_rendered() {
        let mut s = surface();
        let ids: Vec<_> = s
            .charts(ReportCategory::Inventory)
            .unwrap()
            .into_iter()
            .map(|h| h.chart_id)
            .collect();
        assert_eq!(ids, vec!["racks", "devices"]);
        assert!(s.charts(ReportCategory::Warranty).unwrap().is_empty());

        s.set_active_category(Some(ReportCategory::Warranty)).unwrap();
        assert_eq!(s.charts(ReportCategory::Warranty).unwrap().len(), 1);
        let stale = ChartHandle::new(ReportCategory::Inventory, "racks");
        assert!(s.layout_box(&stale).is_err());
    }

    #[test]
    fn default_style_clears_entry() {
        let mut s = surface();
        let h = ChartHandle::new(ReportCategory::Inventory, "racks");
        s.apply_size_style(&h, &SizeStyle::pinned(Size::new(400, 300))).unwrap();
        assert_eq!(s.size_style(&h).unwrap().width.as_deref(), Some("400px"));
        s.apply_size_style(&h, &SizeStyle::default()).unwrap();
        assert_eq!(s.size_style(&h).unwrap(), SizeStyle::default());
    }

    #[test]
    fn scene_from_json() {
        let json = r#"{
            "active": "warranty",
            "charts": [
                {"category": "warranty", "id": "by-vendor",
                 "paint": [{"op": "fill", "rgba": [10, 120, 60, 255]}]}
            ]
        }"#;
        let mut s = SceneSurface::from_json(json).expect("scene");
        let h = ChartHandle::new(ReportCategory::Warranty, "by-vendor");
        assert_eq!(s.layout_box(&h).unwrap().width, 640.0);
        let r = s.rasterize(&h, Size::new(4, 4), [255, 255, 255, 255]).unwrap();
        assert_eq!(r.pixel(0, 0), [10, 120, 60, 255]);
    }

    #[test]
    fn render_signal_follows_active_category() {
        let mut s = surface().with_render_signal();
        let rx = s.render_signal().expect("signal");
        s.set_active_category(Some(ReportCategory::Activity)).unwrap();
        assert_eq!(*rx.borrow(), Some(ReportCategory::Activity));
    }
}
