//! Raster capture of a single chart element
//!
//! The element is pinned to explicit pixel dimensions for the duration of the
//! capture so the output does not depend on the current page layout. The
//! original sizing is put back by `PinnedSize` when it drops, on every path.

use crate::rendering::layout::{capture_size, SizeStyle, MAX_CAPTURE_SIDE};
use crate::rendering::RasterImage;
use crate::surface::RenderSurface;
use crate::{ChartHandle, Error, Result, Size};
use log::{debug, warn};
use std::ops::{Deref, DerefMut};

/// Scoped size pin on a chart element. Derefs to the surface.
pub struct PinnedSize<'a, S: RenderSurface + ?Sized> {
    surface: &'a mut S,
    chart: &'a ChartHandle,
    previous: Option<SizeStyle>,
}

impl<'a, S: RenderSurface + ?Sized> PinnedSize<'a, S> {
    pub fn pin(surface: &'a mut S, chart: &'a ChartHandle, size: Size) -> Result<Self> {
        let previous = surface.size_style(chart)?;
        surface.apply_size_style(chart, &SizeStyle::pinned(size))?;
        Ok(Self {
            surface,
            chart,
            previous: Some(previous),
        })
    }
}

impl<S: RenderSurface + ?Sized> Deref for PinnedSize<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> DerefMut for PinnedSize<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> Drop for PinnedSize<'_, S> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = self.surface.apply_size_style(self.chart, &previous) {
                warn!("Failed to restore size of chart {}: {}", self.chart, e);
            }
        }
    }
}

/// Capture `chart` at its layout size (floored at `min`) over a solid
/// `background`. The result is exactly the target size and fully opaque when
/// `background` is. Layouts larger than `MAX_CAPTURE_SIDE` on either side
/// are rejected before the element is touched.
pub fn capture_raster<S: RenderSurface + ?Sized>(
    surface: &mut S,
    chart: &ChartHandle,
    min: Size,
    background: [u8; 4],
) -> Result<RasterImage> {
    let layout = surface.layout_box(chart)?;
    let size = capture_size(&layout, min);
    if size.width > MAX_CAPTURE_SIDE || size.height > MAX_CAPTURE_SIDE {
        return Err(Error::RenderError(format!(
            "chart {} is {}x{}, larger than the {}px capture limit",
            chart, size.width, size.height, MAX_CAPTURE_SIDE
        )));
    }
    debug!("Capturing chart {} at {}x{}", chart, size.width, size.height);

    let raw = {
        let mut pinned = PinnedSize::pin(surface, chart, size)?;
        pinned.force_layout(chart)?;
        let raw = pinned.rasterize(chart, size, background)?;
        raw
    };

    Ok(raw.flatten_onto(background, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::Rect;
    use crate::rendering::paint::PaintCommand;
    use crate::surface::{Scene, SceneChart, SceneSurface};
    use crate::ReportCategory;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn surface(chart: SceneChart) -> SceneSurface {
        SceneSurface::new(Scene {
            active: Some(chart.category),
            charts: vec![chart],
        })
    }

    #[test]
    fn capture_pins_then_restores() {
        let mut chart = SceneChart::new(ReportCategory::Utilization, "cpu")
            .with_paint(vec![PaintCommand::Fill { rgba: [40, 40, 160, 255] }]);
        chart.layout = Rect::new(0.0, 0.0, 820.0, 410.0);
        let mut s = surface(chart);
        let h = ChartHandle::new(ReportCategory::Utilization, "cpu");
        let original = SizeStyle { width: Some("100%".into()), height: None };
        s.apply_size_style(&h, &original).unwrap();

        let img = capture_raster(&mut s, &h, Size::new(400, 300), WHITE).expect("capture");
        assert_eq!(img.size(), Size::new(820, 410));
        assert_eq!(s.rasters()[0].style, SizeStyle::pinned(Size::new(820, 410)));
        assert_eq!(s.size_style(&h).unwrap(), original);
    }

    #[test]
    fn capture_floors_small_charts() {
        let mut chart = SceneChart::new(ReportCategory::Activity, "log");
        chart.layout = Rect::new(0.0, 0.0, 50.0, 20.0);
        let mut s = surface(chart);
        let h = ChartHandle::new(ReportCategory::Activity, "log");
        let img = capture_raster(&mut s, &h, Size::new(400, 300), WHITE).expect("capture");
        assert_eq!(img.size(), Size::new(400, 300));
        // Nothing painted: the background fill shows everywhere
        assert!(img.as_raw().chunks(4).all(|p| p == WHITE));
    }

    #[test]
    fn size_restored_when_rasterize_fails() {
        let mut s = surface(SceneChart::new(ReportCategory::Warranty, "broken").failing());
        let h = ChartHandle::new(ReportCategory::Warranty, "broken");
        assert!(capture_raster(&mut s, &h, Size::new(400, 300), WHITE).is_err());
        assert_eq!(s.size_style(&h).unwrap(), SizeStyle::default());
    }

    #[test]
    fn oversized_layout_is_rejected_untouched() {
        let mut chart = SceneChart::new(ReportCategory::Inventory, "wall")
            .with_paint(vec![PaintCommand::Fill { rgba: [10, 10, 10, 255] }]);
        chart.layout = Rect::new(0.0, 0.0, 1e10, 1e10);
        let mut s = surface(chart);
        let h = ChartHandle::new(ReportCategory::Inventory, "wall");

        let err = capture_raster(&mut s, &h, Size::new(400, 300), WHITE).unwrap_err();
        assert!(matches!(err, Error::RenderError(_)));
        assert!(s.rasters().is_empty());
        assert_eq!(s.size_style(&h).unwrap(), SizeStyle::default());
    }

    #[test]
    fn layout_just_past_jpeg_limit_is_rejected() {
        let mut chart = SceneChart::new(ReportCategory::Inventory, "strip");
        chart.layout = Rect::new(0.0, 0.0, 70_000.0, 10.0);
        let mut s = surface(chart);
        let h = ChartHandle::new(ReportCategory::Inventory, "strip");
        assert!(capture_raster(&mut s, &h, Size::new(400, 300), WHITE).is_err());
    }
}
