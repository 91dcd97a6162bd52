//! SVG fallback rasterizer
//!
//! Used when a captured raster turns out blank: the chart's SVG markup is
//! parsed with `usvg` and drawn with `resvg` onto a white pixmap of the size
//! originally requested, scaled to fit and centered.

use crate::rendering::RasterImage;
use crate::{Error, Result, Size};
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg;

pub struct VectorRenderer {
    options: usvg::Options<'static>,
}

impl VectorRenderer {
    /// Create a renderer with the system fonts loaded for chart labels.
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        Self { options }
    }

    /// Rasterize `markup` into an opaque `size` raster.
    pub fn render(&self, markup: &str, size: Size) -> Result<RasterImage> {
        let tree = usvg::Tree::from_str(markup, &self.options)
            .map_err(|e| Error::VectorError(format!("Failed to parse SVG: {}", e)))?;

        let mut pixmap = Pixmap::new(size.width, size.height).ok_or_else(|| {
            Error::VectorError(format!("Failed to create pixmap {}x{}", size.width, size.height))
        })?;
        // Transparent regions of the SVG must come out white, not black.
        pixmap.fill(Color::WHITE);

        let transform = fit_transform(tree.size().width(), tree.size().height(), size);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // Every pixel is opaque after the white fill, so premultiplied data
        // equals straight RGBA.
        RasterImage::from_rgba(size.width, size.height, pixmap.take())
    }
}

impl Default for VectorRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform scale that fits `src_w` x `src_h` inside `target`, centered.
fn fit_transform(src_w: f32, src_h: f32, target: Size) -> Transform {
    if src_w <= 0.0 || src_h <= 0.0 {
        return Transform::identity();
    }
    let (tw, th) = (target.width as f32, target.height as f32);
    let scale = (tw / src_w).min(th / src_h);
    let tx = (tw - src_w * scale) / 2.0;
    let ty = (th - src_h * scale) / 2.0;
    Transform::from_row(scale, 0.0, 0.0, scale, tx, ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::validate::has_content;

    const BAR_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 200 100">
        <rect x="20" y="20" width="40" height="60" fill="#3366cc"/>
        <rect x="120" y="40" width="40" height="40" fill="#dc3912"/>
    </svg>"##;

    #[test]
    fn renders_svg_at_requested_size() {
        let r = VectorRenderer::new();
        let img = r.render(BAR_SVG, Size::new(400, 300)).expect("render");
        assert_eq!(img.size(), Size::new(400, 300));
        assert!(has_content(&img));
        // Corners come from the white fill
        assert_eq!(img.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(img.pixel(399, 299), [255, 255, 255, 255]);
    }

    #[test]
    fn transparent_svg_is_white() {
        let r = VectorRenderer::new();
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#;
        let img = r.render(svg, Size::new(40, 30)).expect("render");
        assert!(img.as_raw().chunks(4).all(|p| p == [255, 255, 255, 255]));
    }

    #[test]
    fn garbage_markup_fails() {
        let r = VectorRenderer::new();
        assert!(matches!(r.render("<div>not svg", Size::new(40, 30)), Err(Error::VectorError(_))));
    }

    #[test]
    fn fit_transform_centers() {
        let t = fit_transform(200.0, 100.0, Size::new(400, 300));
        assert_eq!(t.sx, 2.0);
        assert_eq!(t.tx, 0.0);
        assert_eq!(t.ty, 50.0);
    }
}
