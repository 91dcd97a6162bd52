//! Content bounding box detection and cropping
//!
//! A pixel is foreground when it is visibly opaque (alpha > 10) and not
//! near-white in every channel. The crop is the tight foreground box padded by
//! 5% of its extent per side, clamped to 5..=20 px and to the image bounds.

use crate::rendering::RasterImage;
use crate::Result;

const FOREGROUND_MIN_ALPHA: u8 = 10;
const FOREGROUND_MAX_CHANNEL: u8 = 250;
const PAD_RATIO: f64 = 0.05;
const PAD_MIN: f64 = 5.0;
const PAD_MAX: f64 = 20.0;

/// Pixel rectangle with exclusive `bottom` and `right` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl BoundingBox {
    pub fn full(width: u32, height: u32) -> Self {
        Self { top: 0, left: 0, bottom: height, right: width }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

#[inline]
pub fn is_foreground(px: &[u8]) -> bool {
    px[3] > FOREGROUND_MIN_ALPHA
        && (px[0] < FOREGROUND_MAX_CHANNEL
            || px[1] < FOREGROUND_MAX_CHANNEL
            || px[2] < FOREGROUND_MAX_CHANNEL)
}

/// Tight box around all foreground pixels, or the full image when there are
/// none.
pub fn content_bounds(raster: &RasterImage) -> BoundingBox {
    let (w, h) = (raster.width(), raster.height());
    if w == 0 || h == 0 {
        return BoundingBox::full(w, h);
    }

    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0u32, 0u32);
    let mut found = false;

    for (y, row) in raster.as_raw().chunks_exact(w as usize * 4).enumerate() {
        for (x, px) in row.chunks_exact(4).enumerate() {
            if is_foreground(px) {
                let (x, y) = (x as u32, y as u32);
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                found = true;
            }
        }
    }

    if !found {
        return BoundingBox::full(w, h);
    }
    BoundingBox { top: min_y, left: min_x, bottom: max_y + 1, right: max_x + 1 }
}

/// Per-side padding for a content extent
pub fn padding(extent: u32) -> u32 {
    (extent as f64 * PAD_RATIO).clamp(PAD_MIN, PAD_MAX) as u32
}

/// Expand `bounds` by its padding and clamp it to a `width` x `height` image.
pub fn pad_bounds(bounds: BoundingBox, width: u32, height: u32) -> BoundingBox {
    let pad_x = padding(bounds.width());
    let pad_y = padding(bounds.height());
    BoundingBox {
        top: bounds.top.saturating_sub(pad_y),
        left: bounds.left.saturating_sub(pad_x),
        bottom: bounds.bottom.saturating_add(pad_y).min(height),
        right: bounds.right.saturating_add(pad_x).min(width),
    }
}

/// Crop to the padded content box. A degenerate box leaves the raster whole.
pub fn trim(raster: &RasterImage) -> RasterImage {
    let bounds = pad_bounds(content_bounds(raster), raster.width(), raster.height());
    if bounds.is_empty() {
        return raster.clone();
    }
    let cropped = image::imageops::crop_imm(
        raster.image(),
        bounds.left,
        bounds.top,
        bounds.width(),
        bounds.height(),
    )
    .to_image();
    RasterImage::from_image(cropped)
}

/// Trim and encode as a JPEG data URL.
pub fn trim_and_encode(raster: &RasterImage, quality: u8) -> Result<String> {
    trim(raster).to_jpeg_data_url(quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::paint::{paint, PaintCommand};
    use crate::Size;

    fn scene(w: u32, h: u32, rect: (i32, i32, u32, u32)) -> RasterImage {
        paint(
            &[
                PaintCommand::Fill { rgba: [255, 255, 255, 255] },
                PaintCommand::SolidRect {
                    x: rect.0,
                    y: rect.1,
                    width: rect.2,
                    height: rect.3,
                    rgba: [30, 90, 200, 255],
                },
            ],
            Size::new(w, h),
        )
    }

    #[test]
    fn raw_bounds_match_rectangle() {
        let img = scene(400, 300, (100, 75, 200, 150));
        let b = content_bounds(&img);
        assert_eq!(b, BoundingBox { top: 75, left: 100, bottom: 225, right: 300 });
    }

    #[test]
    fn padded_bounds_grow_by_five_percent() {
        let img = scene(400, 300, (100, 75, 200, 150));
        let b = pad_bounds(content_bounds(&img), 400, 300);
        // 200 * 5% = 10, 150 * 5% = 7.5 -> 7
        assert_eq!(b, BoundingBox { top: 68, left: 90, bottom: 232, right: 310 });
    }

    #[test]
    fn padding_is_clamped() {
        assert_eq!(padding(20), 5);
        assert_eq!(padding(200), 10);
        assert_eq!(padding(1000), 20);
    }

    #[test]
    fn padding_clamps_to_image_edges() {
        let img = scene(400, 300, (2, 3, 396, 50));
        let b = pad_bounds(content_bounds(&img), 400, 300);
        assert_eq!(b.left, 0);
        assert_eq!(b.top, 0);
        assert_eq!(b.right, 400);
        assert_eq!(b.bottom, 53 + 5);
    }

    #[test]
    fn blank_raster_uses_full_extent() {
        let img = RasterImage::filled(400, 300, [255, 255, 255, 255]);
        assert_eq!(content_bounds(&img), BoundingBox::full(400, 300));
        let trimmed = trim(&img);
        assert_eq!(trimmed.size(), Size::new(400, 300));
    }

    #[test]
    fn faint_pixels_are_not_foreground() {
        assert!(!is_foreground(&[0, 0, 0, 10]));
        assert!(!is_foreground(&[250, 250, 250, 255]));
        assert!(is_foreground(&[249, 250, 250, 255]));
    }

    #[test]
    fn trim_crops_to_padded_box() {
        let img = scene(400, 300, (100, 75, 200, 150));
        let out = trim(&img);
        assert_eq!(out.size(), Size::new(220, 164));
        assert_eq!(out.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(out.pixel(10, 7), [30, 90, 200, 255]);
        // Source untouched
        assert_eq!(img.size(), Size::new(400, 300));
    }

    #[test]
    fn empty_raster_is_left_whole() {
        let img = RasterImage::new(0, 0);
        assert_eq!(trim(&img).size(), Size::new(0, 0));
    }
}
