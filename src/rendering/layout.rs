/// Layout primitives shared by the rendering layer and the capture unit

use crate::Size;
use serde::{Deserialize, Serialize};

/// An element's layout box in page pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// The explicit width/height styling an element carried before it was pinned.
///
/// `None` means the property was not set inline, so restoring clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeStyle {
    pub width: Option<String>,
    pub height: Option<String>,
}

impl SizeStyle {
    /// Inline pixel styling for a pinned size
    pub fn pinned(size: Size) -> Self {
        Self {
            width: Some(format!("{}px", size.width)),
            height: Some(format!("{}px", size.height)),
        }
    }
}

/// Largest capture side; JPEG cannot encode anything wider or taller
pub const MAX_CAPTURE_SIDE: u32 = u16::MAX as u32;

/// Capture dimensions for an element: its layout size rounded up, never
/// smaller than `floor`.
pub fn capture_size(layout: &Rect, floor: Size) -> Size {
    let to_px = |v: f64| if v.is_finite() && v > 0.0 { v.ceil() as u32 } else { 0 };
    Size {
        width: to_px(layout.width).max(floor.width),
        height: to_px(layout.height).max(floor.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_size_applies_floor() {
        let floor = Size::new(400, 300);
        assert_eq!(capture_size(&Rect::new(0.0, 0.0, 120.0, 80.0), floor), floor);
        assert_eq!(capture_size(&Rect::new(0.0, 0.0, 0.0, 0.0), floor), floor);
        assert_eq!(
            capture_size(&Rect::new(10.0, 10.0, 640.4, 200.0), floor),
            Size::new(641, 300)
        );
    }

    #[test]
    fn capture_size_ignores_nan() {
        let s = capture_size(&Rect::new(0.0, 0.0, f64::NAN, f64::INFINITY), Size::new(400, 300));
        assert_eq!(s, Size::new(400, 300));
    }

    #[test]
    fn huge_layouts_saturate_instead_of_wrapping() {
        let s = capture_size(&Rect::new(0.0, 0.0, 1e10, 70_000.0), Size::new(400, 300));
        assert_eq!(s, Size::new(u32::MAX, 70_000));
        assert!(s.width > MAX_CAPTURE_SIDE && s.height > MAX_CAPTURE_SIDE);
    }

    #[test]
    fn pinned_style_uses_pixels() {
        let s = SizeStyle::pinned(Size::new(640, 360));
        assert_eq!(s.width.as_deref(), Some("640px"));
        assert_eq!(s.height.as_deref(), Some("360px"));
    }
}
