//! Blank-raster detection

use crate::rendering::RasterImage;

const NEAR_BLACK: u8 = 5;
const NEAR_WHITE: u8 = 250;

/// Whether a single RGBA pixel reads as background: transparent, near-black
/// or near-white.
#[inline]
pub fn is_background(px: &[u8]) -> bool {
    let (r, g, b, a) = (px[0], px[1], px[2], px[3]);
    a == 0
        || (r < NEAR_BLACK && g < NEAR_BLACK && b < NEAR_BLACK)
        || (r > NEAR_WHITE && g > NEAR_WHITE && b > NEAR_WHITE)
}

/// True as soon as one pixel falls outside every background band.
pub fn has_content(raster: &RasterImage) -> bool {
    raster.as_raw().chunks_exact(4).any(|px| !is_background(px))
}
