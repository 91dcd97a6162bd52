/// Very small paint command set used by in-process chart scenes

use crate::rendering::RasterImage;
use crate::Size;
use image::Rgba;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PaintCommand {
    /// Replace every pixel of the surface
    Fill { rgba: [u8; 4] },
    /// Replace the pixels of a rectangle, clipped to the surface
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: [u8; 4],
    },
}

/// Execute `commands` in order on a transparent surface of `size`.
pub fn paint(commands: &[PaintCommand], size: Size) -> RasterImage {
    let mut raster = RasterImage::new(size.width, size.height);
    let img = raster.image_mut();
    for cmd in commands {
        match *cmd {
            PaintCommand::Fill { rgba } => {
                for px in img.pixels_mut() {
                    *px = Rgba(rgba);
                }
            }
            PaintCommand::SolidRect { x, y, width, height, rgba } => {
                let x0 = x.max(0) as u32;
                let y0 = y.max(0) as u32;
                let x1 = (x as i64 + width as i64).clamp(0, size.width as i64) as u32;
                let y1 = (y as i64 + height as i64).clamp(0, size.height as i64) as u32;
                for py in y0..y1 {
                    for px in x0..x1 {
                        img.put_pixel(px, py, Rgba(rgba));
                    }
                }
            }
        }
    }
    raster
}
