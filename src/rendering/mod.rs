//! Rendering module: raster primitives and the per-chart image stages

pub mod layout;
pub mod paint;
pub mod raster;
pub mod trim;
pub mod validate;
pub mod vector;

use crate::{Error, Result, Size};
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

/// An RGBA pixel grid.
///
/// Every stage of the capture pipeline produces a fresh `RasterImage`; none of
/// them edit their input in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// A fully transparent raster
    pub fn new(width: u32, height: u32) -> Self {
        Self { pixels: RgbaImage::new(width, height) }
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self { pixels: RgbaImage::from_pixel(width, height, Rgba(rgba)) }
    }

    /// Wrap a raw RGBA buffer; fails if the buffer length does not match.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        RgbaImage::from_raw(width, height, data)
            .map(Self::from_image)
            .ok_or_else(|| Error::RenderError(format!("RGBA buffer does not match {}x{}", width, height)))
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Decode PNG bytes (as produced by browser screenshots)
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| Error::RenderError(format!("PNG decode failed: {}", e)))?;
        Ok(Self::from_image(img.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Row-major RGBA bytes
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Composite this raster at the origin of a `size` canvas filled with
    /// `background`. Anything outside the canvas is clipped.
    pub fn flatten_onto(&self, background: [u8; 4], size: Size) -> RasterImage {
        let mut canvas = RgbaImage::from_pixel(size.width, size.height, Rgba(background));
        image::imageops::overlay(&mut canvas, &self.pixels, 0, 0);
        RasterImage { pixels: canvas }
    }

    /// Encode as JPEG and wrap as a `data:` URL. Alpha is discarded.
    pub fn to_jpeg_data_url(&self, quality: u8) -> Result<String> {
        let rgb = DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality)
            .encode_image(&rgb)
            .map_err(|e| Error::EncodeError(format!("JPEG encode failed: {}", e)))?;
        let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
        Ok(format!("data:image/jpeg;base64,{}", b64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_removes_transparency() {
        let src = RasterImage::new(10, 10);
        let out = src.flatten_onto([255, 255, 255, 255], Size::new(20, 15));
        assert_eq!(out.size(), Size::new(20, 15));
        assert!(out.as_raw().chunks(4).all(|p| p == [255, 255, 255, 255]));
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let src = RasterImage::filled(4, 4, [10, 20, 30, 255]);
        let out = src.flatten_onto([255, 255, 255, 255], Size::new(8, 8));
        assert_eq!(out.pixel(3, 3), [10, 20, 30, 255]);
        assert_eq!(out.pixel(4, 4), [255, 255, 255, 255]);
    }

    #[test]
    fn from_rgba_checks_length() {
        assert!(RasterImage::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(RasterImage::from_rgba(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn jpeg_data_url_has_prefix() {
        let img = RasterImage::filled(16, 16, [200, 0, 0, 255]);
        let url = img.to_jpeg_data_url(92).expect("encode");
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.len() > "data:image/jpeg;base64,".len());
    }
}
