//! Raster images produced by the renderer.

use crate::error::{RenderError, RenderResult};

/// A rendered RGBA image (straight alpha, 4 bytes per pixel, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data.
    pub data: Vec<u8>,
}

impl RasterImage {
    /// Wrap an RGBA buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Pixmap`] if `data` does not hold exactly
    /// `width * height` pixels.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> RenderResult<Self> {
        let expected = pixel_count(width, height) * 4;
        if data.len() != expected {
            return Err(RenderError::Pixmap(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// An image filled with one colour.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba.repeat(pixel_count(width, height));
        Self {
            width,
            height,
            data,
        }
    }

    /// Colour of the pixel at (`x`, `y`), if inside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Size of the pixel data in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Encode the image as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Encode`] if encoding fails.
    #[cfg(feature = "png")]
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        use image::ImageEncoder;

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        encoder
            .write_image(
                &self.data,
                self.width,
                self.height,
                image::ColorType::Rgba8.into(),
            )
            .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}")))?;
        Ok(buf.into_inner())
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_image() {
        let img = RasterImage::solid(3, 2, [10, 20, 30, 255]);
        assert_eq!(img.size_bytes(), 24);
        assert_eq!(img.pixel(2, 1), Some([10, 20, 30, 255]));
        assert_eq!(img.pixel(3, 0), None);
    }

    #[test]
    fn test_new_checks_buffer_length() {
        assert!(RasterImage::new(2, 2, vec![0; 16]).is_ok());
        assert!(RasterImage::new(2, 2, vec![0; 15]).is_err());
    }

    #[cfg(feature = "png")]
    #[test]
    fn test_encode_png_signature() {
        let img = RasterImage::solid(4, 4, [255, 0, 0, 255]);
        let png = img.encode_png().expect("encode");
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
    }
}
