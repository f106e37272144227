//! Thumbnail geometry.

use inkbook_core::{Bounds, RenderContext};

/// Logical width of the page area a thumbnail shows, in points.
pub const DEFAULT_CONTENT_WIDTH: f32 = 768.0;

/// Thumbnail size in points (width, height).
pub const DEFAULT_THUMBNAIL_SIZE: (f32, f32) = (192.0, 256.0);

/// Fixes how a drawing maps onto a thumbnail: which page area is shown and at
/// what scale, so every thumbnail of a notebook lines up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailGeometry {
    /// Logical width of the page area shown.
    pub content_width: f32,
    /// Thumbnail width in points.
    pub width: f32,
    /// Thumbnail height in points.
    pub height: f32,
}

impl Default for ThumbnailGeometry {
    fn default() -> Self {
        Self {
            content_width: DEFAULT_CONTENT_WIDTH,
            width: DEFAULT_THUMBNAIL_SIZE.0,
            height: DEFAULT_THUMBNAIL_SIZE.1,
        }
    }
}

impl ThumbnailGeometry {
    /// Page area rendered into a thumbnail, keeping the thumbnail aspect ratio.
    #[must_use]
    pub fn content_bounds(&self) -> Bounds {
        let aspect = self.height / self.width;
        Bounds::new(0.0, 0.0, self.content_width, self.content_width * aspect)
    }

    /// Pixels per page point for the given context.
    #[must_use]
    pub fn scale(&self, context: &RenderContext) -> f32 {
        self.width / self.content_width * context.pixel_density
    }

    /// Output size in pixels for the given context.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_size(&self, context: &RenderContext) -> (u32, u32) {
        (
            (self.width * context.pixel_density).ceil() as u32,
            (self.height * context.pixel_density).ceil() as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InkRenderer;
    use inkbook_core::Appearance;

    #[test]
    fn test_default_geometry() {
        let geometry = ThumbnailGeometry::default();
        let bounds = geometry.content_bounds();
        assert!((bounds.width - 768.0).abs() < f32::EPSILON);
        assert!((bounds.height - 1024.0).abs() < f32::EPSILON);

        let ctx = RenderContext::new(Appearance::Light, 2.0);
        assert!((geometry.scale(&ctx) - 0.5).abs() < f32::EPSILON);
        assert_eq!(geometry.pixel_size(&ctx), (384, 512));
    }

    #[test]
    fn test_renderer_target_matches_pixel_size() {
        let geometry = ThumbnailGeometry::default();
        let ctx = RenderContext::new(Appearance::Light, 3.0);
        let size = InkRenderer::target_size(geometry.content_bounds(), geometry.scale(&ctx));
        assert_eq!(size, geometry.pixel_size(&ctx));
    }
}
