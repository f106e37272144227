//! Drawing rasterization.
//!
//! [`DrawingRenderer`] is the seam between the sync pipeline and whatever
//! actually draws ink. [`InkRenderer`] is the software implementation built on
//! tiny-skia; it is deterministic for identical inputs.

use inkbook_core::{Appearance, Bounds, DrawingBlob, Ink};
use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Transform};

use crate::error::{RenderError, RenderResult};
use crate::RasterImage;

/// Renders a drawing into a raster image.
pub trait DrawingRenderer: Send + Sync {
    /// Render the part of `drawing` inside `bounds` at `scale` pixels per point.
    ///
    /// # Errors
    ///
    /// Returns an error if the drawing cannot be decoded or the target is empty.
    fn render(
        &self,
        drawing: &DrawingBlob,
        bounds: Bounds,
        scale: f32,
        appearance: Appearance,
    ) -> RenderResult<RasterImage>;
}

/// Page colour behind light-appearance ink.
const LIGHT_BACKGROUND: [u8; 4] = [255, 255, 255, 255];

/// Page colour behind dark-appearance ink.
const DARK_BACKGROUND: [u8; 4] = [28, 28, 30, 255];

/// Software ink renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct InkRenderer;

impl InkRenderer {
    /// Create a renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Output size in pixels for `bounds` at `scale`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn target_size(bounds: Bounds, scale: f32) -> (u32, u32) {
        let w = (bounds.width * scale).ceil().max(0.0) as u32;
        let h = (bounds.height * scale).ceil().max(0.0) as u32;
        (w, h)
    }

    fn background(appearance: Appearance) -> [u8; 4] {
        match appearance {
            Appearance::Light => LIGHT_BACKGROUND,
            Appearance::Dark => DARK_BACKGROUND,
        }
    }
}

/// Adapt an ink colour to the appearance.
///
/// Dark appearance inverts achromatic ink (black, white, greys) so strokes stay
/// visible on the dark page; coloured ink is left alone.
#[must_use]
pub fn adapt_color(color: [u8; 4], appearance: Appearance) -> [u8; 4] {
    let [r, g, b, a] = color;
    match appearance {
        Appearance::Dark if r == g && g == b => [255 - r, 255 - g, 255 - b, a],
        _ => color,
    }
}

impl DrawingRenderer for InkRenderer {
    fn render(
        &self,
        drawing: &DrawingBlob,
        bounds: Bounds,
        scale: f32,
        appearance: Appearance,
    ) -> RenderResult<RasterImage> {
        let ink = Ink::from_blob(drawing)?;
        let (width, height) = Self::target_size(bounds, scale);
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyTarget { width, height });
        }

        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Pixmap(format!("{width}x{height}")))?;
        let [br, bg, bb, ba] = Self::background(appearance);
        pixmap.fill(Color::from_rgba8(br, bg, bb, ba));

        let transform = Transform::from_scale(scale, scale).pre_translate(-bounds.x, -bounds.y);

        for stroke in &ink.strokes {
            let [r, g, b, a] = adapt_color(stroke.color, appearance);
            let mut paint = Paint::default();
            paint.set_color_rgba8(r, g, b, a);
            paint.anti_alias = true;

            match stroke.points.as_slice() {
                [] => {}
                [dot] => {
                    let radius = (stroke.width / 2.0).max(0.5);
                    if let Some(path) = PathBuilder::from_circle(dot.x, dot.y, radius) {
                        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
                    }
                }
                [first, rest @ ..] => {
                    let mut pb = PathBuilder::new();
                    pb.move_to(first.x, first.y);
                    for p in rest {
                        pb.line_to(p.x, p.y);
                    }
                    let Some(path) = pb.finish() else {
                        continue;
                    };
                    let style = tiny_skia::Stroke {
                        width: stroke.width.max(0.0),
                        line_cap: LineCap::Round,
                        line_join: LineJoin::Round,
                        ..tiny_skia::Stroke::default()
                    };
                    pixmap.stroke_path(&path, &paint, &style, transform, None);
                }
            }
        }

        let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
        for px in pixmap.pixels() {
            let c = px.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RasterImage::new(width, height, data)
    }
}
