//! Ink - the vector content carried inside a [`DrawingBlob`].
//!
//! The model layer treats drawings as opaque bytes. Only the renderer and the
//! hosts that create drawings look inside, through [`Ink::from_blob`].

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, DrawingBlob};

/// A single sampled point along a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkPoint {
    /// X position in canvas points.
    pub x: f32,
    /// Y position in canvas points.
    pub y: f32,
}

impl InkPoint {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One continuous pen stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Sampled points, in drawing order.
    pub points: Vec<InkPoint>,
    /// Ink colour as RGBA.
    #[serde(default = "default_color")]
    pub color: [u8; 4],
    /// Pen width in canvas points.
    #[serde(default = "default_width")]
    pub width: f32,
}

fn default_color() -> [u8; 4] {
    [0, 0, 0, 255]
}

fn default_width() -> f32 {
    1.0
}

impl Stroke {
    /// A black stroke of default width through the given points.
    #[must_use]
    pub fn new(points: Vec<InkPoint>) -> Self {
        Self {
            points,
            color: default_color(),
            width: default_width(),
        }
    }

    /// Set the stroke colour.
    #[must_use]
    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    /// Set the stroke width.
    #[must_use]
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }
}

/// Axis-aligned rectangle in canvas points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Bounds {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle covers no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Vector drawing content: an ordered list of strokes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ink {
    /// Strokes in paint order.
    pub strokes: Vec<Stroke>,
}

impl Ink {
    /// Ink with the given strokes.
    #[must_use]
    pub fn new(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }

    /// Decode ink from a drawing blob.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInk`] if the blob is not ink.
    pub fn from_blob(blob: &DrawingBlob) -> CoreResult<Self> {
        serde_json::from_slice(blob.as_bytes()).map_err(|e| CoreError::InvalidInk(e.to_string()))
    }

    /// Encode the ink into an opaque drawing blob.
    #[must_use]
    pub fn to_blob(&self) -> DrawingBlob {
        // Serializing plain numbers and vectors cannot fail.
        DrawingBlob::new(serde_json::to_vec(self).unwrap_or_default())
    }

    /// Parse ink from its JSON form (as written by hosts and tools).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInk`] if the text is not ink JSON.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidInk(e.to_string()))
    }

    /// True when the ink has no visible points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(|s| s.points.is_empty())
    }

    /// Bounding rectangle of every stroke, including pen width.
    ///
    /// Returns an empty rectangle at the origin when there are no points.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for stroke in &self.strokes {
            let half = stroke.width.max(0.0) / 2.0;
            for p in &stroke.points {
                min_x = min_x.min(p.x - half);
                min_y = min_y.min(p.y - half);
                max_x = max_x.max(p.x + half);
                max_y = max_y.max(p.y + half);
            }
        }

        if min_x > max_x || min_y > max_y {
            return Bounds::default();
        }
        Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(x0: f32, y0: f32, x1: f32, y1: f32) -> Stroke {
        Stroke::new(vec![InkPoint::new(x0, y0), InkPoint::new(x1, y1)])
    }

    #[test]
    fn test_ink_blob_round_trip() {
        let ink = Ink::new(vec![
            line(0.0, 0.0, 10.0, 10.0).with_color([255, 0, 0, 255]),
            line(5.0, 5.0, 20.0, 2.0).with_width(3.0),
        ]);
        let blob = ink.to_blob();
        assert_eq!(Ink::from_blob(&blob).expect("decode"), ink);
    }

    #[test]
    fn test_garbage_blob_is_invalid_ink() {
        let blob = DrawingBlob::new(b"\x00\x01garbage".to_vec());
        assert!(matches!(Ink::from_blob(&blob), Err(CoreError::InvalidInk(_))));
    }

    #[test]
    fn test_bounds_include_pen_width() {
        let ink = Ink::new(vec![line(10.0, 20.0, 30.0, 40.0).with_width(2.0)]);
        let b = ink.bounds();
        assert!((b.x - 9.0).abs() < f32::EPSILON);
        assert!((b.y - 19.0).abs() < f32::EPSILON);
        assert!((b.width - 22.0).abs() < f32::EPSILON);
        assert!((b.height - 22.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_ink_has_empty_bounds() {
        let ink = Ink::default();
        assert!(ink.is_empty());
        assert!(ink.bounds().is_empty());
    }

    #[test]
    fn test_json_defaults_fill_color_and_width() {
        let ink = Ink::from_json(r#"{"strokes":[{"points":[{"x":1.0,"y":2.0}]}]}"#)
            .expect("parse");
        assert_eq!(ink.strokes[0].color, [0, 0, 0, 255]);
        assert!((ink.strokes[0].width - 1.0).abs() < f32::EPSILON);
    }
}
