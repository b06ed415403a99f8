/// Freehand ink annotations
///
/// A stroke is one continuous gesture: an ordered point list plus the width
/// and color that were active when it was drawn. Strokes are immutable once
/// added; the set preserves insertion order so undo can simply remove the
/// most recent one. The whole set serializes to JSON bytes, which is the
/// opaque payload embedded in saved files.

use serde::{Deserialize, Serialize};

/// A 2-D point in annotation-surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Stroke color, captured at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    pub const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };
    pub const GREEN: Rgb = Rgb { r: 0, g: 128, b: 0 };
    pub const YELLOW: Rgb = Rgb { r: 255, g: 255, b: 0 };
}

/// One continuous freehand gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
    pub width: f32,
    pub color: Rgb,
}

impl Stroke {
    /// Start a stroke at a point with the given style.
    pub fn begin(start: Point, width: f32, color: Rgb) -> Self {
        Self {
            points: vec![start],
            width: width.max(1.0),
            color,
        }
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }
}

/// Ordered collection of strokes for one pane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    strokes: Vec<Stroke>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished stroke. Insertion order is preserved.
    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Remove and return the most recently added stroke.
    pub fn undo(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Serialize to the opaque byte payload stored in saved files.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse a payload produced by `to_payload`.
    pub fn from_payload(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
