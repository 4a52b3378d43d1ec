//! Two-point primitives: pen segments, lines, rectangles and circles.

use crate::event::DrawPayload;
use kurbo::{Point, Rect, Vec2};

/// Smallest radius a circle is drawn and hit-tested with.
pub const MIN_CIRCLE_RADIUS: f64 = 0.5;

/// A primitive defined by two control points.
///
/// Segments and lines run from `p1` to `p2`, rectangles use them as opposite
/// corners, and circles use `p1` as the center and `|p2 - p1|` as the radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    /// First control point.
    pub p1: Point,
    /// Second control point.
    pub p2: Point,
    /// CSS color string (empty = renderer default).
    pub color: String,
    /// Stroke width in canvas units.
    pub line_width: f64,
}

impl Primitive {
    /// Create a primitive from two control points.
    pub fn new(p1: Point, p2: Point, color: impl Into<String>, line_width: f64) -> Self {
        Self {
            p1,
            p2,
            color: color.into(),
            line_width,
        }
    }

    /// Zero-length primitives render as dots.
    pub fn is_degenerate(&self) -> bool {
        self.p1 == self.p2
    }

    /// Axis-aligned extent of the two control points (no stroke padding).
    pub fn extent(&self) -> Rect {
        Rect::from_points(self.p1, self.p2).abs()
    }

    /// Radius when this primitive is read as a circle.
    pub fn circle_radius(&self) -> f64 {
        self.p1.distance(self.p2).max(MIN_CIRCLE_RADIUS)
    }

    /// Translate both control points.
    pub fn translate(&mut self, delta: Vec2) {
        self.p1 += delta;
        self.p2 += delta;
    }

    pub(crate) fn to_payload(&self, kind: &str) -> DrawPayload {
        DrawPayload {
            kind: kind.to_string(),
            x1: Some(self.p1.x),
            y1: Some(self.p1.y),
            x2: Some(self.p2.x),
            y2: Some(self.p2.y),
            color: (!self.color.is_empty()).then(|| self.color.clone()),
            line_width: Some(self.line_width),
            ..Default::default()
        }
    }
}
