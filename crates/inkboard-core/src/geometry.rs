//! Geometry kernel: distances, rectangle helpers and per-shape hit predicates.
//!
//! The stroke pad used here matches the half line width a renderer paints
//! outside a shape's control points. Bounds use a larger minimum pad so thin
//! shapes stay easy to select.

use crate::shapes::{TextMeasure, VisibleShape};
use kurbo::{Point, Rect, Vec2};

/// Minimum padding around a shape's selection bounds.
pub const MIN_BOUNDS_PAD: f64 = 6.0;
/// Minimum hit slack around a text anchor.
pub const MIN_TEXT_HIT_PAD: f64 = 6.0;

pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Distance from `point` to the closed segment `a..b`.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let segment = b - a;
    let to_point = point - a;

    let len_sq = segment.hypot2();
    if len_sq < f64::EPSILON {
        return to_point.hypot();
    }

    let t = (to_point.dot(segment) / len_sq).clamp(0.0, 1.0);
    let projection = a + segment * t;
    point.distance(projection)
}

/// Distance from `point` to a rectangle; 0 when inside or on the edge.
pub fn distance_point_to_rect(point: Point, rect: Rect) -> f64 {
    let rect = rect.abs();
    let dx = (rect.x0 - point.x).max(0.0).max(point.x - rect.x1);
    let dy = (rect.y0 - point.y).max(0.0).max(point.y - rect.y1);
    Vec2::new(dx, dy).hypot()
}

/// A rectangle with non-negative extent, keeping both the origin/size and
/// corner forms around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl NormalizedRect {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x1, self.y1, self.x2, self.y2)
    }

    /// Top-left corner.
    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// Bottom-right corner.
    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Inclusive containment.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x1 && point.x <= self.x2 && point.y >= self.y1 && point.y <= self.y2
    }

    pub fn translate(&self, delta: Vec2) -> Self {
        normalize_rect(self.start() + delta, self.end() + delta)
    }
}

impl From<Rect> for NormalizedRect {
    fn from(rect: Rect) -> Self {
        normalize_rect(Point::new(rect.x0, rect.y0), Point::new(rect.x1, rect.y1))
    }
}

/// Normalize two arbitrary corners into a [`NormalizedRect`].
pub fn normalize_rect(p1: Point, p2: Point) -> NormalizedRect {
    let x1 = p1.x.min(p2.x);
    let y1 = p1.y.min(p2.y);
    let x2 = p1.x.max(p2.x);
    let y2 = p1.y.max(p2.y);
    NormalizedRect {
        x: x1,
        y: y1,
        w: x2 - x1,
        h: y2 - y1,
        x1,
        y1,
        x2,
        y2,
    }
}

/// Open-interval overlap: rectangles that only share an edge do not overlap.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// Half the line width, never negative.
pub fn stroke_pad(line_width: f64) -> f64 {
    (line_width / 2.0).max(0.0)
}

/// Half the line width, never below [`MIN_BOUNDS_PAD`].
pub fn bounds_pad(line_width: f64) -> f64 {
    (line_width / 2.0).max(MIN_BOUNDS_PAD)
}

fn square_around(center: Point, radius: f64) -> Rect {
    Rect::new(
        center.x - radius,
        center.y - radius,
        center.x + radius,
        center.y + radius,
    )
}

/// Padded selection bounds; `None` for kinds with no geometry.
pub fn bounds_of(shape: &VisibleShape, measure: &dyn TextMeasure) -> Option<Rect> {
    match shape {
        VisibleShape::Stroke(p) | VisibleShape::Line(p) | VisibleShape::Rect(p) => {
            let pad = bounds_pad(p.line_width);
            Some(p.extent().inflate(pad, pad))
        }
        VisibleShape::Circle(c) => Some(square_around(
            c.p1,
            c.circle_radius() + bounds_pad(c.line_width),
        )),
        VisibleShape::Text(text) => Some(text.bounds(measure)),
        VisibleShape::Other(_) => None,
    }
}

/// Whether a disc at `center` of `radius` touches `shape`.
pub fn shape_intersects_point(shape: &VisibleShape, center: Point, radius: f64) -> bool {
    match shape {
        VisibleShape::Stroke(p) | VisibleShape::Line(p) => {
            point_to_segment_dist(center, p.p1, p.p2) <= radius + stroke_pad(p.line_width)
        }
        VisibleShape::Rect(p) => {
            distance_point_to_rect(center, p.extent()) <= radius + stroke_pad(p.line_width)
        }
        VisibleShape::Circle(c) => {
            distance(center, c.p1) <= c.circle_radius() + radius + stroke_pad(c.line_width)
        }
        VisibleShape::Text(text) => {
            let slack = (text.font_size() / 2.0).max(MIN_TEXT_HIT_PAD);
            distance(center, text.anchor) <= radius + slack
        }
        VisibleShape::Other(_) => false,
    }
}

/// Whether `shape` touches `region`.
///
/// The region is grown by the shape's stroke pad; segments and circles are
/// tested by their bounding boxes, text by its anchor point.
pub fn shape_intersects_rect(shape: &VisibleShape, region: &NormalizedRect) -> bool {
    match shape {
        VisibleShape::Stroke(p) | VisibleShape::Line(p) => {
            let pad = stroke_pad(p.line_width);
            rects_overlap(p.extent().inflate(pad, pad), region.rect().inflate(pad, pad))
        }
        VisibleShape::Rect(p) => {
            let pad = stroke_pad(p.line_width);
            rects_overlap(p.extent(), region.rect().inflate(pad, pad))
        }
        VisibleShape::Circle(c) => {
            let pad = stroke_pad(c.line_width);
            let circle = square_around(c.p1, c.circle_radius() + pad);
            rects_overlap(circle, region.rect().inflate(pad, pad))
        }
        VisibleShape::Text(text) => region.contains(text.anchor),
        VisibleShape::Other(_) => false,
    }
}
