//! Render preparation: joins consecutive pen segments into polylines.
//!
//! Pen strokes arrive as many tiny segments. Drawing each one separately leaves
//! visible seams at the joints, so runs of matching segments are merged into a
//! single path before they reach a renderer.

use crate::shapes::{Primitive, VisibleShape};
use kurbo::{BezPath, Point};

/// Max squared gap between one segment's end and the next one's start for the
/// two to be joined.
pub const STROKE_JOIN_TOLERANCE_SQ: f64 = 0.75;

/// One draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem<'a> {
    /// A run of joined pen segments.
    Path {
        points: Vec<Point>,
        color: &'a str,
        line_width: f64,
    },
    /// Any other shape, drawn on its own.
    Shape(&'a VisibleShape),
}

impl RenderItem<'_> {
    /// Polyline path for a joined stroke.
    pub fn to_path(&self) -> Option<BezPath> {
        let RenderItem::Path { points, .. } = self else {
            return None;
        };
        let (first, rest) = points.split_first()?;
        let mut path = BezPath::new();
        path.move_to(*first);
        for point in rest {
            path.line_to(*point);
        }
        Some(path)
    }
}

fn joins(prev_end: Point, run: &Primitive, next: &Primitive) -> bool {
    next.color == run.color
        && next.line_width == run.line_width
        && (next.p1 - prev_end).hypot2() <= STROKE_JOIN_TOLERANCE_SQ
}

/// Group `shapes` into draw calls, preserving z-order.
pub fn coalesce_strokes(shapes: &[VisibleShape]) -> Vec<RenderItem<'_>> {
    let mut items = Vec::new();
    let mut index = 0;
    while index < shapes.len() {
        let VisibleShape::Stroke(first) = &shapes[index] else {
            items.push(RenderItem::Shape(&shapes[index]));
            index += 1;
            continue;
        };

        let mut points = vec![first.p1, first.p2];
        let mut end = first.p2;
        index += 1;
        while let Some(VisibleShape::Stroke(next)) = shapes.get(index) {
            if !joins(end, first, next) {
                break;
            }
            points.push(next.p2);
            end = next.p2;
            index += 1;
        }
        items.push(RenderItem::Path {
            points,
            color: &first.color,
            line_width: first.line_width,
        });
    }
    items
}
