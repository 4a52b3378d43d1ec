//! Shapes materialized by replaying the event log.

mod primitive;
mod text;

pub use primitive::{MIN_CIRCLE_RADIUS, Primitive};
pub use text::{
    ApproxTextMeasure, DEFAULT_FONT_SIZE, LEGACY_FONT_SCALE, TEXT_BOX_PAD, TextBlock,
    TextMeasure, TextShape, effective_font_size, measure_text_block, text_box,
};

use crate::event::{DrawEvent, DrawPayload, TextEvent, kind};
use crate::geometry::{self, NormalizedRect};
use kurbo::{Point, Rect, Vec2};
use serde::Serialize;

/// A shape currently visible on the board.
///
/// Serializes to the same flat JSON object as the event that created it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "DrawPayload")]
pub enum VisibleShape {
    Stroke(Primitive),
    Line(Primitive),
    Rect(Primitive),
    Circle(Primitive),
    Text(TextShape),
    /// Unrecognized kind. Kept in order but never drawn or hit.
    Other(DrawPayload),
}

impl VisibleShape {
    /// Wire tag of the event that created this shape.
    pub fn kind(&self) -> &str {
        match self {
            VisibleShape::Stroke(_) => kind::STROKE_SEGMENT,
            VisibleShape::Line(_) => kind::SHAPE_LINE,
            VisibleShape::Rect(_) => kind::SHAPE_RECT,
            VisibleShape::Circle(_) => kind::SHAPE_CIRCLE,
            VisibleShape::Text(_) => kind::TEXT,
            VisibleShape::Other(payload) => &payload.kind,
        }
    }

    pub fn primitive(&self) -> Option<&Primitive> {
        match self {
            VisibleShape::Stroke(p)
            | VisibleShape::Line(p)
            | VisibleShape::Rect(p)
            | VisibleShape::Circle(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextShape> {
        match self {
            VisibleShape::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, VisibleShape::Text(_))
    }

    /// Translate the shape by `delta`. Unknown kinds stay put.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            VisibleShape::Stroke(p)
            | VisibleShape::Line(p)
            | VisibleShape::Rect(p)
            | VisibleShape::Circle(p) => p.translate(delta),
            VisibleShape::Text(text) => text.translate(delta),
            VisibleShape::Other(_) => {}
        }
    }

    /// Padded bounding box, or `None` for unknown kinds.
    pub fn bounds(&self, measure: &dyn TextMeasure) -> Option<Rect> {
        geometry::bounds_of(self, measure)
    }

    /// Whether a disc at `center` of `radius` touches this shape.
    pub fn hit_test(&self, center: Point, radius: f64) -> bool {
        geometry::shape_intersects_point(self, center, radius)
    }

    /// Whether this shape touches the normalized region.
    pub fn intersects_rect(&self, region: &NormalizedRect) -> bool {
        geometry::shape_intersects_rect(self, region)
    }

    /// The event that would recreate this shape in its current position.
    pub fn to_event(&self) -> DrawEvent {
        match self {
            VisibleShape::Stroke(p) => DrawEvent::Stroke(p.clone()),
            VisibleShape::Line(p) => DrawEvent::Line(p.clone()),
            VisibleShape::Rect(p) => DrawEvent::Rect(p.clone()),
            VisibleShape::Circle(p) => DrawEvent::Circle(p.clone()),
            VisibleShape::Text(text) => DrawEvent::Text(TextEvent {
                id: Some(text.id.clone()),
                text: text.text.clone(),
                anchor: text.anchor,
                color: text.color.clone(),
                font_size: text.font_size,
                line_width: text.line_width,
            }),
            VisibleShape::Other(payload) => DrawEvent::Other(payload.clone()),
        }
    }
}

impl From<VisibleShape> for DrawPayload {
    fn from(shape: VisibleShape) -> Self {
        match shape {
            VisibleShape::Text(text) => text.to_payload(),
            VisibleShape::Other(payload) => payload,
            other => DrawPayload::from(other.to_event()),
        }
    }
}
