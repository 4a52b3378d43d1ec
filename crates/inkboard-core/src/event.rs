//! Draw events exchanged between participants.
//!
//! On the wire every event is a flat JSON object ([`DrawPayload`]) whose `type`
//! field selects the kind and whose other fields are all optional. [`DrawEvent`]
//! is the typed form the replay engine works with. It deserializes from any
//! payload (unknown kinds become [`DrawEvent::Other`]) and serializes back to a
//! payload with a stable [`Fingerprint`].

use crate::shapes::Primitive;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire tags.
pub mod kind {
    pub const STROKE_SEGMENT: &str = "stroke-segment";
    /// Older clients tag pen segments this way.
    pub const LEGACY_STROKE_SEGMENT: &str = "line-segment";
    pub const SHAPE_LINE: &str = "shape-line";
    pub const SHAPE_RECT: &str = "shape-rect";
    pub const SHAPE_CIRCLE: &str = "shape-circle";
    pub const TEXT: &str = "text";
    pub const TEXT_MOVE: &str = "text-move";
    pub const TEXT_DELETE: &str = "text-delete";
    pub const ERASE: &str = "erase";
    pub const ERASE_RECT: &str = "erase-rect";
    pub const MOVE_RECT: &str = "move-rect";
    pub const MOVE_RECT_PREVIEW: &str = "move-rect-preview";
    pub const CLEAR: &str = "clear";
    pub const SHAPE_PREVIEW: &str = "shape-preview";

    /// Transient in-progress tags. Never persisted or materialized.
    pub fn is_preview(tag: &str) -> bool {
        tag.starts_with(SHAPE_PREVIEW)
            || tag.starts_with("stroke-segment-preview")
            || tag.starts_with("line-segment-preview")
    }

    /// Tags that only make sense on the client that produced them.
    pub fn is_local_only(tag: &str) -> bool {
        matches!(tag, TEXT | TEXT_MOVE | TEXT_DELETE)
    }
}

/// Line width assumed when a drawable omits one.
pub const DEFAULT_LINE_WIDTH: f64 = 1.0;

/// Flat wire representation of a draw event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawPayload {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl DrawPayload {
    /// `(x1, y1)`, missing coordinates read as 0.
    pub fn start(&self) -> Point {
        Point::new(self.x1.unwrap_or(0.0), self.y1.unwrap_or(0.0))
    }

    /// `(x2, y2)`, each falling back to the start coordinate.
    pub fn end(&self) -> Point {
        let start = self.start();
        Point::new(self.x2.unwrap_or(start.x), self.y2.unwrap_or(start.y))
    }

    /// Text anchor: `x1 ?? x ?? 0`, `y1 ?? y ?? 0`.
    pub fn anchor(&self) -> Point {
        Point::new(
            self.x1.or(self.x).unwrap_or(0.0),
            self.y1.or(self.y).unwrap_or(0.0),
        )
    }

    /// Target of a text edit: `targetId`, else `id`.
    pub fn target(&self) -> Option<&str> {
        non_empty(self.target_id.as_deref()).or_else(|| non_empty(self.id.as_deref()))
    }

    fn primitive(&self) -> Primitive {
        Primitive::new(
            self.start(),
            self.end(),
            self.color.clone().unwrap_or_default(),
            self.line_width.unwrap_or(DEFAULT_LINE_WIDTH),
        )
    }

    /// Identity string used to deduplicate events across sources.
    ///
    /// Absent and empty fields contribute the same empty segment.
    pub fn fingerprint(&self) -> Fingerprint {
        fn num(value: Option<f64>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }

        let id = non_empty(self.id.as_deref())
            .or(self.target_id.as_deref())
            .unwrap_or_default();
        let fields = [
            self.kind.clone(),
            id.to_string(),
            num(self.x1),
            num(self.y1),
            num(self.x2),
            num(self.y2),
            num(self.x),
            num(self.y),
            num(self.dx),
            num(self.dy),
            self.color.clone().unwrap_or_default(),
            num(self.line_width),
            num(self.font_size),
            self.text.clone().unwrap_or_default(),
        ];
        Fingerprint(fields.join("|"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Deduplication key of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload of a `text` event.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEvent {
    /// Stable id. Events without one get a positional id during replay.
    pub id: Option<String>,
    pub text: String,
    pub anchor: Point,
    pub color: String,
    pub font_size: Option<f64>,
    pub line_width: Option<f64>,
}

/// A translation applied to every shape touching a region.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRegion {
    pub p1: Point,
    pub p2: Point,
    pub delta: Vec2,
}

impl MoveRegion {
    fn to_payload(&self, kind: &str) -> DrawPayload {
        DrawPayload {
            kind: kind.to_string(),
            x1: Some(self.p1.x),
            y1: Some(self.p1.y),
            x2: Some(self.p2.x),
            y2: Some(self.p2.y),
            dx: Some(self.delta.x),
            dy: Some(self.delta.y),
            ..Default::default()
        }
    }
}

/// A single entry of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DrawPayload", into = "DrawPayload")]
pub enum DrawEvent {
    /// One segment of a freehand pen stroke.
    Stroke(Primitive),
    Line(Primitive),
    Rect(Primitive),
    /// Center `p1`, radius `|p2 - p1|`.
    Circle(Primitive),
    Text(TextEvent),
    /// Missing coordinates keep the current anchor on that axis.
    TextMove {
        target_id: String,
        x: Option<f64>,
        y: Option<f64>,
    },
    TextDelete { target_id: String },
    /// Point eraser.
    Erase { center: Point, radius: f64 },
    /// Region eraser.
    EraseRect { p1: Point, p2: Point },
    MoveRect(MoveRegion),
    /// Transient drag of a selection; only ever used as an overlay.
    MoveRectPreview(MoveRegion),
    Clear,
    /// Transient in-progress shape from another participant.
    Preview(DrawPayload),
    /// Unrecognized kind, preserved verbatim.
    Other(DrawPayload),
}

impl DrawEvent {
    pub fn stroke(p1: Point, p2: Point, color: impl Into<String>, line_width: f64) -> Self {
        DrawEvent::Stroke(Primitive::new(p1, p2, color, line_width))
    }

    pub fn line(p1: Point, p2: Point, color: impl Into<String>, line_width: f64) -> Self {
        DrawEvent::Line(Primitive::new(p1, p2, color, line_width))
    }

    pub fn rect(p1: Point, p2: Point, color: impl Into<String>, line_width: f64) -> Self {
        DrawEvent::Rect(Primitive::new(p1, p2, color, line_width))
    }

    pub fn circle(center: Point, rim: Point, color: impl Into<String>, line_width: f64) -> Self {
        DrawEvent::Circle(Primitive::new(center, rim, color, line_width))
    }

    pub fn text(
        id: impl Into<String>,
        text: impl Into<String>,
        anchor: Point,
        color: impl Into<String>,
        font_size: f64,
    ) -> Self {
        DrawEvent::Text(TextEvent {
            id: Some(id.into()),
            text: text.into(),
            anchor,
            color: color.into(),
            font_size: Some(font_size),
            line_width: None,
        })
    }

    pub fn text_move(target_id: impl Into<String>, anchor: Point) -> Self {
        DrawEvent::TextMove {
            target_id: target_id.into(),
            x: Some(anchor.x),
            y: Some(anchor.y),
        }
    }

    pub fn erase(center: Point, radius: f64) -> Self {
        DrawEvent::Erase { center, radius }
    }

    pub fn erase_rect(p1: Point, p2: Point) -> Self {
        DrawEvent::EraseRect { p1, p2 }
    }

    pub fn move_rect(p1: Point, p2: Point, delta: Vec2) -> Self {
        DrawEvent::MoveRect(MoveRegion { p1, p2, delta })
    }

    /// Wire tag of this event.
    pub fn kind(&self) -> &str {
        match self {
            DrawEvent::Stroke(_) => kind::STROKE_SEGMENT,
            DrawEvent::Line(_) => kind::SHAPE_LINE,
            DrawEvent::Rect(_) => kind::SHAPE_RECT,
            DrawEvent::Circle(_) => kind::SHAPE_CIRCLE,
            DrawEvent::Text(_) => kind::TEXT,
            DrawEvent::TextMove { .. } => kind::TEXT_MOVE,
            DrawEvent::TextDelete { .. } => kind::TEXT_DELETE,
            DrawEvent::Erase { .. } => kind::ERASE,
            DrawEvent::EraseRect { .. } => kind::ERASE_RECT,
            DrawEvent::MoveRect(_) => kind::MOVE_RECT,
            DrawEvent::MoveRectPreview(_) => kind::MOVE_RECT_PREVIEW,
            DrawEvent::Clear => kind::CLEAR,
            DrawEvent::Preview(payload) | DrawEvent::Other(payload) => &payload.kind,
        }
    }

    /// Text events stay on the client that produced them.
    pub fn is_local_only(&self) -> bool {
        matches!(
            self,
            DrawEvent::Text(_) | DrawEvent::TextMove { .. } | DrawEvent::TextDelete { .. }
        )
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, DrawEvent::Preview(_) | DrawEvent::MoveRectPreview(_))
    }

    /// Whether this event is sent to the other participants.
    pub fn is_publishable(&self) -> bool {
        !self.is_local_only() && !self.is_preview()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        DrawPayload::from(self.clone()).fingerprint()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<DrawPayload> for DrawEvent {
    fn from(payload: DrawPayload) -> Self {
        match payload.kind.as_str() {
            kind::STROKE_SEGMENT | kind::LEGACY_STROKE_SEGMENT => {
                DrawEvent::Stroke(payload.primitive())
            }
            kind::SHAPE_LINE => DrawEvent::Line(payload.primitive()),
            kind::SHAPE_RECT => DrawEvent::Rect(payload.primitive()),
            kind::SHAPE_CIRCLE => DrawEvent::Circle(payload.primitive()),
            kind::TEXT => DrawEvent::Text(TextEvent {
                anchor: payload.anchor(),
                id: payload.id.filter(|id| !id.is_empty()),
                text: payload.text.unwrap_or_default(),
                color: payload.color.unwrap_or_default(),
                font_size: payload.font_size,
                line_width: payload.line_width,
            }),
            kind::TEXT_MOVE => DrawEvent::TextMove {
                target_id: payload.target().unwrap_or_default().to_string(),
                x: payload.x1.or(payload.x),
                y: payload.y1.or(payload.y),
            },
            kind::TEXT_DELETE => DrawEvent::TextDelete {
                target_id: payload.target().unwrap_or_default().to_string(),
            },
            kind::ERASE => DrawEvent::Erase {
                center: payload.start(),
                radius: payload.line_width.unwrap_or(0.0),
            },
            kind::ERASE_RECT => DrawEvent::EraseRect {
                p1: payload.start(),
                p2: payload.end(),
            },
            kind::MOVE_RECT | kind::MOVE_RECT_PREVIEW => {
                let region = MoveRegion {
                    p1: payload.start(),
                    p2: payload.end(),
                    delta: Vec2::new(payload.dx.unwrap_or(0.0), payload.dy.unwrap_or(0.0)),
                };
                if payload.kind == kind::MOVE_RECT {
                    DrawEvent::MoveRect(region)
                } else {
                    DrawEvent::MoveRectPreview(region)
                }
            }
            kind::CLEAR => DrawEvent::Clear,
            tag if kind::is_preview(tag) => DrawEvent::Preview(payload),
            _ => DrawEvent::Other(payload),
        }
    }
}

impl From<DrawEvent> for DrawPayload {
    fn from(event: DrawEvent) -> Self {
        match event {
            DrawEvent::Stroke(p) => p.to_payload(kind::STROKE_SEGMENT),
            DrawEvent::Line(p) => p.to_payload(kind::SHAPE_LINE),
            DrawEvent::Rect(p) => p.to_payload(kind::SHAPE_RECT),
            DrawEvent::Circle(p) => p.to_payload(kind::SHAPE_CIRCLE),
            DrawEvent::Text(text) => DrawPayload {
                kind: kind::TEXT.to_string(),
                id: text.id,
                text: Some(text.text),
                x: Some(text.anchor.x),
                y: Some(text.anchor.y),
                x1: Some(text.anchor.x),
                y1: Some(text.anchor.y),
                color: (!text.color.is_empty()).then_some(text.color),
                font_size: text.font_size,
                line_width: text.line_width,
                ..Default::default()
            },
            DrawEvent::TextMove { target_id, x, y } => DrawPayload {
                kind: kind::TEXT_MOVE.to_string(),
                target_id: Some(target_id),
                x1: x,
                y1: y,
                ..Default::default()
            },
            DrawEvent::TextDelete { target_id } => DrawPayload {
                kind: kind::TEXT_DELETE.to_string(),
                target_id: Some(target_id),
                ..Default::default()
            },
            DrawEvent::Erase { center, radius } => DrawPayload {
                kind: kind::ERASE.to_string(),
                x1: Some(center.x),
                y1: Some(center.y),
                line_width: Some(radius),
                ..Default::default()
            },
            DrawEvent::EraseRect { p1, p2 } => DrawPayload {
                kind: kind::ERASE_RECT.to_string(),
                x1: Some(p1.x),
                y1: Some(p1.y),
                x2: Some(p2.x),
                y2: Some(p2.y),
                ..Default::default()
            },
            DrawEvent::MoveRect(region) => region.to_payload(kind::MOVE_RECT),
            DrawEvent::MoveRectPreview(region) => region.to_payload(kind::MOVE_RECT_PREVIEW),
            DrawEvent::Clear => DrawPayload {
                kind: kind::CLEAR.to_string(),
                ..Default::default()
            },
            DrawEvent::Preview(payload) | DrawEvent::Other(payload) => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stroke_with_legacy_tag() {
        let event = DrawEvent::from_json(
            r##"{"type":"line-segment","x1":0,"y1":0,"x2":10,"y2":10,"color":"#000","lineWidth":2}"##,
        )
        .unwrap();
        assert_eq!(
            event,
            DrawEvent::stroke(Point::new(0.0, 0.0), Point::new(10.0, 10.0), "#000", 2.0)
        );
        assert_eq!(event.kind(), kind::STROKE_SEGMENT);
    }

    #[test]
    fn test_missing_coordinates_default() {
        let event = DrawEvent::from_json(r#"{"type":"shape-rect","x1":5}"#).unwrap();
        let DrawEvent::Rect(rect) = event else {
            panic!("expected a rect");
        };
        assert_eq!(rect.p1, Point::new(5.0, 0.0));
        assert_eq!(rect.p2, Point::new(5.0, 0.0));
        assert_eq!(rect.line_width, DEFAULT_LINE_WIDTH);
        assert_eq!(rect.color, "");
    }

    #[test]
    fn test_text_anchor_fallbacks() {
        let event = DrawEvent::from_json(r#"{"type":"text","text":"hi","x":7,"y":9}"#).unwrap();
        let DrawEvent::Text(text) = event else {
            panic!("expected text");
        };
        assert_eq!(text.anchor, Point::new(7.0, 9.0));
        assert_eq!(text.id, None);

        let event =
            DrawEvent::from_json(r#"{"type":"text-move","id":"t1","x1":3,"x":100}"#).unwrap();
        assert_eq!(
            event,
            DrawEvent::TextMove {
                target_id: "t1".to_string(),
                x: Some(3.0),
                y: None,
            }
        );
    }

    #[test]
    fn test_erase_and_move_defaults() {
        let event = DrawEvent::from_json(r#"{"type":"erase","x1":1,"y1":2}"#).unwrap();
        assert_eq!(event, DrawEvent::erase(Point::new(1.0, 2.0), 0.0));

        let event = DrawEvent::from_json(r#"{"type":"move-rect","x1":0,"y1":0,"x2":4,"y2":4,"dx":3}"#)
            .unwrap();
        assert_eq!(
            event,
            DrawEvent::move_rect(Point::ZERO, Point::new(4.0, 4.0), Vec2::new(3.0, 0.0))
        );
    }

    #[test]
    fn test_unknown_and_preview_kinds() {
        let event = DrawEvent::from_json(r#"{"type":"sticker","x1":1,"extra":true}"#).unwrap();
        assert!(matches!(&event, DrawEvent::Other(p) if p.kind == "sticker"));
        assert!(event.is_publishable());

        let event = DrawEvent::from_json(r#"{"type":"shape-preview-rect","x1":1}"#).unwrap();
        assert!(event.is_preview());
        assert!(!event.is_publishable());

        let event = DrawEvent::from_json(r#"{"x1":1}"#).unwrap();
        assert!(matches!(event, DrawEvent::Other(p) if p.kind.is_empty()));
    }

    #[test]
    fn test_local_only_kinds() {
        let text = DrawEvent::text("t1", "hi", Point::ZERO, "", 20.0);
        assert!(text.is_local_only());
        assert!(!text.is_publishable());
        assert!(
            DrawEvent::TextDelete {
                target_id: "t1".to_string()
            }
            .is_local_only()
        );
        assert!(!DrawEvent::Clear.is_local_only());
        assert!(kind::is_local_only("text-move"));
    }

    #[test]
    fn test_fingerprint_treats_absent_as_empty() {
        let with_empty = DrawPayload {
            kind: "sticker".to_string(),
            id: Some(String::new()),
            color: Some(String::new()),
            ..Default::default()
        };
        let bare = DrawPayload {
            kind: "sticker".to_string(),
            ..Default::default()
        };
        assert_eq!(with_empty.fingerprint(), bare.fingerprint());
        assert_eq!(bare.fingerprint().as_str(), "sticker|||||||||||||");
    }

    #[test]
    fn test_fingerprint_uses_target_id_without_id() {
        let delete = DrawEvent::TextDelete {
            target_id: "abc".to_string(),
        };
        assert!(delete.fingerprint().as_str().starts_with("text-delete|abc|"));
    }

    #[test]
    fn test_fingerprint_formats_integers_plainly() {
        let event = DrawEvent::stroke(Point::new(1.0, 2.5), Point::new(3.0, 4.0), "red", 2.0);
        assert_eq!(
            event.fingerprint().as_str(),
            "stroke-segment||1|2.5|3|4|||||red|2||"
        );
    }

    #[test]
    fn test_fingerprint_survives_the_wire() {
        let event = DrawEvent::circle(Point::new(1.0, 1.0), Point::new(4.0, 5.0), "green", 3.0);
        let parsed = DrawEvent::from_json(&event.to_json().unwrap()).unwrap();
        assert_eq!(parsed.fingerprint(), event.fingerprint());
    }
}
