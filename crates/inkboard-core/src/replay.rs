//! Replay engine: folds an ordered event log into the visible shape set.
//!
//! Replay is a pure function of the events it is fed. The working list keeps
//! insertion order (z-order, last is topmost) and a text id index that is
//! rebuilt whenever the list is filtered or shapes are moved.

use crate::event::DrawEvent;
use crate::geometry::{
    NormalizedRect, normalize_rect, shape_intersects_point, shape_intersects_rect,
};
use crate::shapes::{TextShape, VisibleShape};
use kurbo::{Point, Vec2};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Slot {
    shape: VisibleShape,
    deleted: bool,
}

/// Incremental replay state.
#[derive(Debug, Clone, Default)]
pub struct Replayer {
    slots: Vec<Slot>,
    text_index: HashMap<String, usize>,
    position: usize,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events applied so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Apply the next event of the log.
    pub fn apply(&mut self, event: &DrawEvent) {
        let position = self.position;
        self.position += 1;

        match event {
            DrawEvent::Clear => {
                self.slots.clear();
                self.text_index.clear();
            }
            DrawEvent::Erase { center, radius } => {
                if *radius > 0.0 {
                    self.retain(|shape| !shape_intersects_point(shape, *center, *radius));
                }
            }
            DrawEvent::EraseRect { p1, p2 } => {
                let region = normalize_rect(*p1, *p2);
                self.retain(|shape| !shape_intersects_rect(shape, &region));
            }
            DrawEvent::MoveRect(region) | DrawEvent::MoveRectPreview(region) => {
                self.translate_region(&normalize_rect(region.p1, region.p2), region.delta);
            }
            DrawEvent::TextMove { target_id, x, y } => match self.text_index.get(target_id) {
                Some(&index) => {
                    if let VisibleShape::Text(text) = &mut self.slots[index].shape {
                        text.anchor = Point::new(
                            x.unwrap_or(text.anchor.x),
                            y.unwrap_or(text.anchor.y),
                        );
                    }
                }
                None => log::trace!("text-move for unknown text {}", target_id),
            },
            DrawEvent::TextDelete { target_id } => match self.text_index.remove(target_id) {
                Some(index) => self.slots[index].deleted = true,
                None => log::trace!("text-delete for unknown text {}", target_id),
            },
            DrawEvent::Text(text) => {
                let id = text
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("legacy-text-{position}"));
                self.push(VisibleShape::Text(TextShape::from_event(text, id)));
            }
            DrawEvent::Stroke(p) => self.push(VisibleShape::Stroke(p.clone())),
            DrawEvent::Line(p) => self.push(VisibleShape::Line(p.clone())),
            DrawEvent::Rect(p) => self.push(VisibleShape::Rect(p.clone())),
            DrawEvent::Circle(p) => self.push(VisibleShape::Circle(p.clone())),
            DrawEvent::Preview(_) => {}
            DrawEvent::Other(payload) => self.push(VisibleShape::Other(payload.clone())),
        }
    }

    /// Visible shapes in z-order.
    pub fn finish(self) -> Vec<VisibleShape> {
        self.slots
            .into_iter()
            .filter(|slot| !slot.deleted)
            .map(|slot| slot.shape)
            .collect()
    }

    fn push(&mut self, shape: VisibleShape) {
        if let VisibleShape::Text(text) = &shape {
            self.text_index.insert(text.id.clone(), self.slots.len());
        }
        self.slots.push(Slot {
            shape,
            deleted: false,
        });
    }

    fn retain(&mut self, keep: impl Fn(&VisibleShape) -> bool) {
        self.slots.retain(|slot| !slot.deleted && keep(&slot.shape));
        self.rebuild_text_index();
    }

    fn translate_region(&mut self, region: &NormalizedRect, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        for slot in self.slots.iter_mut().filter(|slot| !slot.deleted) {
            if shape_intersects_rect(&slot.shape, region) {
                slot.shape.translate(delta);
            }
        }
        self.rebuild_text_index();
    }

    fn rebuild_text_index(&mut self) {
        self.text_index = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.deleted)
            .filter_map(|(index, slot)| slot.shape.as_text().map(|text| (text.id.clone(), index)))
            .collect();
    }
}

/// Replay `events` from an empty board.
pub fn replay<'a>(events: impl IntoIterator<Item = &'a DrawEvent>) -> Vec<VisibleShape> {
    let mut replayer = Replayer::new();
    for event in events {
        replayer.apply(event);
    }
    replayer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DrawPayload;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn stroke(x1: f64, y1: f64, x2: f64, y2: f64) -> DrawEvent {
        DrawEvent::stroke(p(x1, y1), p(x2, y2), "#000", 2.0)
    }

    #[test]
    fn test_empty_log() {
        assert!(replay(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_erase_removes_stroke() {
        let log = vec![stroke(0.0, 0.0, 10.0, 10.0), DrawEvent::erase(p(10.0, 10.0), 5.0)];
        assert!(replay(&log).is_empty());
    }

    #[test]
    fn test_erase_with_zero_radius_is_ignored() {
        let log = vec![stroke(0.0, 0.0, 10.0, 10.0), DrawEvent::erase(p(5.0, 5.0), 0.0)];
        assert_eq!(replay(&log).len(), 1);
    }

    #[test]
    fn test_move_then_erase_rect() {
        let rect = DrawEvent::rect(p(0.0, 0.0), p(20.0, 20.0), "#000", 2.0);
        let moved = vec![
            rect.clone(),
            DrawEvent::move_rect(p(0.0, 0.0), p(20.0, 20.0), Vec2::new(5.0, 5.0)),
        ];
        let shapes = replay(&moved);
        assert_eq!(shapes.len(), 1);
        let prim = shapes[0].primitive().unwrap();
        assert_eq!(prim.p1, p(5.0, 5.0));
        assert_eq!(prim.p2, p(25.0, 25.0));

        let mut erased = moved;
        erased.push(DrawEvent::erase_rect(p(0.0, 0.0), p(100.0, 100.0)));
        assert!(replay(&erased).is_empty());
    }

    #[test]
    fn test_move_preserves_count_and_skips_outside() {
        let log = vec![
            stroke(0.0, 0.0, 5.0, 5.0),
            stroke(200.0, 200.0, 210.0, 210.0),
            DrawEvent::move_rect(p(0.0, 0.0), p(10.0, 10.0), Vec2::new(1.0, 0.0)),
        ];
        let shapes = replay(&log);
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].primitive().unwrap().p1, p(1.0, 0.0));
        assert_eq!(shapes[1].primitive().unwrap().p1, p(200.0, 200.0));
    }

    #[test]
    fn test_zero_move_is_noop() {
        let log = vec![
            stroke(0.0, 0.0, 5.0, 5.0),
            DrawEvent::move_rect(p(0.0, 0.0), p(10.0, 10.0), Vec2::ZERO),
        ];
        assert_eq!(replay(&log), replay(&log[..1]));
    }

    #[test]
    fn test_clear_resets() {
        let log = vec![
            stroke(0.0, 0.0, 5.0, 5.0),
            DrawEvent::text("t1", "hi", p(0.0, 0.0), "", 20.0),
            DrawEvent::Clear,
            stroke(1.0, 1.0, 2.0, 2.0),
            DrawEvent::text_move("t1", p(50.0, 50.0)),
        ];
        assert_eq!(replay(&log), replay(&log[3..4]));
    }

    #[test]
    fn test_order_is_preserved() {
        let log = vec![
            stroke(0.0, 0.0, 1.0, 1.0),
            DrawEvent::rect(p(5.0, 5.0), p(6.0, 6.0), "", 1.0),
            DrawEvent::circle(p(9.0, 9.0), p(10.0, 9.0), "", 1.0),
        ];
        let shapes = replay(&log);
        let kinds: Vec<&str> = shapes.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec!["stroke-segment", "shape-rect", "shape-circle"]);
    }

    #[test]
    fn test_text_move_and_delete() {
        let log = vec![
            DrawEvent::text("t1", "hello", p(100.0, 100.0), "#000", 20.0),
            DrawEvent::text_move("t1", p(150.0, 120.0)),
        ];
        let shapes = replay(&log);
        assert_eq!(shapes.len(), 1);
        let text = shapes[0].as_text().unwrap();
        assert_eq!(text.anchor, p(150.0, 120.0));
        assert_eq!(text.text, "hello");

        let mut deleted = log;
        deleted.push(DrawEvent::TextDelete {
            target_id: "t1".to_string(),
        });
        assert!(replay(&deleted).is_empty());
    }

    #[test]
    fn test_text_round_trip() {
        let log = vec![
            DrawEvent::text("t1", "hello", p(10.0, 10.0), "#000", 20.0),
            DrawEvent::text_move("t1", p(50.0, 50.0)),
        ];
        let shapes = replay(&log);
        assert_eq!(shapes.len(), 1);
        let text = shapes[0].as_text().unwrap();
        assert_eq!(text.id, "t1");
        assert_eq!(text.text, "hello");
        assert_eq!(text.anchor, p(50.0, 50.0));
    }

    #[test]
    fn test_text_move_without_coordinates_keeps_anchor() {
        let partial = DrawEvent::from_json(r#"{"type":"text-move","targetId":"t1","y":70}"#).unwrap();
        let log = vec![
            DrawEvent::text("t1", "hello", p(10.0, 10.0), "", 20.0),
            DrawEvent::from_json(r#"{"type":"text-move","targetId":"t1"}"#).unwrap(),
        ];
        assert_eq!(replay(&log)[0].as_text().unwrap().anchor, p(10.0, 10.0));

        let log = vec![log[0].clone(), partial];
        assert_eq!(replay(&log)[0].as_text().unwrap().anchor, p(10.0, 70.0));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let log = vec![
            stroke(0.0, 0.0, 10.0, 10.0),
            stroke(10.0, 10.0, 20.0, 5.0),
            DrawEvent::rect(p(40.0, 40.0), p(80.0, 70.0), "#f00", 3.0),
            DrawEvent::circle(p(200.0, 200.0), p(215.0, 200.0), "", 2.0),
            DrawEvent::text("t1", "hello", p(120.0, 30.0), "", 20.0),
            DrawEvent::erase(p(20.0, 5.0), 4.0),
            DrawEvent::move_rect(p(30.0, 30.0), p(90.0, 90.0), Vec2::new(15.0, -5.0)),
            DrawEvent::text_move("t1", p(60.0, 150.0)),
            DrawEvent::erase_rect(p(190.0, 190.0), p(230.0, 230.0)),
            DrawEvent::text("t2", "bye", p(0.0, 100.0), "", 20.0),
            DrawEvent::TextDelete {
                target_id: "t2".to_string(),
            },
        ];
        let first = replay(&log);
        let second = replay(&log);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[1].primitive().unwrap().p1, p(55.0, 35.0));
        assert_eq!(first[2].as_text().unwrap().anchor, p(60.0, 150.0));
    }

    #[test]
    fn test_dangling_text_edits_are_noops() {
        let log = vec![
            stroke(0.0, 0.0, 1.0, 1.0),
            DrawEvent::text_move("missing", p(1.0, 1.0)),
            DrawEvent::TextDelete {
                target_id: "missing".to_string(),
            },
        ];
        assert_eq!(replay(&log), replay(&log[..1]));
    }

    #[test]
    fn test_legacy_text_gets_positional_id() {
        let legacy = DrawEvent::from_json(r#"{"type":"text","text":"old","x":1,"y":2}"#).unwrap();
        let log = vec![
            stroke(0.0, 0.0, 1.0, 1.0),
            legacy,
            DrawEvent::text_move("legacy-text-1", p(30.0, 40.0)),
        ];
        let shapes = replay(&log);
        let text = shapes[1].as_text().unwrap();
        assert_eq!(text.id, "legacy-text-1");
        assert_eq!(text.anchor, p(30.0, 40.0));
    }

    #[test]
    fn test_text_index_survives_erase() {
        let log = vec![
            stroke(0.0, 0.0, 1.0, 1.0),
            DrawEvent::text("t1", "hi", p(100.0, 100.0), "", 20.0),
            DrawEvent::erase(p(0.0, 0.0), 3.0),
            DrawEvent::text_move("t1", p(7.0, 7.0)),
        ];
        let shapes = replay(&log);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].as_text().unwrap().anchor, p(7.0, 7.0));
    }

    #[test]
    fn test_text_index_survives_delete_then_filter() {
        let log = vec![
            DrawEvent::text("a", "a", p(0.0, 0.0), "", 20.0),
            DrawEvent::text("b", "b", p(300.0, 300.0), "", 20.0),
            DrawEvent::TextDelete {
                target_id: "a".to_string(),
            },
            DrawEvent::erase_rect(p(-50.0, -50.0), p(-40.0, -40.0)),
            DrawEvent::text_move("b", p(1.0, 1.0)),
        ];
        let shapes = replay(&log);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].as_text().unwrap().id, "b");
        assert_eq!(shapes[0].as_text().unwrap().anchor, p(1.0, 1.0));
    }

    #[test]
    fn test_previews_never_materialize() {
        let preview = DrawEvent::Preview(DrawPayload {
            kind: "shape-preview-rect".to_string(),
            x1: Some(0.0),
            ..Default::default()
        });
        assert!(replay(&[preview]).is_empty());
    }

    #[test]
    fn test_unknown_kinds_are_kept_but_inert() {
        let other = DrawEvent::from_json(r#"{"type":"sticker","x1":0,"y1":0}"#).unwrap();
        let log = vec![other, DrawEvent::erase(p(0.0, 0.0), 50.0)];
        let shapes = replay(&log);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].kind(), "sticker");
    }

    #[test]
    fn test_erase_monotonic() {
        let base = vec![
            stroke(0.0, 0.0, 10.0, 0.0),
            stroke(100.0, 100.0, 110.0, 100.0),
            DrawEvent::circle(p(50.0, 50.0), p(55.0, 50.0), "", 1.0),
        ];
        let before = replay(&base).len();
        let mut erased = base.clone();
        erased.push(DrawEvent::erase(p(5.0, 0.0), 2.0));
        assert!(replay(&erased).len() <= before);
        let mut erased_rect = base;
        erased_rect.push(DrawEvent::erase_rect(p(40.0, 40.0), p(60.0, 60.0)));
        assert_eq!(replay(&erased_rect).len(), before - 1);
    }

    #[test]
    fn test_incremental_matches_batch() {
        let log = vec![
            stroke(0.0, 0.0, 10.0, 10.0),
            DrawEvent::text("t", "x", p(5.0, 5.0), "", 10.0),
            DrawEvent::move_rect(p(0.0, 0.0), p(10.0, 10.0), Vec2::new(2.0, 3.0)),
        ];
        let mut replayer = Replayer::new();
        for event in &log {
            replayer.apply(event);
        }
        assert_eq!(replayer.position(), 3);
        assert_eq!(replayer.finish(), replay(&log));
    }
}
