//! Hit-testing, region selection and drag-to-move.

use crate::event::{DrawEvent, MoveRegion};
use crate::geometry::{
    NormalizedRect, bounds_of, normalize_rect, rects_overlap, shape_intersects_point,
};
use crate::shapes::{TextMeasure, VisibleShape, measure_text_block, text_box};
use kurbo::{Point, Rect, Vec2};

/// The topmost shape under a point.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    /// Index into the visible shape list.
    pub index: usize,
    pub shape: VisibleShape,
    /// Padded selection bounds of the shape.
    pub bounds: Rect,
}

/// Find the last (topmost) shape within `hit_radius` of `point`.
pub fn pick_topmost(
    shapes: &[VisibleShape],
    point: Point,
    hit_radius: f64,
    measure: &dyn TextMeasure,
) -> Option<Pick> {
    let (index, shape) = shapes
        .iter()
        .enumerate()
        .rev()
        .find(|(_, shape)| shape_intersects_point(shape, point, hit_radius))?;
    let bounds = bounds_of(shape, measure)?;
    Some(Pick {
        index,
        shape: shape.clone(),
        bounds,
    })
}

/// Normalize a drag rectangle, rejecting ones smaller than `min_size` on
/// either axis.
pub fn select_by_rect(p1: Point, p2: Point, min_size: f64) -> Option<NormalizedRect> {
    let region = normalize_rect(p1, p2);
    (region.w >= min_size && region.h >= min_size).then_some(region)
}

/// A selected text block, addressed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedText {
    pub id: String,
    pub anchor: Point,
}

/// The current selection: a region, plus the text block when one was picked.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub region: NormalizedRect,
    pub text: Option<SelectedText>,
}

impl Selection {
    pub fn from_region(region: NormalizedRect) -> Self {
        Self { region, text: None }
    }

    pub fn from_pick(pick: &Pick) -> Self {
        Self {
            region: pick.bounds.into(),
            text: pick.shape.as_text().map(|text| SelectedText {
                id: text.id.clone(),
                anchor: text.anchor,
            }),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        self.region.contains(point)
    }

    /// Event that deletes the selection.
    ///
    /// Text is deleted by id so neighbouring shapes survive; anything else
    /// erases the whole region.
    pub fn deletion_event(&self) -> DrawEvent {
        match &self.text {
            Some(text) => DrawEvent::TextDelete {
                target_id: text.id.clone(),
            },
            None => DrawEvent::erase_rect(self.region.start(), self.region.end()),
        }
    }

    pub fn begin_drag(&self, point: Point) -> DragMove {
        DragMove::new(point, self.clone())
    }
}

/// An in-progress drag of a selection.
#[derive(Debug, Clone)]
pub struct DragMove {
    pub start_point: Point,
    pub current_point: Point,
    pub original: Selection,
}

impl DragMove {
    pub fn new(start_point: Point, original: Selection) -> Self {
        Self {
            start_point,
            current_point: start_point,
            original,
        }
    }

    pub fn update(&mut self, point: Point) {
        self.current_point = point;
    }

    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    pub fn is_moved(&self) -> bool {
        self.delta() != Vec2::ZERO
    }

    /// Selection rectangle at the current drag offset.
    pub fn current_region(&self) -> NormalizedRect {
        self.original.region.translate(self.delta())
    }

    /// Overlay event showing the drag in progress.
    ///
    /// Feed it to [`Board::visible_shapes_with`](crate::board::Board::visible_shapes_with);
    /// it is never appended to a log.
    pub fn preview_event(&self) -> DrawEvent {
        match &self.original.text {
            Some(text) => DrawEvent::text_move(text.id.clone(), text.anchor + self.delta()),
            None => DrawEvent::MoveRectPreview(MoveRegion {
                p1: self.original.region.start(),
                p2: self.original.region.end(),
                delta: self.delta(),
            }),
        }
    }

    /// Finish the drag at `end`. Returns `None` when nothing moved.
    pub fn finish(mut self, end: Point) -> Option<DrawEvent> {
        self.update(end);
        if !self.is_moved() {
            return None;
        }
        Some(match &self.original.text {
            Some(text) => DrawEvent::text_move(text.id.clone(), text.anchor + self.delta()),
            None => DrawEvent::move_rect(
                self.original.region.start(),
                self.original.region.end(),
                self.delta(),
            ),
        })
    }
}

/// Slide a new text block down one line at a time until its box clears every
/// existing text box. Falls back to `anchor` after `max_attempts`.
pub fn find_non_colliding_text_pos(
    shapes: &[VisibleShape],
    anchor: Point,
    text: &str,
    font_size: f64,
    measure: &dyn TextMeasure,
    max_attempts: usize,
) -> Point {
    let block = measure_text_block(text, font_size, measure);
    let occupied: Vec<Rect> = shapes
        .iter()
        .filter_map(VisibleShape::as_text)
        .map(|existing| existing.bounds(measure))
        .collect();

    let mut candidate = anchor;
    for _ in 0..max_attempts {
        let area = text_box(candidate, &block);
        if !occupied.iter().any(|other| rects_overlap(area, *other)) {
            return candidate;
        }
        candidate.y += block.line_height;
    }
    log::debug!(
        "no free text position after {} attempts, keeping {:?}",
        max_attempts,
        anchor
    );
    anchor
}
