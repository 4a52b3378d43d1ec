//! Drawing tools: turn pointer gestures into draw events.

use crate::event::{DrawEvent, DrawPayload, kind};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Pen samples closer than this (squared) to the last one are dropped.
const PEN_MIN_STEP_SQ: f64 = 0.5;
/// Eraser samples closer than this (squared) to the last one are dropped.
const ERASER_MIN_STEP_SQ: f64 = 6.0;
const MIN_ERASER_RADIUS: f64 = 6.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Pen,
    Eraser,
    Line,
    Rect,
    Circle,
}

impl ToolKind {
    fn shape_name(self) -> Option<&'static str> {
        match self {
            ToolKind::Line => Some("line"),
            ToolKind::Rect => Some("rect"),
            ToolKind::Circle => Some("circle"),
            ToolKind::Pen | ToolKind::Eraser => None,
        }
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Active {
        /// Where the gesture started.
        start: Point,
        /// Last sample that produced an event.
        last: Point,
    },
}

/// Eraser radius for a given line width.
pub fn eraser_radius(line_width: f64) -> f64 {
    (line_width * 2.0).round().max(MIN_ERASER_RADIUS)
}

/// Manages the current tool and its state.
#[derive(Debug, Clone)]
pub struct ToolManager {
    pub current_tool: ToolKind,
    pub state: ToolState,
    pub color: String,
    pub line_width: f64,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::default(),
            color: "#000000".to_string(),
            line_width: 2.0,
        }
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch tools, abandoning any gesture in progress.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// Pointer down.
    pub fn begin(&mut self, point: Point) -> Option<DrawEvent> {
        self.state = ToolState::Active {
            start: point,
            last: point,
        };
        match self.current_tool {
            // A click with the pen leaves a dot.
            ToolKind::Pen => Some(DrawEvent::stroke(
                point,
                point,
                self.color.clone(),
                self.line_width,
            )),
            ToolKind::Eraser => Some(DrawEvent::erase(point, eraser_radius(self.line_width))),
            ToolKind::Line | ToolKind::Rect | ToolKind::Circle => None,
        }
    }

    /// Pointer move.
    pub fn update(&mut self, point: Point) -> Option<DrawEvent> {
        let ToolState::Active { start, last } = &mut self.state else {
            return None;
        };
        let step_sq = (point - *last).hypot2();
        match self.current_tool {
            ToolKind::Pen => {
                if step_sq < PEN_MIN_STEP_SQ {
                    return None;
                }
                let from = std::mem::replace(last, point);
                Some(DrawEvent::stroke(
                    from,
                    point,
                    self.color.clone(),
                    self.line_width,
                ))
            }
            ToolKind::Eraser => {
                if step_sq < ERASER_MIN_STEP_SQ {
                    return None;
                }
                *last = point;
                Some(DrawEvent::erase(point, eraser_radius(self.line_width)))
            }
            tool => {
                *last = point;
                let name = tool.shape_name()?;
                Some(DrawEvent::Preview(DrawPayload {
                    kind: format!("{}-{}", kind::SHAPE_PREVIEW, name),
                    x1: Some(start.x),
                    y1: Some(start.y),
                    x2: Some(point.x),
                    y2: Some(point.y),
                    color: Some(self.color.clone()),
                    line_width: Some(self.line_width),
                    ..Default::default()
                }))
            }
        }
    }

    /// Pointer up. Shape tools emit their final shape here.
    pub fn end(&mut self, point: Point) -> Option<DrawEvent> {
        let ToolState::Active { start, .. } = std::mem::take(&mut self.state) else {
            return None;
        };
        let color = self.color.clone();
        match self.current_tool {
            ToolKind::Line => Some(DrawEvent::line(start, point, color, self.line_width)),
            ToolKind::Rect => Some(DrawEvent::rect(start, point, color, self.line_width)),
            ToolKind::Circle => Some(DrawEvent::circle(start, point, color, self.line_width)),
            ToolKind::Pen | ToolKind::Eraser => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_tool_selection() {
        let mut tm = ToolManager::new();
        assert_eq!(tm.current_tool, ToolKind::Pen);

        tm.begin(p(0.0, 0.0));
        tm.set_tool(ToolKind::Rect);
        assert_eq!(tm.current_tool, ToolKind::Rect);
        assert!(!tm.is_active());
    }

    #[test]
    fn test_pen_emits_dot_then_segments() {
        let mut tm = ToolManager::new();
        let dot = tm.begin(p(0.0, 0.0)).unwrap();
        assert!(matches!(&dot, DrawEvent::Stroke(s) if s.is_degenerate()));

        assert!(tm.update(p(0.5, 0.0)).is_none());
        let seg = tm.update(p(1.0, 0.0)).unwrap();
        assert_eq!(seg, DrawEvent::stroke(p(0.0, 0.0), p(1.0, 0.0), "#000000", 2.0));
        let next = tm.update(p(3.0, 0.0)).unwrap();
        assert_eq!(next, DrawEvent::stroke(p(1.0, 0.0), p(3.0, 0.0), "#000000", 2.0));
        assert!(tm.end(p(3.0, 0.0)).is_none());
        assert!(!tm.is_active());
    }

    #[test]
    fn test_eraser_radius_and_spacing() {
        assert_eq!(eraser_radius(1.0), 6.0);
        assert_eq!(eraser_radius(5.0), 10.0);

        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Eraser);
        tm.line_width = 5.0;
        assert_eq!(tm.begin(p(0.0, 0.0)), Some(DrawEvent::erase(p(0.0, 0.0), 10.0)));
        assert!(tm.update(p(2.0, 1.0)).is_none());
        assert_eq!(tm.update(p(2.0, 2.0)), Some(DrawEvent::erase(p(2.0, 2.0), 10.0)));
    }

    #[test]
    fn test_shape_tool_previews_then_commits() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Circle);
        assert!(tm.begin(p(10.0, 10.0)).is_none());

        let preview = tm.update(p(20.0, 10.0)).unwrap();
        assert!(preview.is_preview());
        assert_eq!(preview.kind(), "shape-preview-circle");

        let done = tm.end(p(25.0, 10.0)).unwrap();
        assert_eq!(
            done,
            DrawEvent::circle(p(10.0, 10.0), p(25.0, 10.0), "#000000", 2.0)
        );
    }

    #[test]
    fn test_end_without_begin() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Line);
        assert!(tm.update(p(1.0, 1.0)).is_none());
        assert!(tm.end(p(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_cancel_interaction() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Rect);
        tm.begin(p(0.0, 0.0));
        tm.cancel();
        assert!(tm.end(p(10.0, 10.0)).is_none());
    }
}
