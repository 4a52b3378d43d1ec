//! Text blocks and their layout metrics.

use crate::event::{DrawPayload, TextEvent, kind};
use kurbo::{Point, Rect, Vec2};

/// Font size used when neither a font size nor a line width is known.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;
/// Legacy text events carry only a line width; font size is derived from it.
pub const LEGACY_FONT_SCALE: f64 = 4.0;
/// Padding around a text block's layout box.
pub const TEXT_BOX_PAD: f64 = 4.0;

const APPROX_GLYPH_WIDTH: f64 = 0.6;
const LINE_HEIGHT_FACTOR: f64 = 1.2;
const MIN_BLOCK_EXTENT: f64 = 10.0;

/// Measures the advance width of a single line of text.
///
/// Hosts with a real font engine plug one in; [`ApproxTextMeasure`] is used
/// otherwise.
pub trait TextMeasure {
    /// Width of `line` rendered at `font_size`, in canvas units.
    fn line_width(&self, line: &str, font_size: f64) -> f64;
}

/// Monospace approximation: every glyph is `0.6 * font_size` wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTextMeasure;

impl TextMeasure for ApproxTextMeasure {
    fn line_width(&self, line: &str, font_size: f64) -> f64 {
        line.chars().count().max(1) as f64 * font_size * APPROX_GLYPH_WIDTH
    }
}

/// Layout metrics of a (possibly multi-line) text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub font_size: f64,
    pub line_height: f64,
    pub max_width: f64,
    pub block_height: f64,
}

fn is_positive(value: &f64) -> bool {
    value.is_finite() && *value > 0.0
}

/// Lay out `text` at `font_size`.
///
/// Lines split on `\n` or `\r\n`. Non-positive font sizes fall back to
/// [`DEFAULT_FONT_SIZE`]; widths and heights never drop below 10 units.
pub fn measure_text_block(text: &str, font_size: f64, measure: &dyn TextMeasure) -> TextBlock {
    let font_size = if is_positive(&font_size) {
        font_size
    } else {
        DEFAULT_FONT_SIZE
    };
    let line_height = (font_size * LINE_HEIGHT_FACTOR).round().max(MIN_BLOCK_EXTENT);
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();

    let max_width = lines
        .iter()
        .map(|line| {
            let probe = if line.is_empty() { " " } else { line.as_str() };
            let width = measure.line_width(probe, font_size);
            let width = if width.is_finite() && width >= 0.0 {
                width
            } else {
                ApproxTextMeasure.line_width(probe, font_size)
            };
            width.ceil()
        })
        .fold(MIN_BLOCK_EXTENT, f64::max);
    let block_height = (lines.len() as f64 * line_height).max(MIN_BLOCK_EXTENT);

    TextBlock {
        lines,
        font_size,
        line_height,
        max_width,
        block_height,
    }
}

/// Padded layout box of a block whose first baseline sits at `anchor`.
pub fn text_box(anchor: Point, block: &TextBlock) -> Rect {
    let x0 = anchor.x - TEXT_BOX_PAD;
    let y0 = anchor.y - block.font_size - TEXT_BOX_PAD;
    Rect::new(
        x0,
        y0,
        x0 + block.max_width + 2.0 * TEXT_BOX_PAD,
        y0 + block.block_height + 2.0 * TEXT_BOX_PAD,
    )
}

/// Font size for a text event: explicit size, else `line_width * 4`, else 20.
pub fn effective_font_size(font_size: Option<f64>, line_width: Option<f64>) -> f64 {
    font_size
        .filter(is_positive)
        .or_else(|| {
            line_width
                .filter(is_positive)
                .map(|width| width * LEGACY_FONT_SCALE)
        })
        .unwrap_or(DEFAULT_FONT_SIZE)
}

/// A materialized text block with a resolved identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    pub id: String,
    pub text: String,
    /// Left end of the first line's baseline.
    pub anchor: Point,
    pub color: String,
    pub font_size: Option<f64>,
    pub line_width: Option<f64>,
}

impl TextShape {
    pub(crate) fn from_event(event: &TextEvent, id: String) -> Self {
        Self {
            id,
            text: event.text.clone(),
            anchor: event.anchor,
            color: event.color.clone(),
            font_size: event.font_size,
            line_width: event.line_width,
        }
    }

    /// Font size this block is laid out with.
    pub fn font_size(&self) -> f64 {
        effective_font_size(self.font_size, self.line_width)
    }

    pub fn layout(&self, measure: &dyn TextMeasure) -> TextBlock {
        measure_text_block(&self.text, self.font_size(), measure)
    }

    pub fn bounds(&self, measure: &dyn TextMeasure) -> Rect {
        text_box(self.anchor, &self.layout(measure))
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.anchor += delta;
    }

    pub(crate) fn to_payload(&self) -> DrawPayload {
        DrawPayload {
            kind: kind::TEXT.to_string(),
            id: Some(self.id.clone()),
            text: Some(self.text.clone()),
            x: Some(self.anchor.x),
            y: Some(self.anchor.y),
            x1: Some(self.anchor.x),
            y1: Some(self.anchor.y),
            color: (!self.color.is_empty()).then(|| self.color.clone()),
            font_size: self.font_size,
            line_width: self.line_width,
            ..Default::default()
        }
    }
}
