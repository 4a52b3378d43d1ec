//! A single whiteboard scope: its event log, remote preview overlay and the
//! queue of events waiting to be published.

use crate::config::BoardConfig;
use crate::event::DrawEvent;
use crate::geometry::NormalizedRect;
use crate::history::{EventLog, RemoteOutcome};
use crate::replay::replay;
use crate::selection::{self, Pick, Selection};
use crate::shapes::{ApproxTextMeasure, TextMeasure, VisibleShape};
use crate::sync::{Publisher, Scope, SyncError, SyncEvent};
use kurbo::{Point, Rect};

/// Board state for one `(session, channel)` scope.
///
/// Local edits go through [`append_local`](Self::append_local); anything that
/// should reach other participants is queued until [`flush`](Self::flush) or
/// [`take_outgoing`](Self::take_outgoing).
pub struct Board {
    scope: Scope,
    config: BoardConfig,
    log: EventLog,
    /// Latest transient shape from another participant.
    remote_preview: Option<DrawEvent>,
    /// Events waiting to be published.
    outgoing: Vec<DrawEvent>,
    measure: Box<dyn TextMeasure + Send + Sync>,
}

impl Board {
    pub fn new(scope: Scope) -> Self {
        Self::with_config(scope, BoardConfig::default())
    }

    pub fn with_config(scope: Scope, config: BoardConfig) -> Self {
        Self {
            scope,
            config,
            log: EventLog::new(),
            remote_preview: None,
            outgoing: Vec::new(),
            measure: Box::new(ApproxTextMeasure),
        }
    }

    /// Replace the text measurer, e.g. with one backed by a real font.
    pub fn set_text_measure(&mut self, measure: Box<dyn TextMeasure + Send + Sync>) {
        self.measure = measure;
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn remote_preview(&self) -> Option<&DrawEvent> {
        self.remote_preview.as_ref()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Shapes produced by replaying the log.
    pub fn visible_shapes(&self) -> Vec<VisibleShape> {
        replay(self.log.events())
    }

    /// Shapes with a transient `overlay` applied on top, such as a drag preview.
    pub fn visible_shapes_with(&self, overlay: &DrawEvent) -> Vec<VisibleShape> {
        replay(self.log.events().chain(std::iter::once(overlay)))
    }

    /// Record an event produced on this client.
    ///
    /// `clear` empties the log immediately. Previews are never stored. Text
    /// events stay local; everything else is queued for publishing.
    pub fn append_local(&mut self, event: DrawEvent) {
        if event.is_publishable() {
            self.outgoing.push(event.clone());
        }
        match event {
            DrawEvent::Clear => {
                self.log.clear();
                self.remote_preview = None;
            }
            event if event.is_preview() => {}
            event => self.log.append_local(event),
        }
    }

    /// Drain the publish queue.
    pub fn take_outgoing(&mut self) -> Vec<DrawEvent> {
        std::mem::take(&mut self.outgoing)
    }

    /// Publish queued events in order. On failure the failed event and
    /// everything after it stay queued.
    pub fn flush<P: Publisher>(&mut self, publisher: &mut P) -> Result<usize, SyncError> {
        let queued = self.take_outgoing();
        for (sent, event) in queued.iter().enumerate() {
            if let Err(e) = publisher.publish(event) {
                log::warn!("Publishing to {} failed after {} events: {}", self.scope, sent, e);
                let mut remaining = queued[sent..].to_vec();
                remaining.append(&mut self.outgoing);
                self.outgoing = remaining;
                return Err(e);
            }
        }
        Ok(queued.len())
    }

    /// Apply an event received from another participant.
    pub fn receive_remote(&mut self, event: DrawEvent) -> RemoteOutcome {
        if event.is_preview() {
            self.remote_preview = Some(event);
            return RemoteOutcome::Preview;
        }
        let outcome = self.log.receive_remote(event);
        if outcome != RemoteOutcome::LocalOnly {
            self.remote_preview = None;
        }
        outcome
    }

    /// Replace the log with server-confirmed history, keeping local events the
    /// server has not seen yet.
    pub fn merge_history(&mut self, confirmed: Vec<DrawEvent>) {
        self.log.merge_history(confirmed);
    }

    /// Route a client event to this board.
    ///
    /// Returns the outcome for draw events; join confirmations for this scope
    /// merge the delivered history.
    pub fn apply_sync_event(&mut self, event: SyncEvent) -> Option<RemoteOutcome> {
        match event {
            SyncEvent::Joined { scope, history, .. } if scope == self.scope => {
                log::info!("Joined {} with {} history events", scope, history.len());
                self.merge_history(history);
                None
            }
            SyncEvent::Joined { scope, .. } => {
                log::debug!("Ignoring join confirmation for {}", scope);
                None
            }
            SyncEvent::Draw { from, event } => {
                log::trace!("draw event {} from {}", event.kind(), from);
                Some(self.receive_remote(event))
            }
            SyncEvent::Error { message } => {
                log::warn!("Relay error on {}: {}", self.scope, message);
                None
            }
            _ => None,
        }
    }

    pub fn bounds_of(&self, shape: &VisibleShape) -> Option<Rect> {
        shape.bounds(&*self.measure)
    }

    /// Topmost shape under `point`, using the configured hit radius.
    pub fn pick_topmost(&self, point: Point) -> Option<Pick> {
        selection::pick_topmost(
            &self.visible_shapes(),
            point,
            self.config.hit_radius,
            &*self.measure,
        )
    }

    /// Selection for a click at `point`.
    pub fn selection_at(&self, point: Point) -> Option<Selection> {
        self.pick_topmost(point).map(|pick| Selection::from_pick(&pick))
    }

    /// Region for a drag from `p1` to `p2`, if large enough.
    pub fn select_by_rect(&self, p1: Point, p2: Point) -> Option<NormalizedRect> {
        selection::select_by_rect(p1, p2, self.config.min_drag_size)
    }

    /// Delete the selection through the event log.
    pub fn delete_selection(&mut self, selection: &Selection) {
        self.append_local(selection.deletion_event());
    }

    /// Place a new text block at the first free spot at or below `anchor`.
    ///
    /// Returns the recorded event, or `None` when `text` is blank.
    pub fn place_text(
        &mut self,
        anchor: Point,
        text: &str,
        color: &str,
        font_size: f64,
    ) -> Option<DrawEvent> {
        if text.trim().is_empty() {
            return None;
        }
        let position = selection::find_non_colliding_text_pos(
            &self.visible_shapes(),
            anchor,
            text,
            font_size,
            &*self.measure,
            self.config.text_placement_attempts,
        );
        let event = DrawEvent::text(
            uuid::Uuid::new_v4().to_string(),
            text,
            position,
            color,
            font_size,
        );
        self.append_local(event.clone());
        Some(event)
    }
}
