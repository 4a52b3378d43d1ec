//! Reconciliation of server-confirmed history with locally produced events.

use crate::event::{DrawEvent, Fingerprint};
use std::collections::HashSet;

/// Drop events the server never stores.
pub fn strip_local_only(confirmed: impl IntoIterator<Item = DrawEvent>) -> Vec<DrawEvent> {
    confirmed
        .into_iter()
        .filter(|event| !event.is_local_only())
        .collect()
}

pub fn fingerprints<'a>(events: impl IntoIterator<Item = &'a DrawEvent>) -> HashSet<Fingerprint> {
    events.into_iter().map(DrawEvent::fingerprint).collect()
}

/// Anything that carries a draw event.
pub trait AsEvent {
    fn as_event(&self) -> &DrawEvent;
}

impl AsEvent for DrawEvent {
    fn as_event(&self) -> &DrawEvent {
        self
    }
}

/// Split a fetched history from the local items it does not already contain.
///
/// Returns the confirmed history with text events removed, and every local
/// item whose fingerprint that history lacks, in local order.
pub fn split_unconfirmed<T: AsEvent>(
    confirmed: impl IntoIterator<Item = DrawEvent>,
    local: impl IntoIterator<Item = T>,
) -> (Vec<DrawEvent>, Vec<T>) {
    let confirmed = strip_local_only(confirmed);
    let seen = fingerprints(&confirmed);
    let extras: Vec<T> = local
        .into_iter()
        .filter(|item| !seen.contains(&item.as_event().fingerprint()))
        .collect();
    log::debug!(
        "merged {} confirmed events with {} local extras",
        confirmed.len(),
        extras.len()
    );
    (confirmed, extras)
}

/// Merge a fetched history with the local log: the confirmed events, then the
/// local events it lacks. Duplicates already present in either input are kept.
pub fn merge(confirmed: &[DrawEvent], local: &[DrawEvent]) -> Vec<DrawEvent> {
    let (confirmed, extras) = split_unconfirmed(confirmed.iter().cloned(), local.iter().cloned());
    confirmed.into_iter().chain(extras).collect()
}
