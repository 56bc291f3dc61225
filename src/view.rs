//! Filtered projection and selection sync between the two packet lists.
//!
//! The filtered view never copies records. It is a list of ordinals into a
//! store snapshot, so a row picked there can always be located in the full
//! stream, even after more packets have arrived.

use crate::filter::FilterState;
use crate::model::Ordinal;
use crate::store::Snapshot;

/// Ordinals of the records that passed the filter, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct FilteredView {
    epoch: u64,
    ordinals: Vec<Ordinal>,
}

impl FilteredView {
    /// Re-derive the projection from a snapshot.
    pub fn project(snapshot: &Snapshot, filter: &FilterState) -> Self {
        let ordinals = snapshot
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| filter.matches(record))
            .map(|(position, _)| Ordinal(position))
            .collect();

        Self {
            epoch: snapshot.epoch(),
            ordinals,
        }
    }

    /// Store epoch the projection was taken from.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn ordinals(&self) -> &[Ordinal] {
        &self.ordinals
    }

    pub fn get(&self, position: usize) -> Option<Ordinal> {
        self.ordinals.get(position).copied()
    }

    /// Row of `ordinal` in this view, if it passed the filter.
    pub fn position_of(&self, ordinal: Ordinal) -> Option<usize> {
        // ordinals are ascending
        self.ordinals.binary_search(&ordinal).ok()
    }

    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }
}

/// Selection and scroll state shared by the full and filtered lists.
#[derive(Debug, Clone, Default)]
pub struct ViewSync {
    /// The selected record, highlighted in both lists
    selected: Option<Ordinal>,
    /// First visible row of the full list
    full_offset: usize,
    /// Row of the selection inside the filtered list
    filtered_cursor: Option<usize>,
}

impl ViewSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a row of the filtered list.
    ///
    /// Resolves the row to its ordinal, scrolls the full list so that the
    /// ordinal is the first visible row and selects it in both lists.
    pub fn select_filtered(&mut self, view: &FilteredView, position: usize) -> Option<Ordinal> {
        let ordinal = view.get(position)?;
        self.selected = Some(ordinal);
        self.full_offset = ordinal.index();
        self.filtered_cursor = Some(position);
        Some(ordinal)
    }

    /// Select a row of the full list directly.
    pub fn select_full(&mut self, view: &FilteredView, ordinal: Ordinal) {
        self.selected = Some(ordinal);
        self.filtered_cursor = view.position_of(ordinal);
    }

    /// Re-anchor after the projection was re-derived.
    ///
    /// The selection is kept even when it is no longer visible in the
    /// filtered list, so it stays highlighted in the full list.
    pub fn refresh(&mut self, view: &FilteredView) {
        self.filtered_cursor = self.selected.and_then(|ordinal| view.position_of(ordinal));
    }

    /// Forget everything; ordinals from before a store reset are meaningless.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    pub fn selected(&self) -> Option<Ordinal> {
        self.selected
    }

    pub fn full_offset(&self) -> usize {
        self.full_offset
    }

    pub fn filtered_cursor(&self) -> Option<usize> {
        self.filtered_cursor
    }

    pub fn set_full_offset(&mut self, offset: usize) {
        self.full_offset = offset;
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
