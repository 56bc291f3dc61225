//! Append-only packet store
//!
//! The `PacketStore` is the single source of truth for a viewer session.
//! Every appended record receives the next ordinal (the store length before
//! insertion). Ordinals are dense and never reused until `reset`, which
//! restarts numbering at zero and bumps the store epoch so stale ordinals
//! can be recognised by whoever still holds them.

use std::sync::Arc;

use crate::model::{Ordinal, Record};

/// Insertion-ordered record buffer with stable ordinals.
#[derive(Debug, Default)]
pub struct PacketStore {
    /// Records in arrival order; `records[n].ordinal == Some(Ordinal(n))`
    records: Vec<Arc<Record>>,
    /// Incremented by every reset
    epoch: u64,
}

/// Point-in-time view of the store.
///
/// Holds shared references only, so later appends never show up in (or
/// tear) an existing snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    epoch: u64,
    records: Vec<Arc<Record>>,
}

impl PacketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return the ordinal assigned to it.
    ///
    /// Any ordinal already present on the record (e.g. from an imported
    /// dump) is replaced.
    pub fn append(&mut self, mut record: Record) -> Ordinal {
        let ordinal = Ordinal(self.records.len());
        record.ordinal = Some(ordinal);
        self.records.push(Arc::new(record));
        ordinal
    }

    /// Discard all records and restart numbering at zero.
    pub fn reset(&mut self) {
        self.records.clear();
        self.epoch += 1;
    }

    /// Take a consistent snapshot of every stored record.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            epoch: self.epoch,
            records: self.records.clone(),
        }
    }

    pub fn get(&self, ordinal: Ordinal) -> Option<&Arc<Record>> {
        self.records.get(ordinal.index())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of resets performed so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Iterate over stored records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.iter()
    }
}

impl Snapshot {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn records(&self) -> &[Arc<Record>] {
        &self.records
    }

    pub fn get(&self, ordinal: Ordinal) -> Option<&Arc<Record>> {
        self.records.get(ordinal.index())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
