//! Transaction scope over the shared heap.
//!
//! Created and closed by the dispatch driver, never by workers. Dropping a
//! transaction without committing rolls it back, matching the
//! commit-or-retain discipline of a database transaction guard.

use lattice_core::{FileKey, FxHashSet};

use crate::entry::Slot;
use crate::mutator::{ParseMutator, ReparseMutator};
use crate::store::FileHeap;

/// What kind of batch the transaction covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Cold-start scan. Writes are direct; the reducer suppresses
    /// duplicate work for keys already parsed this scan.
    Init,
    /// Direct non-initial scan (e.g. the parse phase of ensure-parsed).
    /// Writes are direct and not rollback-safe.
    Update,
    /// Incremental reparse. Writes stash the previous generation and are
    /// journaled for rollback.
    Reparse,
}

/// RAII transaction guard. Commit consumes the guard; dropping without
/// commit rolls back (journaled kinds only — direct writes stay).
pub struct Transaction<'h> {
    heap: &'h FileHeap,
    kind: TransactionKind,
    finished: bool,
}

impl<'h> Transaction<'h> {
    pub(crate) fn new(heap: &'h FileHeap, kind: TransactionKind) -> Self {
        Self {
            heap,
            kind,
            finished: false,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn heap(&self) -> &'h FileHeap {
        self.heap
    }

    /// Direct-write mutator for `Init`/`Update` transactions.
    pub fn parse_mutator(&self) -> ParseMutator<'h> {
        debug_assert!(self.kind != TransactionKind::Reparse);
        ParseMutator::new(self.heap)
    }

    /// Journaled mutator for `Reparse` transactions.
    pub fn reparse_mutator(&self) -> ReparseMutator<'h> {
        debug_assert!(self.kind == TransactionKind::Reparse);
        ReparseMutator::new(self.heap)
    }

    /// Project the `unchanged` classification back onto the heap: advance
    /// each key's old slot to its current slot.
    pub fn record_unchanged(&self, keys: &FxHashSet<FileKey>) {
        for key in keys {
            self.heap.advance_old(key);
        }
    }

    /// Project the `not_found` classification back onto the heap: force
    /// `NotFound` into each key's current slot. Idempotent with the
    /// per-file `clear_not_found` writes taken during the fold.
    pub fn record_not_found(&self, keys: &FxHashSet<FileKey>) {
        for key in keys {
            self.heap.write_slot(key, Slot::not_found());
        }
    }

    pub fn commit(mut self) {
        self.heap.commit(self.kind);
        self.finished = true;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.heap.rollback(self.kind);
        }
    }
}
