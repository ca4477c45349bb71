//! # lattice-heap
//!
//! The process-wide heap of parse artifacts. Entries carry a current and an
//! old generation slot so a reparse batch can be diffed and rolled back.
//! All mutation goes through the typed mutator facades; the transaction
//! scope is owned by the dispatch driver, never by workers.

pub mod entry;
pub mod mutator;
pub mod store;
pub mod transaction;

pub use entry::{FileAddr, FileState, HeapEntry, Slot};
pub use mutator::{DirtyModules, HeapMutator, ParseMutator, ReparseMutator};
pub use store::FileHeap;
pub use transaction::{Transaction, TransactionKind};
