//! The sharded keyed store: `FileKey → HeapEntry`.
//!
//! Writes are per-key; the input file set contains each key at most once,
//! so per-key single-writer holds without coordination beyond the shard
//! locks. Reads during a parse run are snapshots.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, RwLock};

use lattice_core::errors::HeapError;
use lattice_core::types::interning::ModuleInterner;
use lattice_core::{ContentHash, FileKey, FxHashMap, ModuleId};
use rustc_hash::FxHasher;

use crate::entry::{FileAddr, FileState, HeapEntry, Slot};
use crate::transaction::{Transaction, TransactionKind};

const SHARD_COUNT: usize = 64;

const TXN_NONE: u8 = 0;
const TXN_INIT: u8 = 1;
const TXN_UPDATE: u8 = 2;
const TXN_REPARSE: u8 = 3;

type Shard = RwLock<FxHashMap<FileKey, HeapEntry>>;

/// The process-wide heap of parse artifacts.
pub struct FileHeap {
    shards: Box<[Shard]>,
    interner: ModuleInterner,
    /// Active transaction kind, `TXN_NONE` outside a transaction.
    active_kind: AtomicU8,
    /// Set once the first transaction commits.
    initialized: AtomicBool,
    /// First-touch journal of pre-write entries, kept only for reparse
    /// transactions. `None` records a key absent before the write.
    journal: Mutex<FxHashMap<FileKey, Option<HeapEntry>>>,
}

impl FileHeap {
    pub fn new() -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(FxHashMap::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            interner: ModuleInterner::new(),
            active_kind: AtomicU8::new(TXN_NONE),
            initialized: AtomicBool::new(false),
            journal: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn interner(&self) -> &ModuleInterner {
        &self.interner
    }

    fn shard_for(&self, key: &FileKey) -> &Shard {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    // ─── Read side ─────────────────────────────────────────────────────

    pub fn read(&self, key: &FileKey) -> Option<HeapEntry> {
        self.shard_for(key)
            .read()
            .expect("heap shard lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn get_file_addr(&self, key: &FileKey) -> Option<FileAddr> {
        self.read(key).map(|snapshot| FileAddr {
            key: key.clone(),
            snapshot,
        })
    }

    pub fn get_file_hash(&self, key: &FileKey) -> Option<ContentHash> {
        self.read(key).map(|e| e.current.hash)
    }

    pub fn get_old_file_hash(&self, key: &FileKey) -> Option<ContentHash> {
        self.read(key).map(|e| e.old.hash)
    }

    /// True when the current slot holds a parsed artifact.
    pub fn has_ast(&self, key: &FileKey) -> bool {
        self.read(key)
            .is_some_and(|e| matches!(e.current.state, FileState::Parsed(_)))
    }

    pub fn entry_count(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().expect("heap shard lock poisoned").len())
            .sum()
    }

    /// Full copy of the store. Intended for tests and diagnostics.
    pub fn snapshot(&self) -> FxHashMap<FileKey, HeapEntry> {
        let mut out = FxHashMap::default();
        for shard in self.shards.iter() {
            let guard = shard.read().expect("heap shard lock poisoned");
            for (k, v) in guard.iter() {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }

    // ─── Transaction state ─────────────────────────────────────────────

    fn active(&self) -> u8 {
        self.active_kind.load(Ordering::Acquire)
    }

    pub fn in_transaction(&self) -> bool {
        self.active() != TXN_NONE
    }

    /// True during the cold-start transaction. Read by the reducer to
    /// suppress duplicate work when a key was already parsed this scan.
    pub fn is_init_transaction(&self) -> bool {
        self.active() == TXN_INIT
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn kind_to_u8(kind: TransactionKind) -> u8 {
        match kind {
            TransactionKind::Init => TXN_INIT,
            TransactionKind::Update => TXN_UPDATE,
            TransactionKind::Reparse => TXN_REPARSE,
        }
    }

    /// Open a transaction. The scope is process-wide: at most one at a time.
    pub fn begin(&self, kind: TransactionKind) -> Result<Transaction<'_>, HeapError> {
        self.active_kind
            .compare_exchange(
                TXN_NONE,
                Self::kind_to_u8(kind),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| HeapError::TransactionActive)?;
        tracing::debug!(?kind, "heap transaction opened");
        Ok(Transaction::new(self, kind))
    }

    /// Open the transaction kind appropriate for a direct (parse) run:
    /// `Init` until the first transaction commits, `Update` after.
    pub fn begin_parse(&self) -> Result<Transaction<'_>, HeapError> {
        let kind = if self.is_initialized() {
            TransactionKind::Update
        } else {
            TransactionKind::Init
        };
        self.begin(kind)
    }

    pub fn begin_reparse(&self) -> Result<Transaction<'_>, HeapError> {
        self.begin(TransactionKind::Reparse)
    }

    pub(crate) fn commit(&self, kind: TransactionKind) {
        if kind == TransactionKind::Reparse {
            let touched = {
                let mut journal = self.journal.lock().expect("heap journal lock poisoned");
                std::mem::take(&mut *journal)
            };
            // Advance generations for every touched key.
            for key in touched.keys() {
                let mut shard = self
                    .shard_for(key)
                    .write()
                    .expect("heap shard lock poisoned");
                if let Some(entry) = shard.get_mut(key) {
                    entry.old = entry.current.clone();
                }
            }
            tracing::debug!(touched = touched.len(), "reparse transaction committed");
        }
        self.initialized.store(true, Ordering::Release);
        self.active_kind.store(TXN_NONE, Ordering::Release);
    }

    pub(crate) fn rollback(&self, kind: TransactionKind) {
        if kind == TransactionKind::Reparse {
            let touched = {
                let mut journal = self.journal.lock().expect("heap journal lock poisoned");
                std::mem::take(&mut *journal)
            };
            for (key, prev) in touched {
                let mut shard = self
                    .shard_for(&key)
                    .write()
                    .expect("heap shard lock poisoned");
                match prev {
                    Some(entry) => {
                        shard.insert(key, entry);
                    }
                    None => {
                        shard.remove(&key);
                    }
                }
            }
        }
        tracing::debug!(?kind, "heap transaction rolled back");
        self.active_kind.store(TXN_NONE, Ordering::Release);
    }

    // ─── Write side ────────────────────────────────────────────────────

    /// Write the current slot for a key. Under a reparse transaction the
    /// previous current is stashed into the old slot and the pre-write
    /// entry is journaled; direct transactions overwrite in place.
    pub(crate) fn write_slot(&self, key: &FileKey, slot: Slot) {
        let reparse = self.active() == TXN_REPARSE;
        let mut shard = self.shard_for(key).write().expect("heap shard lock poisoned");
        let prev = shard.get(key).cloned();
        if reparse {
            self.journal_first_touch(key, prev.clone());
        }
        let entry = match prev {
            None => HeapEntry::fresh(slot),
            Some(mut e) => {
                if reparse {
                    e.old = e.current.clone();
                }
                e.current = slot;
                e
            }
        };
        shard.insert(key.clone(), entry);
    }

    /// Advance a key's old slot to its current slot (generation catch-up
    /// for files classified unchanged).
    pub(crate) fn advance_old(&self, key: &FileKey) {
        let reparse = self.active() == TXN_REPARSE;
        let mut shard = self.shard_for(key).write().expect("heap shard lock poisoned");
        if let Some(entry) = shard.get_mut(key) {
            if reparse {
                self.journal_first_touch(key, Some(entry.clone()));
            }
            entry.old = entry.current.clone();
        }
    }

    pub(crate) fn intern_module(&self, name: &str) -> ModuleId {
        self.interner.intern(name)
    }

    fn journal_first_touch(&self, key: &FileKey, prev: Option<HeapEntry>) {
        let mut journal = self.journal.lock().expect("heap journal lock poisoned");
        journal.entry(key.clone()).or_insert(prev);
    }
}

impl Default for FileHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FileHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHeap")
            .field("entries", &self.entry_count())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
