//! Typed mutator facades over the heap.
//!
//! Two flavors share one contract: the parse mutator writes directly and is
//! not rollback-safe; the reparse mutator is scoped under a journaled
//! transaction. The flavor is fixed by the transaction that minted it — the
//! write path itself consults the active transaction kind.

use std::sync::Arc;

use lattice_core::types::artifacts::{PackageInfo, PackageJsonError, ParsedFile};
use lattice_core::{ContentHash, FileKey, FxHashSet, ModuleId};

use crate::entry::{FileAddr, FileState, Slot};
use crate::store::FileHeap;

/// Module identifiers touched by a batch of heap writes.
pub type DirtyModules = FxHashSet<ModuleId>;

/// The operations a reducer performs against the heap.
///
/// Every write takes the file key, the previously captured entry handle,
/// the content hash, and the resolved module, and returns the modules made
/// dirty by that write.
pub trait HeapMutator: Sync {
    fn heap(&self) -> &FileHeap;

    // ── Read side ──

    fn get_file_addr(&self, key: &FileKey) -> Option<FileAddr> {
        self.heap().get_file_addr(key)
    }

    /// Current-slot parsed artifact behind a handle, if any.
    fn get_parse<'a>(&self, addr: Option<&'a FileAddr>) -> Option<&'a Arc<ParsedFile>> {
        addr.and_then(FileAddr::parse)
    }

    fn get_file_hash(&self, key: &FileKey) -> Option<ContentHash> {
        self.heap().get_file_hash(key)
    }

    fn get_old_file_hash(&self, key: &FileKey) -> Option<ContentHash> {
        self.heap().get_old_file_hash(key)
    }

    fn has_ast(&self, key: &FileKey) -> bool {
        self.heap().has_ast(key)
    }

    fn is_init_transaction(&self) -> bool {
        self.heap().is_init_transaction()
    }

    fn intern_module(&self, name: &str) -> ModuleId {
        self.heap().intern_module(name)
    }

    // ── Write side ──

    fn add_parsed(
        &self,
        key: &FileKey,
        prev: Option<&FileAddr>,
        hash: ContentHash,
        module: Option<ModuleId>,
        data: Arc<ParsedFile>,
    ) -> DirtyModules {
        record(self.heap(), key, prev, hash, module, FileState::Parsed(data))
    }

    fn add_unparsed(
        &self,
        key: &FileKey,
        prev: Option<&FileAddr>,
        hash: ContentHash,
        module: Option<ModuleId>,
    ) -> DirtyModules {
        record(self.heap(), key, prev, hash, module, FileState::Unparsed)
    }

    fn add_package(
        &self,
        key: &FileKey,
        prev: Option<&FileAddr>,
        hash: ContentHash,
        module: Option<ModuleId>,
        package: Result<PackageInfo, PackageJsonError>,
    ) -> DirtyModules {
        record(
            self.heap(),
            key,
            prev,
            hash,
            module,
            FileState::Package(package),
        )
    }

    /// Record that the file is gone. The current slot becomes `NotFound`.
    fn clear_not_found(
        &self,
        key: &FileKey,
        prev: Option<&FileAddr>,
        module: Option<ModuleId>,
    ) -> DirtyModules {
        record(
            self.heap(),
            key,
            prev,
            ContentHash::default(),
            module,
            FileState::NotFound,
        )
    }
}

fn record(
    heap: &FileHeap,
    key: &FileKey,
    prev: Option<&FileAddr>,
    hash: ContentHash,
    module: Option<ModuleId>,
    state: FileState,
) -> DirtyModules {
    let mut dirty = DirtyModules::default();
    if let Some(m) = module {
        dirty.insert(m);
    }
    // A provider change dirties the module the file used to provide.
    if let Some(prev_module) = prev.and_then(FileAddr::current_module) {
        if Some(prev_module) != module {
            dirty.insert(prev_module);
        }
    }
    heap.write_slot(
        key,
        Slot {
            state,
            hash,
            module,
        },
    );
    dirty
}

/// Direct-write mutator used by cold and ensure-parsed scans.
pub struct ParseMutator<'h> {
    heap: &'h FileHeap,
}

impl<'h> ParseMutator<'h> {
    pub(crate) fn new(heap: &'h FileHeap) -> Self {
        Self { heap }
    }
}

impl HeapMutator for ParseMutator<'_> {
    fn heap(&self) -> &FileHeap {
        self.heap
    }
}

/// Journaled mutator used by reparse transactions.
pub struct ReparseMutator<'h> {
    heap: &'h FileHeap,
}

impl<'h> ReparseMutator<'h> {
    pub(crate) fn new(heap: &'h FileHeap) -> Self {
        Self { heap }
    }
}

impl HeapMutator for ReparseMutator<'_> {
    fn heap(&self) -> &FileHeap {
        self.heap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionKind;
    use lattice_core::types::artifacts::{Exports, FileSig, Imports, TypeSig};
    use std::path::PathBuf;

    fn parsed_file() -> Arc<ParsedFile> {
        Arc::new(ParsedFile {
            requires: vec!["react".to_string()],
            file_sig: FileSig::default(),
            exports: Exports::default(),
            imports: Imports::default(),
            type_sig: TypeSig::default(),
            tolerable_errors: Vec::new(),
            cas_digest: None,
        })
    }

    fn key(name: &str) -> FileKey {
        FileKey::Source(PathBuf::from(name))
    }

    #[test]
    fn add_parsed_records_current_slot() {
        let heap = FileHeap::new();
        let txn = heap.begin(TransactionKind::Init).unwrap();
        let m = txn.parse_mutator();
        let module = Some(heap.interner().intern("a"));
        let dirty = m.add_parsed(&key("a.js"), None, ContentHash(7), module, parsed_file());
        assert_eq!(dirty.len(), 1);
        txn.commit();

        assert!(heap.has_ast(&key("a.js")));
        assert_eq!(heap.get_file_hash(&key("a.js")), Some(ContentHash(7)));
        assert_eq!(heap.get_old_file_hash(&key("a.js")), Some(ContentHash(7)));
    }

    #[test]
    fn provider_change_dirties_both_modules() {
        let heap = FileHeap::new();
        let txn = heap.begin(TransactionKind::Init).unwrap();
        let m = txn.parse_mutator();
        let k = key("a.js");
        let before = heap.interner().intern("Before");
        let after = heap.interner().intern("After");
        m.add_parsed(&k, None, ContentHash(1), Some(before), parsed_file());
        let addr = m.get_file_addr(&k);
        let dirty = m.add_parsed(&k, addr.as_ref(), ContentHash(2), Some(after), parsed_file());
        assert!(dirty.contains(&before));
        assert!(dirty.contains(&after));
        txn.commit();
    }

    #[test]
    fn reparse_write_preserves_old_generation() {
        let heap = FileHeap::new();
        let k = key("a.js");
        {
            let txn = heap.begin(TransactionKind::Init).unwrap();
            txn.parse_mutator()
                .add_parsed(&k, None, ContentHash(1), None, parsed_file());
            txn.commit();
        }
        {
            let txn = heap.begin_reparse().unwrap();
            txn.reparse_mutator()
                .add_unparsed(&k, None, ContentHash(2), None);
            // Mid-transaction: new current, previous generation in old.
            assert_eq!(heap.get_file_hash(&k), Some(ContentHash(2)));
            assert_eq!(heap.get_old_file_hash(&k), Some(ContentHash(1)));
            txn.commit();
        }
        // Commit advanced the generation.
        assert_eq!(heap.get_old_file_hash(&k), Some(ContentHash(2)));
    }

    #[test]
    fn dropped_reparse_transaction_rolls_back() {
        let heap = FileHeap::new();
        let k = key("a.js");
        {
            let txn = heap.begin(TransactionKind::Init).unwrap();
            txn.parse_mutator()
                .add_parsed(&k, None, ContentHash(1), None, parsed_file());
            txn.commit();
        }
        let before = heap.snapshot();
        {
            let txn = heap.begin_reparse().unwrap();
            txn.reparse_mutator()
                .add_unparsed(&k, None, ContentHash(2), None);
        }
        assert_eq!(heap.snapshot(), before);
    }

    #[test]
    fn only_one_transaction_at_a_time() {
        let heap = FileHeap::new();
        let txn = heap.begin(TransactionKind::Init).unwrap();
        assert!(heap.begin_reparse().is_err());
        txn.commit();
        assert!(heap.begin_reparse().is_ok());
    }

    #[test]
    fn record_not_found_forces_not_found_state() {
        let heap = FileHeap::new();
        let k = key("gone.js");
        {
            let txn = heap.begin(TransactionKind::Init).unwrap();
            txn.parse_mutator()
                .add_parsed(&k, None, ContentHash(1), None, parsed_file());
            txn.commit();
        }
        let txn = heap.begin_reparse().unwrap();
        let mut gone = FxHashSet::default();
        gone.insert(k.clone());
        txn.record_not_found(&gone);
        txn.commit();
        assert!(!heap.has_ast(&k));
        assert!(matches!(
            heap.read(&k).unwrap().current.state,
            FileState::NotFound
        ));
    }
}
