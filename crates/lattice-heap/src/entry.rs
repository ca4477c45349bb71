//! Heap entries: two-slot generational records, one per file key.

use std::sync::Arc;

use lattice_core::types::artifacts::{PackageInfo, PackageJsonError, ParsedFile};
use lattice_core::types::interning::ModuleId;
use lattice_core::{ContentHash, FileKey};

/// Per-generation state of a file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileState {
    Parsed(Arc<ParsedFile>),
    Unparsed,
    Package(Result<PackageInfo, PackageJsonError>),
    NotFound,
}

/// One generation slot: the file's state, the content hash it was derived
/// from, and the module the file provided at that generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub state: FileState,
    pub hash: ContentHash,
    pub module: Option<ModuleId>,
}

impl Slot {
    pub fn not_found() -> Self {
        Self {
            state: FileState::NotFound,
            hash: ContentHash::default(),
            module: None,
        }
    }
}

/// Heap record: current and old generation slots. On first creation the
/// old slot mirrors the current one.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapEntry {
    pub current: Slot,
    pub old: Slot,
}

impl HeapEntry {
    pub fn fresh(slot: Slot) -> Self {
        Self {
            current: slot.clone(),
            old: slot,
        }
    }
}

/// Opaque handle to a file's heap record, captured at read time.
///
/// The input file set hands each key to exactly one worker, so the snapshot
/// is authoritative for the duration of that worker's reduce step.
#[derive(Debug, Clone)]
pub struct FileAddr {
    pub(crate) key: FileKey,
    pub(crate) snapshot: HeapEntry,
}

impl FileAddr {
    pub fn key(&self) -> &FileKey {
        &self.key
    }

    /// The current slot's parsed artifact, if any.
    pub fn parse(&self) -> Option<&Arc<ParsedFile>> {
        match &self.snapshot.current.state {
            FileState::Parsed(data) => Some(data),
            _ => None,
        }
    }

    /// The module the file provided at the snapshot's current generation.
    pub fn current_module(&self) -> Option<ModuleId> {
        self.snapshot.current.module
    }
}
