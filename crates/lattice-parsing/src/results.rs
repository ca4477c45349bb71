//! The results aggregate returned to the caller, and its merge.
//!
//! Each file key lands in exactly one bucket. `failed` and `package_json`
//! are pairs of parallel lists so merging is two concatenations; only pair
//! alignment is guaranteed, not global order.

use lattice_core::types::artifacts::PackageJsonError;
use lattice_core::types::interning::ModuleId;
use lattice_core::{FileKey, FxHashSet};

use crate::docblock::DocblockError;
use crate::parser::SyntaxError;
use crate::pipeline::CapturedPanic;

/// Why a file landed in `failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    Uncaught(CapturedPanic),
    DocblockErrors(Vec<DocblockError>),
    ParseError(SyntaxError),
}

/// Aggregate outcome of a parse, reparse, or ensure-parsed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    pub parsed: FxHashSet<FileKey>,
    pub unparsed: FxHashSet<FileKey>,
    pub changed: FxHashSet<FileKey>,
    pub unchanged: FxHashSet<FileKey>,
    pub not_found: FxHashSet<FileKey>,
    /// Parallel lists: keys and their failure reasons, element-aligned.
    pub failed: (Vec<FileKey>, Vec<ParseFailure>),
    /// Parallel lists: package.json keys and their errors (`None` =
    /// success), element-aligned.
    pub package_json: (Vec<FileKey>, Vec<Option<PackageJsonError>>),
    /// Modules whose heap state was written by any path taken.
    pub dirty_modules: FxHashSet<ModuleId>,
}

impl Results {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Associative, commutative combine — up to ordering inside the two
    /// parallel-list pairs, whose pairwise alignment is preserved.
    pub fn merge(mut a: Results, b: Results) -> Results {
        a.parsed.extend(b.parsed);
        a.unparsed.extend(b.unparsed);
        a.changed.extend(b.changed);
        a.unchanged.extend(b.unchanged);
        a.not_found.extend(b.not_found);
        a.failed.0.extend(b.failed.0);
        a.failed.1.extend(b.failed.1);
        a.package_json.0.extend(b.package_json.0);
        a.package_json.1.extend(b.package_json.1);
        a.dirty_modules.extend(b.dirty_modules);
        a
    }

    /// Total number of files accounted across all buckets.
    pub fn file_count(&self) -> usize {
        self.parsed.len()
            + self.unparsed.len()
            + self.changed.len()
            + self.unchanged.len()
            + self.not_found.len()
            + self.failed.0.len()
            + self.package_json.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn key(name: &str) -> FileKey {
        FileKey::Source(PathBuf::from(name))
    }

    #[test]
    fn merge_unions_sets_and_concatenates_pairs() {
        let mut a = Results::empty();
        a.parsed.insert(key("a.js"));
        a.failed.0.push(key("bad.js"));
        a.failed
            .1
            .push(ParseFailure::DocblockErrors(vec![
                DocblockError::MultipleFlowAttributes,
            ]));

        let mut b = Results::empty();
        b.parsed.insert(key("b.js"));
        b.unchanged.insert(key("c.js"));

        let merged = Results::merge(a, b);
        assert_eq!(merged.parsed.len(), 2);
        assert_eq!(merged.unchanged.len(), 1);
        assert_eq!(merged.failed.0.len(), merged.failed.1.len());
        assert_eq!(merged.file_count(), 4);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let mut a = Results::empty();
        a.parsed.insert(key("a.js"));
        a.package_json.0.push(FileKey::Json(PathBuf::from("package.json")));
        a.package_json.1.push(None);

        let merged = Results::merge(a.clone(), Results::empty());
        assert_eq!(merged, a);
        let merged = Results::merge(Results::empty(), a.clone());
        assert_eq!(merged, a);
    }
}
