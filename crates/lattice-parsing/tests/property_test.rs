//! Property-based tests: invariants that must hold for any input, not just
//! hand-crafted cases.

use std::fs;
use std::path::PathBuf;

use lattice_core::{FileKey, FxHashSet, GlobalOptions, ParseOptionOverrides};
use lattice_heap::FileHeap;
use lattice_parsing::driver::DefaultHooks;
use lattice_parsing::hash::hash_bytes;
use lattice_parsing::results::{ParseFailure, Results};
use lattice_parsing::{parse, reparse, WorkerPool};
use proptest::prelude::*;
use tempfile::TempDir;

// ─── Helpers ───────────────────────────────────────────────────────────────

fn key(name: &str) -> FileKey {
    FileKey::Source(PathBuf::from(name))
}

fn docblock_failure() -> ParseFailure {
    ParseFailure::DocblockErrors(vec![
        lattice_parsing::docblock::DocblockError::MultipleFlowAttributes,
    ])
}

/// Build a `Results` whose buckets are filled from disjoint name ranges.
fn results_from_shape(prefix: &str, shape: &ResultsShape) -> Results {
    let bucket_key = |bucket: &str, i: usize| key(&format!("{prefix}/{bucket}/{i}.js"));
    let mut r = Results::empty();
    for i in 0..shape.parsed {
        r.parsed.insert(bucket_key("parsed", i));
    }
    for i in 0..shape.unparsed {
        r.unparsed.insert(bucket_key("unparsed", i));
    }
    for i in 0..shape.changed {
        r.changed.insert(bucket_key("changed", i));
    }
    for i in 0..shape.unchanged {
        r.unchanged.insert(bucket_key("unchanged", i));
    }
    for i in 0..shape.not_found {
        r.not_found.insert(bucket_key("not_found", i));
    }
    for i in 0..shape.failed {
        r.failed.0.push(bucket_key("failed", i));
        r.failed.1.push(docblock_failure());
    }
    for i in 0..shape.packages {
        r.package_json.0.push(FileKey::Json(PathBuf::from(format!(
            "{prefix}/pkg/{i}/package.json"
        ))));
        r.package_json.1.push(None);
    }
    r
}

#[derive(Debug, Clone)]
struct ResultsShape {
    parsed: usize,
    unparsed: usize,
    changed: usize,
    unchanged: usize,
    not_found: usize,
    failed: usize,
    packages: usize,
}

fn results_shape() -> impl Strategy<Value = ResultsShape> {
    (0..4usize, 0..4usize, 0..4usize, 0..4usize, 0..4usize, 0..4usize, 0..4usize).prop_map(
        |(parsed, unparsed, changed, unchanged, not_found, failed, packages)| ResultsShape {
            parsed,
            unparsed,
            changed,
            unchanged,
            not_found,
            failed,
            packages,
        },
    )
}

/// Pair lists as a canonically ordered vector, for order-insensitive
/// comparison that still checks pairwise alignment.
fn canonical_failed(r: &Results) -> Vec<(FileKey, String)> {
    let mut pairs: Vec<_> = r
        .failed
        .0
        .iter()
        .cloned()
        .zip(r.failed.1.iter().map(|f| format!("{f:?}")))
        .collect();
    pairs.sort();
    pairs
}

fn canonical_packages(r: &Results) -> Vec<(FileKey, Option<String>)> {
    let mut pairs: Vec<_> = r
        .package_json
        .0
        .iter()
        .cloned()
        .zip(
            r.package_json
                .1
                .iter()
                .map(|e| e.as_ref().map(|e| e.message.clone())),
        )
        .collect();
    pairs.sort();
    pairs
}

// ═══════════════════════════════════════════════════════════════════════════
// HASH DETERMINISM
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// For any byte string s, hash(s) = hash(s).
    #[test]
    fn hash_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..2048)) {
        prop_assert_eq!(hash_bytes(&bytes), hash_bytes(&bytes));
    }

    /// Streaming over any chunking equals the one-shot digest.
    #[test]
    fn hash_is_chunking_independent(
        bytes in proptest::collection::vec(any::<u8>(), 0..2048),
        split in 0..2048usize,
    ) {
        let split = split.min(bytes.len());
        let mut hasher = lattice_parsing::hash::ContentHasher::new();
        hasher.update(&bytes[..split]);
        hasher.update(&bytes[split..]);
        prop_assert_eq!(hasher.digest(), hash_bytes(&bytes));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MERGE ALGEBRA
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// merge(a, merge(b, c)) == merge(merge(a, b), c), exactly.
    #[test]
    fn merge_is_associative(
        a in results_shape(),
        b in results_shape(),
        c in results_shape(),
    ) {
        let (a, b, c) = (
            results_from_shape("a", &a),
            results_from_shape("b", &b),
            results_from_shape("c", &c),
        );
        let left = Results::merge(a.clone(), Results::merge(b.clone(), c.clone()));
        let right = Results::merge(Results::merge(a, b), c);
        prop_assert_eq!(left, right);
    }

    /// merge(a, b) == merge(b, a) up to ordering inside the parallel-list
    /// pairs; pairwise alignment is preserved.
    #[test]
    fn merge_is_commutative_up_to_pair_order(
        a in results_shape(),
        b in results_shape(),
    ) {
        let (a, b) = (results_from_shape("a", &a), results_from_shape("b", &b));
        let ab = Results::merge(a.clone(), b.clone());
        let ba = Results::merge(b, a);

        prop_assert_eq!(&ab.parsed, &ba.parsed);
        prop_assert_eq!(&ab.unparsed, &ba.unparsed);
        prop_assert_eq!(&ab.changed, &ba.changed);
        prop_assert_eq!(&ab.unchanged, &ba.unchanged);
        prop_assert_eq!(&ab.not_found, &ba.not_found);
        prop_assert_eq!(&ab.dirty_modules, &ba.dirty_modules);
        prop_assert_eq!(canonical_failed(&ab), canonical_failed(&ba));
        prop_assert_eq!(canonical_packages(&ab), canonical_packages(&ba));
    }

    /// The empty value is a merge identity.
    #[test]
    fn empty_is_a_merge_identity(shape in results_shape()) {
        let r = results_from_shape("r", &shape);
        prop_assert_eq!(Results::merge(r.clone(), Results::empty()), r.clone());
        prop_assert_eq!(Results::merge(Results::empty(), r.clone()), r);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PARTITION AND INCREMENTAL CORRECTNESS (end-to-end)
// ═══════════════════════════════════════════════════════════════════════════

/// Shapes of generated input files.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FileShape {
    Checked,
    Unannotated,
    BrokenSyntax,
    DuplicatePragma,
    PackageJson,
    BadPackageJson,
    Resource,
    Missing,
}

fn file_shape() -> impl Strategy<Value = FileShape> {
    prop_oneof![
        Just(FileShape::Checked),
        Just(FileShape::Unannotated),
        Just(FileShape::BrokenSyntax),
        Just(FileShape::DuplicatePragma),
        Just(FileShape::PackageJson),
        Just(FileShape::BadPackageJson),
        Just(FileShape::Resource),
        Just(FileShape::Missing),
    ]
}

fn materialize(dir: &TempDir, index: usize, shape: FileShape) -> FileKey {
    let (name, content): (String, Option<&str>) = match shape {
        FileShape::Checked => (
            format!("f{index}.js"),
            Some("// @flow\nexport const x = 1;\n"),
        ),
        FileShape::Unannotated => (format!("f{index}.js"), Some("export const x = 1;\n")),
        FileShape::BrokenSyntax => (format!("f{index}.js"), Some("// @flow\nconst = ;\n")),
        FileShape::DuplicatePragma => (
            format!("f{index}.js"),
            Some("// @flow\n// @noflow\nconst x = 1;\n"),
        ),
        FileShape::PackageJson => (
            format!("p{index}/package.json"),
            Some(r#"{"main": "./index.js"}"#),
        ),
        FileShape::BadPackageJson => (format!("p{index}/package.json"), Some("{")),
        FileShape::Resource => (format!("f{index}.css"), Some("body { color: red }")),
        FileShape::Missing => (format!("f{index}.js"), None),
    };
    let path = dir.path().join(&name);
    if let Some(content) = content {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, content).expect("write");
    }
    match shape {
        FileShape::PackageJson | FileShape::BadPackageJson => FileKey::Json(path),
        FileShape::Resource => FileKey::Resource(path),
        _ => FileKey::Source(path),
    }
}

fn buckets_containing(results: &Results, key: &FileKey) -> Vec<&'static str> {
    let mut found = Vec::new();
    if results.parsed.contains(key) {
        found.push("parsed");
    }
    if results.unparsed.contains(key) {
        found.push("unparsed");
    }
    if results.changed.contains(key) {
        found.push("changed");
    }
    if results.unchanged.contains(key) {
        found.push("unchanged");
    }
    if results.not_found.contains(key) {
        found.push("not_found");
    }
    if results.failed.0.contains(key) {
        found.push("failed");
    }
    if results.package_json.0.contains(key) {
        found.push("package_json");
    }
    found
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Every input key lands in exactly one outcome bucket.
    #[test]
    fn parse_partitions_the_input(shapes in proptest::collection::vec(file_shape(), 1..10)) {
        let dir = TempDir::new().expect("tempdir");
        let pool = WorkerPool::new(2).expect("worker pool");
        let heap = FileHeap::new();
        let hooks = DefaultHooks::new();
        let global = GlobalOptions {
            node_main_fields: vec!["main".to_string()],
            ..Default::default()
        };

        let keys: Vec<FileKey> = shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| materialize(&dir, i, *shape))
            .collect();

        let results = parse(
            &pool,
            &heap,
            &global,
            ParseOptionOverrides::default(),
            &hooks.hooks(),
            keys.clone(),
            None,
        )
        .expect("parse");

        for key in &keys {
            let found = buckets_containing(&results, key);
            prop_assert_eq!(
                found.len(),
                1,
                "key {} in buckets {:?}",
                key,
                found
            );
        }
        prop_assert_eq!(results.file_count(), keys.len());
    }

    /// Idempotent reparse: with nothing changed on disk, every file is
    /// unchanged, every other bucket is empty, and the heap is identical.
    #[test]
    fn reparse_without_changes_is_idempotent(shapes in proptest::collection::vec(
        prop_oneof![
            Just(FileShape::Checked),
            Just(FileShape::Unannotated),
            Just(FileShape::PackageJson),
        ],
        1..8,
    )) {
        let dir = TempDir::new().expect("tempdir");
        let pool = WorkerPool::new(2).expect("worker pool");
        let heap = FileHeap::new();
        let hooks = DefaultHooks::new();
        let global = GlobalOptions {
            node_main_fields: vec!["main".to_string()],
            ..Default::default()
        };

        let keys: Vec<FileKey> = shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| materialize(&dir, i, *shape))
            .collect();

        parse(
            &pool,
            &heap,
            &global,
            ParseOptionOverrides::default(),
            &hooks.hooks(),
            keys.clone(),
            None,
        )
        .expect("parse");
        let before = heap.snapshot();

        let results = reparse(
            &pool,
            &heap,
            &global,
            ParseOptionOverrides::default(),
            &hooks.hooks(),
            keys.clone(),
            None,
        )
        .expect("reparse");

        let expected: FxHashSet<FileKey> = keys.iter().cloned().collect();
        prop_assert_eq!(&results.unchanged, &expected);
        prop_assert!(results.parsed.is_empty());
        prop_assert!(results.unparsed.is_empty());
        prop_assert!(results.changed.is_empty());
        prop_assert!(results.not_found.is_empty());
        prop_assert!(results.failed.0.is_empty());
        prop_assert!(results.package_json.0.is_empty());
        prop_assert_eq!(heap.snapshot(), before);
    }

    /// Incremental correctness: after modifying one file's bytes, reparse
    /// re-parses it iff its docblock passes the gate; it is never unchanged.
    #[test]
    fn reparse_after_modification_follows_the_gate(keep_pragma in any::<bool>()) {
        let dir = TempDir::new().expect("tempdir");
        let pool = WorkerPool::new(2).expect("worker pool");
        let heap = FileHeap::new();
        let hooks = DefaultHooks::new();
        let global = GlobalOptions::default();

        let key = materialize(&dir, 0, FileShape::Checked);
        parse(
            &pool,
            &heap,
            &global,
            ParseOptionOverrides::default(),
            &hooks.hooks(),
            vec![key.clone()],
            None,
        )
        .expect("parse");

        let new_content = if keep_pragma {
            "// @flow\nexport const x = 2;\n"
        } else {
            "export const x = 2;\n"
        };
        fs::write(key.path(), new_content).expect("rewrite");

        let results = reparse(
            &pool,
            &heap,
            &global,
            ParseOptionOverrides::default(),
            &hooks.hooks(),
            vec![key.clone()],
            None,
        )
        .expect("reparse");

        prop_assert!(!results.unchanged.contains(&key));
        prop_assert_eq!(results.parsed.contains(&key), keep_pragma);
        prop_assert_eq!(results.unparsed.contains(&key), !keep_pragma);
    }
}
