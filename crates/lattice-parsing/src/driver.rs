//! User-facing entry points: `parse` (cold), `reparse` (incremental under
//! a journaled transaction), and `ensure_parsed` (two-phase filter +
//! hash-guarded parse). The driver owns the transaction; workers observe
//! it through their mutator handles.

use std::time::Instant;

use lattice_core::config::parsing_options::compile_patterns;
use lattice_core::errors::{HeapError, OptionsError};
use lattice_core::{FileKey, FxHashSet, GlobalOptions, ParseOptionOverrides, ParsingOptions};
use lattice_heap::{FileHeap, HeapMutator};

use crate::dispatch::{self, ProgressFn, WorkerPool};
use crate::parser::{SourceParser, TreeSitterParser};
use crate::pipeline::{EmitAlways, PanicLogger};
use crate::reducer::{reduce, DefaultModuleNamer, ModuleNamer, ParseEnv};
use crate::remote::{BlobStore, InMemoryBlobStore};
use crate::results::Results;

/// Errors surfaced by the driver entry points. Per-file failures never land
/// here — they are carried in `Results`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Options error: {0}")]
    Options(#[from] OptionsError),

    #[error("Heap error: {0}")]
    Heap(#[from] HeapError),
}

/// Injected collaborators for a run.
pub struct ServiceHooks<'a> {
    pub parser: &'a dyn SourceParser,
    pub blob_store: &'a dyn BlobStore,
    pub module_namer: &'a dyn ModuleNamer,
    pub panic_logger: &'a dyn PanicLogger,
}

/// Owns the default collaborator set; `hooks()` borrows it as
/// [`ServiceHooks`].
pub struct DefaultHooks {
    parser: TreeSitterParser,
    blob_store: InMemoryBlobStore,
    module_namer: DefaultModuleNamer,
    panic_logger: EmitAlways,
}

impl DefaultHooks {
    pub fn new() -> Self {
        Self {
            parser: TreeSitterParser,
            blob_store: InMemoryBlobStore::new(),
            module_namer: DefaultModuleNamer,
            panic_logger: EmitAlways,
        }
    }

    pub fn hooks(&self) -> ServiceHooks<'_> {
        ServiceHooks {
            parser: &self.parser,
            blob_store: &self.blob_store,
            module_namer: &self.module_namer,
            panic_logger: &self.panic_logger,
        }
    }
}

impl Default for DefaultHooks {
    fn default() -> Self {
        Self::new()
    }
}

struct SkipSemantics {
    skip_changed: bool,
    skip_unchanged: bool,
}

/// Cold parse: every file in the set is read, hashed, and parsed. Uses the
/// direct-write mutator; during the first transaction ever, keys already
/// parsed this scan are skipped (idempotence).
pub fn parse(
    pool: &WorkerPool,
    heap: &FileHeap,
    global: &GlobalOptions,
    overrides: ParseOptionOverrides,
    hooks: &ServiceHooks<'_>,
    files: Vec<FileKey>,
    progress: Option<&ProgressFn<'_>>,
) -> Result<Results, ServiceError> {
    let start = Instant::now();
    let results = run_direct(
        pool,
        heap,
        global,
        overrides,
        hooks,
        files,
        progress,
        SkipSemantics {
            skip_changed: false,
            skip_unchanged: false,
        },
    )?;
    if global.profile {
        tracing::info!(
            parsed = results.parsed.len(),
            unparsed = results.unparsed.len(),
            changed = results.changed.len(),
            unchanged = results.unchanged.len(),
            not_found = results.not_found.len(),
            package_json = results.package_json.0.len(),
            failed = results.failed.0.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "parse finished"
        );
    }
    Ok(results)
}

/// Incremental reparse: unchanged files (old-generation hash match) are
/// skipped; the rest re-parse under a journaled transaction. The final
/// classification is projected back onto the heap before commit.
pub fn reparse(
    pool: &WorkerPool,
    heap: &FileHeap,
    global: &GlobalOptions,
    overrides: ParseOptionOverrides,
    hooks: &ServiceHooks<'_>,
    files: Vec<FileKey>,
    progress: Option<&ProgressFn<'_>>,
) -> Result<Results, ServiceError> {
    let options = ParsingOptions::resolve(global, overrides)?;
    let noflow = noflow_predicate(global)?;

    let txn = heap.begin_reparse()?;
    let mutator = txn.reparse_mutator();
    let env = ParseEnv {
        options: &options,
        parser: hooks.parser,
        blob_store: hooks.blob_store,
        module_namer: hooks.module_namer,
        panic_logger: hooks.panic_logger,
        noflow: &noflow,
        skip_changed: false,
        skip_unchanged: true,
    };
    let results = run_fold(pool, &env, &mutator, files, progress);

    txn.record_unchanged(&results.unchanged);
    txn.record_not_found(&results.not_found);
    txn.commit();
    Ok(results)
}

/// Two-phase ensure-parsed: a worker-parallel filter keeps only files with
/// no AST in the heap, then a hash-guarded parse runs over them. Returns
/// the files the caller must deal with: changed on disk or gone.
pub fn ensure_parsed(
    pool: &WorkerPool,
    heap: &FileHeap,
    global: &GlobalOptions,
    overrides: ParseOptionOverrides,
    hooks: &ServiceHooks<'_>,
    files: Vec<FileKey>,
    progress: Option<&ProgressFn<'_>>,
) -> Result<FxHashSet<FileKey>, ServiceError> {
    let source = dispatch::next(pool, files);
    let missing = dispatch::fold(
        pool,
        &source,
        Vec::new,
        |mut acc: Vec<FileKey>, key: &FileKey| {
            if !heap.has_ast(key) {
                acc.push(key.clone());
            }
            acc
        },
        |mut a, mut b| {
            a.append(&mut b);
            a
        },
        None,
    );

    let results = run_direct(
        pool,
        heap,
        global,
        overrides,
        hooks,
        missing,
        progress,
        SkipSemantics {
            skip_changed: true,
            skip_unchanged: false,
        },
    )?;

    let mut out = results.changed;
    out.extend(results.not_found);
    Ok(out)
}

fn run_direct(
    pool: &WorkerPool,
    heap: &FileHeap,
    global: &GlobalOptions,
    overrides: ParseOptionOverrides,
    hooks: &ServiceHooks<'_>,
    files: Vec<FileKey>,
    progress: Option<&ProgressFn<'_>>,
    skip: SkipSemantics,
) -> Result<Results, ServiceError> {
    let options = ParsingOptions::resolve(global, overrides)?;
    let noflow = noflow_predicate(global)?;

    let txn = heap.begin_parse()?;
    let mutator = txn.parse_mutator();
    let env = ParseEnv {
        options: &options,
        parser: hooks.parser,
        blob_store: hooks.blob_store,
        module_namer: hooks.module_namer,
        panic_logger: hooks.panic_logger,
        noflow: &noflow,
        skip_changed: skip.skip_changed,
        skip_unchanged: skip.skip_unchanged,
    };
    let results = run_fold(pool, &env, &mutator, files, progress);
    txn.commit();
    Ok(results)
}

fn run_fold<M: HeapMutator>(
    pool: &WorkerPool,
    env: &ParseEnv<'_>,
    mutator: &M,
    files: Vec<FileKey>,
    progress: Option<&ProgressFn<'_>>,
) -> Results {
    let source = dispatch::next(pool, files);
    dispatch::fold(
        pool,
        &source,
        Results::empty,
        |acc, key| reduce(env, mutator, acc, key),
        Results::merge,
        progress,
    )
}

fn noflow_predicate(
    global: &GlobalOptions,
) -> Result<impl Fn(&FileKey) -> bool + Sync, OptionsError> {
    let untyped = compile_patterns(&global.untyped_paths)?;
    Ok(move |key: &FileKey| {
        let path = key.path().to_string_lossy();
        untyped.iter().any(|re| re.is_match(&path))
    })
}
