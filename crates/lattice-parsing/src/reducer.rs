//! The reducer: per-file glue from key → skip decision → pipeline outcome
//! → heap write → accumulator update. Runs inside a worker; one call per
//! key, sequential within a worker.

use std::sync::Arc;

use lattice_core::types::artifacts::{PackageInfo, ParsedFile};
use lattice_core::types::docblock::{Docblock, FlowPragma};
use lattice_core::{FileKey, ModuleId, ParsingOptions};
use lattice_heap::{DirtyModules, HeapMutator};

use crate::docblock::parse_docblock;
use crate::hash::hash_bytes;
use crate::parser::SourceParser;
use crate::pipeline::{parse_file, CapturedPanic, PanicLogger, ParseOutcome, ParseSkipReason};
use crate::remote::BlobStore;
use crate::results::{ParseFailure, Results};

/// Context handed to `exported_module`.
pub enum ModuleHint<'a> {
    Unknown,
    Module(&'a Docblock),
    Package(&'a PackageInfo),
}

/// Resolves the module a file provides. The result participates in every
/// heap write.
pub trait ModuleNamer: Sync {
    fn exported_module(&self, key: &FileKey, hint: ModuleHint<'_>) -> Option<String>;
}

/// Default naming: docblock `@providesModule` or package name when
/// available, else the file stem.
pub struct DefaultModuleNamer;

impl ModuleNamer for DefaultModuleNamer {
    fn exported_module(&self, key: &FileKey, hint: ModuleHint<'_>) -> Option<String> {
        match hint {
            ModuleHint::Module(docblock) => docblock
                .provides_module
                .clone()
                .or_else(|| file_stem(key)),
            ModuleHint::Package(pkg) => pkg.name.clone(),
            ModuleHint::Unknown => file_stem(key),
        }
    }
}

fn file_stem(key: &FileKey) -> Option<String> {
    key.path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
}

/// Injected collaborators plus the run's skip semantics.
pub struct ParseEnv<'a> {
    pub options: &'a ParsingOptions,
    pub parser: &'a dyn SourceParser,
    pub blob_store: &'a dyn BlobStore,
    pub module_namer: &'a dyn ModuleNamer,
    pub panic_logger: &'a dyn PanicLogger,
    /// Files for which the docblock is forced to `@noflow`.
    pub noflow: &'a (dyn Fn(&FileKey) -> bool + Sync),
    pub skip_changed: bool,
    pub skip_unchanged: bool,
}

impl ParseEnv<'_> {
    fn resolve_module<M: HeapMutator>(
        &self,
        mutator: &M,
        key: &FileKey,
        hint: ModuleHint<'_>,
    ) -> Option<ModuleId> {
        self.module_namer
            .exported_module(key, hint)
            .map(|name| mutator.intern_module(&name))
    }
}

/// Fold one file key into the accumulator.
pub fn reduce<M: HeapMutator>(
    env: &ParseEnv<'_>,
    mutator: &M,
    mut acc: Results,
    key: &FileKey,
) -> Results {
    let addr = mutator.get_file_addr(key);

    // Cold-start idempotence: a key already parsed this transaction is done.
    if mutator.is_init_transaction() && mutator.get_parse(addr.as_ref()).is_some() {
        return acc;
    }

    let bytes = match std::fs::read(key.path()) {
        Ok(bytes) => bytes,
        Err(error) => {
            let dirty = if env.skip_changed {
                DirtyModules::default()
            } else {
                tracing::warn!(file = %key, %error, "file unreadable; recording not-found");
                let module = env.resolve_module(mutator, key, ModuleHint::Unknown);
                mutator.clear_not_found(key, addr.as_ref(), module)
            };
            acc.not_found.insert(key.clone());
            acc.dirty_modules.extend(dirty);
            return acc;
        }
    };

    let hash = hash_bytes(&bytes);

    if env.skip_changed && mutator.get_file_hash(key) != Some(hash) {
        tracing::debug!(file = %key, "changed on disk; deferring");
        acc.changed.insert(key.clone());
        return acc;
    }
    if env.skip_unchanged && mutator.get_old_file_hash(key) == Some(hash) {
        tracing::debug!(file = %key, "unchanged since last generation; skipping");
        acc.unchanged.insert(key.clone());
        return acc;
    }

    let content = String::from_utf8_lossy(&bytes);
    let (docblock_errors, mut docblock) =
        parse_docblock(&content, env.options.max_header_tokens);
    if (env.noflow)(key) {
        docblock.flow = Some(FlowPragma::OptOut);
    }

    if !docblock_errors.is_empty() {
        let module = env.resolve_module(mutator, key, ModuleHint::Module(&docblock));
        let dirty = mutator.add_unparsed(key, addr.as_ref(), hash, module);
        acc.failed.0.push(key.clone());
        acc.failed
            .1
            .push(ParseFailure::DocblockErrors(docblock_errors));
        acc.dirty_modules.extend(dirty);
        return acc;
    }

    // No error escapes the worker: an unusable parser is accounted like an
    // uncaught exception, per file.
    let outcome = match parse_file(
        env.options,
        env.parser,
        env.blob_store,
        env.panic_logger,
        key,
        &content,
        &docblock,
    ) {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::error!(file = %key, %error, "source parser unusable");
            ParseOutcome::Exn(CapturedPanic {
                message: error.to_string(),
            })
        }
    };
    match outcome {
        ParseOutcome::Ok(bundle) => {
            let module = env.resolve_module(mutator, key, ModuleHint::Module(&docblock));
            let data = Arc::new(ParsedFile {
                requires: bundle.requires,
                file_sig: bundle.file_sig,
                exports: bundle.exports,
                imports: bundle.imports,
                type_sig: bundle.type_sig,
                tolerable_errors: bundle.tolerable_errors,
                cas_digest: bundle.cas_digest,
            });
            let dirty = mutator.add_parsed(key, addr.as_ref(), hash, module, data);
            acc.parsed.insert(key.clone());
            acc.dirty_modules.extend(dirty);
        }
        ParseOutcome::Recovered {
            mut parse_errors, ..
        } => {
            let module = env.resolve_module(mutator, key, ModuleHint::Module(&docblock));
            let dirty = mutator.add_unparsed(key, addr.as_ref(), hash, module);
            acc.failed.0.push(key.clone());
            acc.failed
                .1
                .push(ParseFailure::ParseError(parse_errors.remove(0)));
            acc.dirty_modules.extend(dirty);
        }
        ParseOutcome::Exn(panic) => {
            let module = env.resolve_module(mutator, key, ModuleHint::Module(&docblock));
            let dirty = mutator.add_unparsed(key, addr.as_ref(), hash, module);
            acc.failed.0.push(key.clone());
            acc.failed.1.push(ParseFailure::Uncaught(panic));
            acc.dirty_modules.extend(dirty);
        }
        ParseOutcome::Skip(ParseSkipReason::Package(package)) => {
            let module = match &package {
                Ok(pkg) => env.resolve_module(mutator, key, ModuleHint::Package(pkg)),
                Err(_) => env.resolve_module(mutator, key, ModuleHint::Unknown),
            };
            let error = package.as_ref().err().cloned();
            let dirty = mutator.add_package(key, addr.as_ref(), hash, module, package);
            acc.package_json.0.push(key.clone());
            acc.package_json.1.push(error);
            acc.dirty_modules.extend(dirty);
        }
        ParseOutcome::Skip(ParseSkipReason::Resource) | ParseOutcome::Skip(ParseSkipReason::NonFlow) => {
            let module = env.resolve_module(mutator, key, ModuleHint::Module(&docblock));
            let dirty = mutator.add_unparsed(key, addr.as_ref(), hash, module);
            acc.unparsed.insert(key.clone());
            acc.dirty_modules.extend(dirty);
        }
    }
    acc
}
