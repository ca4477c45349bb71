//! The per-file parse pipeline: one straight-line function with early
//! exits, returning a sum type. No exception escapes to the reducer —
//! panics inside the checked-file stages are captured into
//! `ParseOutcome::Exn`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use lattice_core::config::types_checked;
use lattice_core::errors::ParserError;
use lattice_core::types::artifacts::{
    CasDigest, Exports, FileSig, Imports, Locs, PackageInfo, PackageJsonError, TolerableError,
    TypeSig,
};
use lattice_core::types::docblock::Docblock;
use lattice_core::{FileKey, ParsingOptions};
use tree_sitter::Tree;

use crate::file_sig::{extract_file_sig, FileSigOptions};
use crate::package::parse_package_json;
use crate::parser::{ParsedSource, ParserOptions, SourceParser, SyntaxError};
use crate::remote::BlobStore;
use crate::scope::{collect_globals, ScopeOptions};
use crate::type_sig::{pack_type_sig, SigError, SigInput};

/// Gates the diagnostic emitted for captured pipeline panics.
pub trait PanicLogger: Sync {
    fn should_emit(&self) -> bool;
}

/// Default logger: always emit.
pub struct EmitAlways;

impl PanicLogger for EmitAlways {
    fn should_emit(&self) -> bool {
        true
    }
}

/// A captured pipeline panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPanic {
    pub message: String,
}

/// Why a file was skipped rather than parsed.
#[derive(Debug)]
pub enum ParseSkipReason {
    /// Resources (and non-package JSON) are never parsed.
    Resource,
    /// The file did not pass the types-checked gate.
    NonFlow,
    /// `package.json` handled by the package sub-pipeline.
    Package(Result<PackageInfo, PackageJsonError>),
}

/// Everything produced for a successfully parsed file.
pub struct ParsedBundle {
    pub ast: Tree,
    /// Sorted, deduped module specifiers.
    pub requires: Vec<String>,
    pub file_sig: FileSig,
    pub tolerable_errors: Vec<TolerableError>,
    pub locs: Locs,
    pub type_sig: TypeSig,
    pub exports: Exports,
    pub imports: Imports,
    pub cas_digest: Option<CasDigest>,
}

/// Outcome of the per-file pipeline.
pub enum ParseOutcome {
    Ok(Box<ParsedBundle>),
    /// The parser recovered from syntax errors; signature-level artifacts
    /// are still derived, type-level ones are not.
    Recovered {
        ast: Tree,
        requires: Vec<String>,
        file_sig: FileSig,
        tolerable_errors: Vec<TolerableError>,
        /// Non-empty.
        parse_errors: Vec<SyntaxError>,
    },
    Exn(CapturedPanic),
    Skip(ParseSkipReason),
}

/// Run the pipeline for one file. The docblock is already parsed (and
/// error-free) and the `noflow` override already applied. `Err` means the
/// source parser itself was unusable; per-file problems are outcomes.
pub fn parse_file(
    options: &ParsingOptions,
    parser: &dyn SourceParser,
    blob_store: &dyn BlobStore,
    panic_logger: &dyn PanicLogger,
    key: &FileKey,
    content: &str,
    docblock: &Docblock,
) -> Result<ParseOutcome, ParserError> {
    let path = match key {
        FileKey::Resource(_) => return Ok(ParseOutcome::Skip(ParseSkipReason::Resource)),
        FileKey::Json(_) if key.is_package_json() => {
            return Ok(ParseOutcome::Skip(ParseSkipReason::Package(
                parse_package_json(content, &options.node_main_fields),
            )));
        }
        FileKey::Json(_) => return Ok(ParseOutcome::Skip(ParseSkipReason::Resource)),
        FileKey::Source(path) => path,
    };

    if !types_checked(options.types_mode, docblock) {
        return Ok(ParseOutcome::Skip(ParseSkipReason::NonFlow));
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        parse_checked_file(options, parser, blob_store, path, content, docblock)
    }));
    match result {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload);
            if panic_logger.should_emit() {
                tracing::error!(file = %key, %message, "uncaught exception in parse pipeline");
            }
            Ok(ParseOutcome::Exn(CapturedPanic { message }))
        }
    }
}

fn parse_checked_file(
    options: &ParsingOptions,
    parser: &dyn SourceParser,
    blob_store: &dyn BlobStore,
    path: &Path,
    content: &str,
    docblock: &Docblock,
) -> Result<ParseOutcome, ParserError> {
    // ES proposal syntax is always parsed; gating happens in inference.
    let parser_opts = ParserOptions {
        components: options.component_syntax,
        enums: true,
        esproposal_decorators: true,
        types: true,
        use_strict: options.use_strict,
        module_ref_prefix: options.module_ref_prefix.clone(),
        module_ref_prefix_legacy_interop: options.module_ref_prefix_legacy_interop.clone(),
    };
    let ParsedSource {
        tree,
        errors: parse_errors,
    } = parser.parse(content, path, &parser_opts)?;

    let sig_opts = FileSigOptions {
        enable_enums: options.enable_enums,
        enable_relay_integration: options.relay_enabled_for(path),
        relay_module_prefix: options.relay_prefix_for(path),
        module_ref_prefix: options.module_ref_prefix.as_deref(),
        module_ref_prefix_legacy_interop: options.module_ref_prefix_legacy_interop.as_deref(),
    };
    let (file_sig, mut tolerable_errors) = extract_file_sig(&tree, content, &sig_opts);

    let mut requires: Vec<String> = file_sig.require_set.to_vec();
    requires.sort_unstable();
    requires.dedup();

    if !parse_errors.is_empty() {
        return Ok(ParseOutcome::Recovered {
            ast: tree,
            requires,
            file_sig,
            tolerable_errors,
            parse_errors,
        });
    }

    let mut scope_opts = ScopeOptions {
        enable_enums: options.enable_enums,
        ambient: Vec::new(),
    };
    if options.facebook_fbt.is_some() {
        scope_opts.ambient.push("fbt".to_string());
    }
    let globals = collect_globals(&tree, content, &scope_opts);

    let (sig_errors, locs, type_sig) = pack_type_sig(&SigInput {
        tree: &tree,
        source: content,
        file_sig: &file_sig,
        strict: docblock.is_strict(),
        options,
    });
    for error in sig_errors {
        match error {
            SigError::Sig { loc_index, message } => {
                tolerable_errors.push(TolerableError::SignatureVerificationError {
                    loc: locs.get(loc_index).unwrap_or_default(),
                    message,
                });
            }
            SigError::Check { .. } => {}
        }
    }

    let exports = Exports::of_module(&type_sig);
    let imports = Imports::add_globals(globals, Imports::of_file_sig(&file_sig));

    let cas_digest = if options.distributed {
        match serde_json::to_vec(&type_sig) {
            Ok(bytes) => blob_store.upload_blob(&bytes),
            Err(e) => {
                tracing::warn!(error = %e, "type signature serialization failed; no digest");
                None
            }
        }
    } else {
        None
    };

    Ok(ParseOutcome::Ok(Box::new(ParsedBundle {
        ast: tree,
        requires,
        file_sig,
        tolerable_errors,
        locs,
        type_sig,
        exports,
        imports,
        cas_digest,
    })))
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
