//! Per-file parse artifacts: signatures, export/import summaries, and the
//! bundle recorded in the heap for a successfully parsed file.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::collections::FxHashSet;

/// Source location span, 0-based lines and columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

/// Location table produced by the type-signature packer.
/// Signature errors carry indexes into this table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locs(pub Vec<Loc>);

impl Locs {
    pub fn push(&mut self, loc: Loc) -> u32 {
        self.0.push(loc);
        (self.0.len() - 1) as u32
    }

    pub fn get(&self, index: u32) -> Option<Loc> {
        self.0.get(index as usize).copied()
    }
}

/// Whether a module's surface is ES or CommonJS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    Es,
    #[default]
    CommonJs,
}

/// One ES import statement, summarized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigImport {
    pub source: String,
    /// Named bindings; the default binding is listed as `default`.
    pub names: Vec<String>,
}

/// Import/export-level summary of one file, independent of types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSig {
    /// Raw require set: module specifiers in encounter order, possibly
    /// repeated. The pipeline sorts and dedupes into the bundle's
    /// `requires` array.
    pub require_set: SmallVec<[String; 8]>,
    pub module_kind: ModuleKind,
    pub imports: Vec<SigImport>,
    pub export_names: Vec<String>,
    pub has_default_export: bool,
}

/// A diagnostic recorded on the artifact rather than aborting the parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TolerableError {
    /// `require()` whose argument is not a single string literal.
    UnsupportedRequire { loc: Loc },
    /// An export whose signature could not be fully derived.
    SignatureVerificationError { loc: Loc, message: String },
}

/// Compact representation of an exported type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackedTy {
    Any,
    String,
    /// Literal string type; generalized to `String` past `max_literal_len`.
    StringLit(String),
    Number,
    /// Literal numeric type, kept as source text.
    NumberLit(String),
    Boolean,
    Function { arity: u32 },
    Class { name: String, members: Vec<String> },
    Enum { name: String },
    Object,
    /// A type annotation carried by name.
    Alias(String),
    Unknown,
}

/// One packed export binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedExport {
    pub name: String,
    pub ty: PackedTy,
}

/// Compact, serializable description of a module's type-level exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSig {
    pub module_kind: ModuleKind,
    pub exports: Vec<PackedExport>,
    pub default_export: Option<PackedTy>,
    pub exact_by_default: bool,
    pub strict: bool,
}

/// Type-level export surface of a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exports {
    pub module_kind: ModuleKind,
    pub named: Vec<String>,
    pub has_default: bool,
}

impl Exports {
    pub fn of_module(sig: &TypeSig) -> Self {
        Self {
            module_kind: sig.module_kind,
            named: sig.exports.iter().map(|e| e.name.clone()).collect(),
            has_default: sig.default_export.is_some(),
        }
    }
}

/// Import surface of a module, plus the free variables it reads from the
/// global scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Imports {
    pub entries: Vec<SigImport>,
    /// Sorted free-variable names.
    pub globals: Vec<String>,
}

impl Imports {
    pub fn of_file_sig(file_sig: &FileSig) -> Self {
        Self {
            entries: file_sig.imports.clone(),
            globals: Vec::new(),
        }
    }

    pub fn add_globals(globals: FxHashSet<String>, mut imports: Imports) -> Imports {
        let mut names: Vec<String> = globals.into_iter().collect();
        names.sort_unstable();
        imports.globals = names;
        imports
    }
}

/// Content-addressed-store handle for an uploaded type-signature blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CasDigest {
    pub hash: u64,
    pub size: u64,
}

/// Semantic contents of a `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: Option<String>,
    /// First match among the configured `node_main_fields`.
    pub main: Option<String>,
}

/// Failure to parse a `package.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageJsonError {
    pub message: String,
}

impl std::fmt::Display for PackageJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Artifact summary recorded in the heap for a successfully parsed file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    /// Sorted, deduped module specifiers required by this file.
    pub requires: Vec<String>,
    pub file_sig: FileSig,
    pub exports: Exports,
    pub imports: Imports,
    pub type_sig: TypeSig,
    pub tolerable_errors: Vec<TolerableError>,
    pub cas_digest: Option<CasDigest>,
}
