//! # lattice-parsing
//!
//! The parsing service of the Lattice type checker: turns a set of file
//! keys into parsed, type-signature-indexed artifacts in the shared heap.
//! Contains the per-file parse pipeline, the incremental reducer, and the
//! multi-worker dispatch driver. Downstream phases read only what this
//! crate produced.

pub mod dispatch;
pub mod docblock;
pub mod driver;
pub mod file_sig;
pub mod hash;
pub mod package;
pub mod parser;
pub mod pipeline;
pub mod reducer;
pub mod remote;
pub mod results;
pub mod scope;
pub mod type_sig;

pub use dispatch::{PoolBuildError, ProgressFn, WorkerPool};
pub use driver::{ensure_parsed, parse, reparse, DefaultHooks, ServiceError, ServiceHooks};
pub use pipeline::{ParseOutcome, ParseSkipReason};
pub use reducer::{DefaultModuleNamer, ModuleHint, ModuleNamer};
pub use results::{ParseFailure, Results};
