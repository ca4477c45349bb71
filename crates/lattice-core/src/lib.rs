//! # lattice-core
//!
//! Foundation crate for the Lattice parsing service.
//! Defines all types, errors, config, collections, and interning.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod errors;
pub mod telemetry;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::{GlobalOptions, ParseOptionOverrides, ParsingOptions, TypesMode};
pub use errors::error_code::LatticeErrorCode;
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::content::ContentHash;
pub use types::file_key::FileKey;
pub use types::interning::{ModuleId, ModuleInterner};
