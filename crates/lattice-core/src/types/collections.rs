//! Hash collections used across the workspace. FxHash only; keys are
//! in-process identifiers, never untrusted input.

pub use rustc_hash::{FxHashMap, FxHashSet};
