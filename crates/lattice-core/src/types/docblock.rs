//! Parsed docblock metadata.

use serde::{Deserialize, Serialize};

/// `@flow` pragma variants recognized in a file's leading docblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowPragma {
    /// `@noflow` — the file opts out of checking.
    OptOut,
    /// `@flow`
    OptIn,
    /// `@flow strict`
    OptInStrict,
    /// `@flow strict-local`
    OptInStrictLocal,
}

/// Metadata extracted from a file's leading comment block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Docblock {
    pub flow: Option<FlowPragma>,
    /// `@providesModule NAME` — explicit module-name hint.
    pub provides_module: Option<String>,
}

impl Docblock {
    /// True when the file is checked in one of the strict modes.
    pub fn is_strict(&self) -> bool {
        matches!(
            self.flow,
            Some(FlowPragma::OptInStrict) | Some(FlowPragma::OptInStrictLocal)
        )
    }
}
