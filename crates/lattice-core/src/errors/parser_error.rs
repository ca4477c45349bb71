//! Source-parser infrastructure errors.
//!
//! Recoverable syntax errors never land here; they are carried on the
//! parse output. These variants cover the parser itself being unusable.

use super::error_code::{self, LatticeErrorCode};

/// Errors raised by the source-parser implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParserError {
    #[error("Grammar unavailable for `{dialect}`: {message}")]
    GrammarNotFound { dialect: String, message: String },

    #[error("Parser returned no tree for `{file}`")]
    NoTree { file: String },
}

impl LatticeErrorCode for ParserError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::GrammarNotFound { .. } => error_code::PARSER_GRAMMAR_NOT_FOUND,
            Self::NoTree { .. } => error_code::PARSER_NO_TREE,
        }
    }
}
