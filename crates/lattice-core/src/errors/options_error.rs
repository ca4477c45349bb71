//! Configuration and option-resolution errors.

use super::error_code::{self, LatticeErrorCode};

/// Errors raised while loading configuration or resolving parse options.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("Invalid regex `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl LatticeErrorCode for OptionsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRegex { .. } => error_code::OPTIONS_INVALID_REGEX,
            Self::Config { .. } => error_code::OPTIONS_CONFIG,
        }
    }
}
