//! Shared-heap errors.

use super::error_code::{self, LatticeErrorCode};

/// Errors raised by heap transaction management.
#[derive(Debug, thiserror::Error)]
pub enum HeapError {
    #[error("A transaction is already active (the transaction scope is process-wide)")]
    TransactionActive,
}

impl LatticeErrorCode for HeapError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::TransactionActive => error_code::HEAP_TRANSACTION_ACTIVE,
        }
    }
}
