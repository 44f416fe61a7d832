//! Error types for ledger object validation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Object not initialized: {0}")]
    Uninitialized(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid object: {0}")]
    InvalidObject(String),

    #[error("Economic validation failed: {0}")]
    Economic(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Structural conflict: {0}")]
    Conflict(String),

    #[error("Cryptographic failure: {0}")]
    Crypto(String),
}

impl LedgerError {
    /// Whether the failure means the enclosing block is malformed rather
    /// than a single transaction being unacceptable.
    ///
    /// Hash mismatches and duplicate UTXO references inside a proposed
    /// block cannot be fixed by dropping one transaction.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LedgerError::Conflict(_) | LedgerError::InvalidEncoding(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
