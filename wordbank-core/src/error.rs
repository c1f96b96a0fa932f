// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WordBankError {
    /// Weight outside `MIN_WEIGHT..=MAX_WEIGHT`.
    #[error("weight must be between 1 and 10 (got {0})")]
    InvalidWeight(i64),

    /// An entry whose answer reference resolves to nothing.
    #[error("integrity fault: entry {entry_id} references missing answer {answer_id}")]
    IntegrityFault { entry_id: i64, answer_id: i64 },

    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WordBankError {
    pub fn is_validation(&self) -> bool {
        matches!(self, WordBankError::InvalidWeight(_))
    }
}

pub type Result<T> = std::result::Result<T, WordBankError>;
