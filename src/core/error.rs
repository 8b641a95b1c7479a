//! Errors raised at the library boundary.
//!
//! The extraction and provenance algorithms never fail on bad data; they
//! degrade to empty results. These variants only cover reading caller input
//! and writing artifacts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Reading input or writing an artifact failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input document is not valid JSON for the expected schema
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input parsed but violates the caller contract
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
