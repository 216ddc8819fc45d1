//! PSD decoding error types

use std::io;
use thiserror::Error;

/// Errors that can occur while decoding a PSD/PSB document
#[derive(Error, Debug)]
pub enum PsdError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A structural invariant of the format was violated
    #[error("Invalid PSD data: {0}")]
    Format(String),

    /// A recognized construct that is intentionally not decoded
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// The buffer ran out in the middle of a record
    #[error("Unexpected end of data at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: u64,
        available: usize,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PsdError {
    pub fn is_truncation(&self) -> bool {
        matches!(self, PsdError::Truncated { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, PsdError::UnsupportedFeature(_))
    }
}

impl From<PsdError> for String {
    fn from(err: PsdError) -> Self {
        err.to_string()
    }
}
