//! Error types for emberkv
//!
//! Provides a unified error type for all operations.
//!
//! Missing keys are not errors: get-style lookups report absence through
//! `Option`/`bool` return values.

use thiserror::Error;

use crate::value::Kind;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for emberkv operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Load/Decode Errors
    // -------------------------------------------------------------------------
    #[error("bad magic: not an emberkv database file")]
    Format,

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    Checksum { stored: u32, computed: u32 },

    #[error("malformed payload: {0}")]
    Payload(String),

    // -------------------------------------------------------------------------
    // Operation Errors
    // -------------------------------------------------------------------------
    #[error("wrong value kind: expected {expected}, found {found}")]
    Kind { expected: Kind, found: Kind },

    // -------------------------------------------------------------------------
    // Persistence Errors
    // -------------------------------------------------------------------------
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl EmberError {
    /// Build a kind error for an operation that found the wrong value variant
    pub(crate) fn kind(expected: Kind, found: Kind) -> Self {
        EmberError::Kind { expected, found }
    }
}
