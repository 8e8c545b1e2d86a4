//! Error types for PMDL subpart handling.

use pmdl_common::{FormatError, RangeError, ValidationError};
use thiserror::Error;

/// Errors that can occur when working with subparts.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] pmdl_common::Error),

    /// Malformed input.
    #[error("{0}")]
    Format(#[from] FormatError),

    /// Offset or length outside the buffer.
    #[error("{0}")]
    Range(#[from] RangeError),

    /// Caller precondition violated.
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// Result type for subpart operations.
pub type Result<T> = std::result::Result<T, Error>;
