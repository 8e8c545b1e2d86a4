//! Error types for pmdl-common.
//!
//! Three families cover every failure an editing operation can report:
//! malformed input ([`FormatError`]), offsets that fall outside the buffer
//! ([`RangeError`]) and caller preconditions ([`ValidationError`]).

use thiserror::Error;

/// Malformed or truncated input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Buffer shorter than a required fixed region.
    #[error("buffer too short: needed {needed:#x} bytes, got {actual:#x}")]
    Truncated { needed: usize, actual: usize },

    /// Magic tag did not match.
    #[error("invalid magic: expected \"pMdl\", got {0:02x?}")]
    BadMagic([u8; 4]),

    /// Index record `n` runs past the end of the buffer.
    #[error("index record {0} is truncated")]
    IndexTruncated(usize),
}

/// A computed offset or length falls outside the current buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Range `offset..offset + length` is empty or not inside the buffer.
    #[error("invalid range: offset {offset:#x}, length {length:#x}, buffer length {buffer_len:#x}")]
    OutOfBounds {
        offset: u64,
        length: u64,
        buffer_len: usize,
    },

    /// Shifting an offset by `delta` leaves the 32-bit offset space.
    #[error("offset {offset:#x} cannot be shifted by {delta}")]
    OffsetOverflow { offset: u32, delta: i64 },
}

/// Caller-supplied precondition violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Payload is empty.
    #[error("payload is empty")]
    Empty,

    /// Index out of bounds.
    #[error("index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Negative vertex or bone count.
    #[error("vertex/bone count cannot be negative: {num_vertices} vertices, {num_bones} bones")]
    NegativeSize { num_vertices: i64, num_bones: i64 },

    /// Payload length does not match the size derived from its record.
    #[error("payload size mismatch: record describes {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Common error type for PMDL operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// Malformed input.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Offset or length outside the buffer.
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Caller precondition violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
