//! Error types for the PMDL facade.

use thiserror::Error;

/// Errors that can occur while editing a session.
#[derive(Debug, Error)]
pub enum Error {
    /// Header, parts index or part-level edit failed.
    #[error("{0}")]
    Model(#[from] pmdl_model::Error),

    /// Subparts index or subpart-level edit failed.
    #[error("{0}")]
    Subparts(#[from] pmdl_subparts::Error),

    /// No primary file is open.
    #[error("no primary file is open")]
    NoPrimary,

    /// No secondary file is open.
    #[error("no secondary file is open")]
    NoSecondary,
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
