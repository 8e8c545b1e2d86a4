//! PMDL - model container editing library.
//!
//! This crate provides a unified interface to the PMDL crates and adds an
//! editing session on top of them.
//!
//! # Crates
//!
//! - [`pmdl_common`] - Common utilities (binary reading, error taxonomy,
//!   offset cascade)
//! - [`pmdl_model`] - Header, parts index and part-level editing
//! - [`pmdl_subparts`] - Subparts index and subpart-level editing
//!
//! # Example
//!
//! ```no_run
//! use pmdl::prelude::*;
//!
//! let mut session = Session::new();
//! session.open_primary("Ryu.pmdl")?;
//! session.open_secondary("Ken.pmdl")?;
//!
//! // Copy Ken's first part over, then his first subpart of part 2 into
//! // Ryu's part 0, at the front.
//! session.add_part_from_secondary(0)?;
//! session.add_subpart_from_secondary(0, None, 2, 0)?;
//!
//! session.primary()?.save()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;

pub mod naming;
pub mod session;

// Re-export all sub-crates
pub use pmdl_common as common;
pub use pmdl_model as model;
pub use pmdl_subparts as subparts;

pub use error::{Error, Result};
pub use session::{Document, PartBuffers, Session};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::naming::{part_file_name, sort_natural, subpart_file_name};
    pub use crate::session::{Document, Session};
    pub use pmdl_model::{
        Header, PartEdit, PartIndexEntry, PartUpdate, PmdlBuilder, PmdlFile, SpecialFlag,
    };
    pub use pmdl_subparts::{PartBuffer, SubPartFields, SubPartFile, SubPartIndexEntry};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
