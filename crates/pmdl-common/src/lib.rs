//! Common utilities for PMDL tooling.
//!
//! This crate provides the pieces shared by the header/part and subpart crates:
//!
//! - [`BinaryReader`] - Zero-copy binary reading from byte slices
//! - [`FormatError`], [`RangeError`], [`ValidationError`] - The failure taxonomy
//!   every mutating operation reports through
//! - [`offsets`] - The single offset-cascade primitive used by every
//!   insert/delete/resize path, plus buffer alignment helpers

mod error;
mod reader;

pub mod offsets;

pub use error::{Error, FormatError, RangeError, Result, ValidationError};
pub use offsets::{align_16, bounded_range, checked_range, shift_offsets, Relocatable};
pub use reader::BinaryReader;
