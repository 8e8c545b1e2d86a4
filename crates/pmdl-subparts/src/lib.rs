//! PMDL subparts: the vertex blocks inside one part.
//!
//! Every part starts with its own table describing the vertex blocks that
//! follow it. This crate parses that table and edits blocks in place.
//!
//! # Part Layout
//!
//! - 4 bytes: subpart count
//! - `count` records of 16 bytes (see [`index`])
//! - Vertex blocks, contiguous and in table order. A block is
//!   `num_vertices * (8 + 2 * num_bones)` bytes.
//! - Zero padding to a multiple of 16
//!
//! # Example
//!
//! ```no_run
//! use pmdl_model::PmdlFile;
//! use pmdl_subparts::PartBuffer;
//!
//! let mut file = PmdlFile::open("character.pmdl")?;
//! let mut part = PartBuffer::parse(file.export_part(0)?)?;
//!
//! let mut fields = part.subpart(1)?.fields();
//! fields.num_vertices += 1;
//! let mut vertices = part.export_subpart(1)?;
//! vertices.extend(std::iter::repeat(0).take(fields.vertex_size()));
//! part.replace_subpart(1, fields, &vertices)?;
//!
//! file.replace_part(0, part.data())?;
//! file.save("character.pmdl")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod buffer;
mod error;
mod sidecar;

pub mod index;

pub use buffer::{export_subpart, finalize, PartBuffer};
pub use error::{Error, Result};
pub use index::{
    calc_subpart_size, parse_subparts, vertex_size, SubPartFields, SubPartIndexEntry,
    SUBPART_RECORD_SIZE,
};
pub use sidecar::{SubPartFile, SUBPART_EXTENSION};
