//! PMDL model container: header, parts index and part-level editing.
//!
//! PMDL files hold the mesh data of a fighting-game character split into
//! independently editable parts.
//!
//! # File Format
//!
//! - 0x70 bytes: Header (magic `pMdl`, bone count, bone table offset, part
//!   count, parts index offset)
//! - Bone table (opaque)
//! - Parts index: `part_count` records of 0x20 bytes
//! - Part data, contiguous and in index order, directly after the index
//!
//! # Example
//!
//! ```no_run
//! use pmdl_model::PmdlFile;
//!
//! let mut file = PmdlFile::open("character.pmdl")?;
//! for (i, part) in file.parts().iter().enumerate() {
//!     println!("{i:02}: depth {:02X}, {} bytes", part.depth(), part.part_length);
//! }
//!
//! let data = file.export_part(0)?;
//! file.import_part(&data)?;
//! file.save("character.pmdl")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod error;
mod file;
mod flags;
mod opacity;

pub mod header;
pub mod ops;
pub mod parts;

pub use builder::PmdlBuilder;
pub use error::{Error, Result};
pub use file::PmdlFile;
pub use flags::SpecialFlag;
pub use header::{Header, HEADER_SIZE, PMDL_MAGIC};
pub use opacity::{opacity_u16_from_percent, percent_from_opacity_u16};
pub use ops::{PartEdit, PartUpdate};
pub use parts::{PartIndexEntry, PART_RECORD_SIZE};
