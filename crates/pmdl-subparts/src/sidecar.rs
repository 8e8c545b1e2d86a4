//! Standalone subpart files.
//!
//! A sidecar carries one vertex block behind a 16-byte header laid out like
//! a subparts index record. The offset field of the header is unused and
//! written as zero, as are the two unknown bytes.

use std::fs;
use std::path::Path;

use pmdl_common::{BinaryReader, FormatError};

use crate::index::{SubPartFields, SubPartRecord, SUBPART_RECORD_SIZE};
use crate::Result;

/// File extension used for subpart sidecars.
pub const SUBPART_EXTENSION: &str = "subpart";

/// One exported subpart: record fields plus vertex bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubPartFile {
    /// Record fields.
    pub fields: SubPartFields,
    /// Raw vertex block.
    pub vertices: Vec<u8>,
}

impl SubPartFile {
    /// Parse a sidecar. Everything after the header is taken as vertex data.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let record: SubPartRecord = reader.read_struct().map_err(|_| FormatError::Truncated {
            needed: SUBPART_RECORD_SIZE,
            actual: data.len(),
        })?;

        Ok(Self {
            fields: SubPartFields::from_record(&record),
            vertices: reader.read_bytes(reader.remaining())?.to_vec(),
        })
    }

    /// Serialize header and vertices.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; SUBPART_RECORD_SIZE];
        out[0x00] = self.fields.num_vertices;
        out[0x02] = self.fields.num_bones;
        out[0x04..0x08].copy_from_slice(&self.fields.id_bones);
        out[0x08..0x0C].copy_from_slice(&self.fields.unk.to_le_bytes());
        out.extend_from_slice(&self.vertices);
        out
    }

    /// Read a sidecar from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(&fs::read(path)?)
    }

    /// Write the sidecar to disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }
}
