//! PMDL file handling.

use std::fs;
use std::path::Path;

use pmdl_common::ValidationError;
use tracing::debug;

use crate::header::Header;
use crate::ops::{self, PartEdit, PartUpdate};
use crate::parts::{export_part, parse_parts_index, PartIndexEntry};
use crate::Result;

/// A loaded PMDL file.
///
/// Owns the raw buffer together with its parsed header and parts index. All
/// mutation goes through the methods here so the three never disagree.
#[derive(Debug, Clone)]
pub struct PmdlFile {
    data: Vec<u8>,
    header: Header,
    parts: Vec<PartIndexEntry>,
}

impl PmdlFile {
    /// Parse a PMDL file from an owned buffer.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let header = Header::parse(&data)?;
        let parts = parse_parts_index(&data, &header)?;
        Ok(Self { data, header, parts })
    }

    /// Read a PMDL file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let file = Self::parse(data)?;
        debug!(path = %path.display(), parts = file.parts.len(), "opened pmdl");
        Ok(file)
    }

    /// Write the current buffer to disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    /// Get the raw file buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the file, returning its buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Get the parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Get the parts index.
    pub fn parts(&self) -> &[PartIndexEntry] {
        &self.parts
    }

    /// Get one parts index entry.
    pub fn part(&self, index: usize) -> Result<&PartIndexEntry> {
        self.parts.get(index).ok_or_else(|| {
            ValidationError::IndexOutOfBounds {
                index,
                len: self.parts.len(),
            }
            .into()
        })
    }

    /// Copy the bytes of part `index`.
    pub fn export_part(&self, index: usize) -> Result<Vec<u8>> {
        export_part(&self.data, self.part(index)?)
    }

    /// Remove part `index`.
    pub fn delete_part(&mut self, index: usize) -> Result<()> {
        ops::delete_part(&mut self.data, &mut self.header, &mut self.parts, index)
    }

    /// Append a new part with default index fields.
    pub fn import_part(&mut self, data: &[u8]) -> Result<(u32, u32)> {
        ops::import_part(&mut self.data, &mut self.header, &mut self.parts, data)
    }

    /// Append a copy of part `index` of `source`.
    pub fn add_part_from(&mut self, source: &PmdlFile, index: usize) -> Result<(u32, u32)> {
        let entry = source.part(index)?;
        ops::add_part_from_secondary(
            &mut self.data,
            &mut self.header,
            &mut self.parts,
            &source.data,
            entry,
        )
    }

    /// Replace the data of part `index`.
    pub fn replace_part(&mut self, index: usize, data: &[u8]) -> Result<()> {
        ops::replace_part(&mut self.data, &self.header, &mut self.parts, index, data)
    }

    /// Overwrite depth, opacity or flag of part `index` only.
    pub fn set_part_fields(&mut self, index: usize, update: PartUpdate) -> Result<()> {
        ops::set_part_fields(&mut self.data, &self.header, &mut self.parts, index, update)
    }

    /// Apply depth/opacity/flag edits positionally.
    pub fn sync_parts(&mut self, edits: &[PartEdit]) -> Result<()> {
        ops::sync_parts_from_ui(&mut self.data, &self.header, &mut self.parts, edits)
    }
}
