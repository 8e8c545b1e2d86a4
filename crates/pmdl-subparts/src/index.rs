//! Subparts index.
//!
//! Each part's data begins with its own table of vertex blocks: a u32 count
//! followed by that many 16-byte records. Record offsets are relative to the
//! start of the part.
//!
//! # Record layout
//!
//! | Offset | Size | Field            |
//! |--------|------|------------------|
//! | 0x00   | 1    | vertex count     |
//! | 0x01   | 1    | unknown          |
//! | 0x02   | 1    | bones per vertex |
//! | 0x03   | 1    | unknown          |
//! | 0x04   | 4    | bone ids         |
//! | 0x08   | 4    | unknown          |
//! | 0x0C   | 4    | block offset     |

use pmdl_common::{BinaryReader, FormatError, Relocatable, ValidationError};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Result;

/// Size of the leading subpart count.
pub const SUBPART_COUNT_SIZE: usize = 4;

/// Width of one subparts index record.
pub const SUBPART_RECORD_SIZE: usize = 0x10;

/// Fixed bytes per vertex before the bone weights.
const VERTEX_BASE_SIZE: usize = 8;

/// On-disk subparts index record.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct SubPartRecord {
    /// Number of vertices in the block.
    pub num_vertices: u8,
    /// Unknown.
    pub unknown_01: u8,
    /// Bones per vertex.
    pub num_bones: u8,
    /// Unknown.
    pub unknown_03: u8,
    /// Bone indices, unused slots padded.
    pub id_bones: [u8; 4],
    /// Unknown.
    pub unk: u32,
    /// Part-relative offset of the vertex block.
    pub sub_part_offset: u32,
}

/// Size of one vertex with `num_bones` bone weights.
pub fn vertex_size(num_bones: i64) -> Result<usize> {
    if num_bones < 0 {
        return Err(ValidationError::NegativeSize {
            num_vertices: 0,
            num_bones,
        }
        .into());
    }
    Ok(2 * num_bones as usize + VERTEX_BASE_SIZE)
}

/// Byte length of a vertex block.
pub fn calc_subpart_size(num_vertices: i64, num_bones: i64) -> Result<usize> {
    if num_vertices < 0 || num_bones < 0 {
        return Err(ValidationError::NegativeSize {
            num_vertices,
            num_bones,
        }
        .into());
    }
    Ok(vertex_size(num_bones)? * num_vertices as usize)
}

/// Record fields that describe a vertex block, without its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubPartFields {
    /// Number of vertices.
    pub num_vertices: u8,
    /// Bones per vertex.
    pub num_bones: u8,
    /// Bone indices.
    pub id_bones: [u8; 4],
    /// Unknown.
    pub unk: u32,
}

impl SubPartFields {
    /// Size of one vertex.
    pub fn vertex_size(&self) -> usize {
        2 * usize::from(self.num_bones) + VERTEX_BASE_SIZE
    }

    /// Byte length of the vertex block these fields describe.
    pub fn byte_length(&self) -> usize {
        self.vertex_size() * usize::from(self.num_vertices)
    }

    pub(crate) fn from_record(record: &SubPartRecord) -> Self {
        Self {
            num_vertices: record.num_vertices,
            num_bones: record.num_bones,
            id_bones: record.id_bones,
            unk: record.unk,
        }
    }
}

/// One subparts index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubPartIndexEntry {
    /// Position within the owning part.
    pub sub_part: usize,
    /// Number of vertices.
    pub num_vertices: u8,
    /// Bones per vertex.
    pub num_bones: u8,
    /// Bone indices.
    pub id_bones: [u8; 4],
    /// Unknown.
    pub unk: u32,
    /// Part-relative offset of the vertex block.
    pub sub_part_offset: u32,
}

impl SubPartIndexEntry {
    /// Create an entry at `sub_part` from record fields.
    pub fn new(sub_part: usize, fields: SubPartFields, sub_part_offset: u32) -> Self {
        Self {
            sub_part,
            num_vertices: fields.num_vertices,
            num_bones: fields.num_bones,
            id_bones: fields.id_bones,
            unk: fields.unk,
            sub_part_offset,
        }
    }

    /// Record fields without the offset.
    pub fn fields(&self) -> SubPartFields {
        SubPartFields {
            num_vertices: self.num_vertices,
            num_bones: self.num_bones,
            id_bones: self.id_bones,
            unk: self.unk,
        }
    }

    /// Byte length of this entry's vertex block.
    pub fn byte_length(&self) -> usize {
        self.fields().byte_length()
    }

    /// Part-relative end of this entry's vertex block.
    pub fn end(&self) -> u64 {
        u64::from(self.sub_part_offset) + self.byte_length() as u64
    }
}

impl Relocatable for SubPartIndexEntry {
    fn offset(&self) -> u32 {
        self.sub_part_offset
    }

    fn set_offset(&mut self, offset: u32) {
        self.sub_part_offset = offset;
    }
}

/// Byte offset of record `index` within a part.
#[inline]
pub const fn record_offset(index: usize) -> usize {
    SUBPART_COUNT_SIZE + index * SUBPART_RECORD_SIZE
}

/// Parse the subparts index embedded at the start of a part.
pub fn parse_subparts(part_bytes: &[u8]) -> Result<Vec<SubPartIndexEntry>> {
    let mut reader = BinaryReader::new(part_bytes);
    let count = reader.read_u32().map_err(|_| FormatError::Truncated {
        needed: SUBPART_COUNT_SIZE,
        actual: part_bytes.len(),
    })? as usize;

    let mut entries = Vec::with_capacity(count.min(part_bytes.len() / SUBPART_RECORD_SIZE));
    for i in 0..count {
        let record: SubPartRecord = reader
            .read_struct()
            .map_err(|_| FormatError::IndexTruncated(i))?;
        let fields = SubPartFields::from_record(&record);
        entries.push(SubPartIndexEntry::new(i, fields, record.sub_part_offset));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_record_size() {
        assert_eq!(std::mem::size_of::<SubPartRecord>(), SUBPART_RECORD_SIZE);
    }

    #[test]
    fn test_calc_subpart_size() {
        assert_eq!(calc_subpart_size(10, 2).unwrap(), 120);
        assert_eq!(calc_subpart_size(0, 3).unwrap(), 0);
        assert_eq!(vertex_size(4).unwrap(), 16);

        assert!(matches!(
            calc_subpart_size(-1, 2),
            Err(Error::Validation(ValidationError::NegativeSize { num_vertices: -1, num_bones: 2 }))
        ));
        assert!(calc_subpart_size(3, -2).is_err());
        assert!(vertex_size(-1).is_err());
    }

    #[test]
    fn test_parse_subparts() {
        let mut part = Vec::new();
        part.extend_from_slice(&2u32.to_le_bytes());
        part.extend_from_slice(&[3, 0, 1, 0, 7, 0, 0, 0]);
        part.extend_from_slice(&0xCAFEu32.to_le_bytes());
        part.extend_from_slice(&0x24u32.to_le_bytes());
        part.extend_from_slice(&[2, 0, 2, 0, 1, 2, 0, 0]);
        part.extend_from_slice(&0u32.to_le_bytes());
        part.extend_from_slice(&0x42u32.to_le_bytes());

        let entries = parse_subparts(&part).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sub_part, 0);
        assert_eq!(entries[0].num_vertices, 3);
        assert_eq!(entries[0].id_bones, [7, 0, 0, 0]);
        assert_eq!(entries[0].unk, 0xCAFE);
        assert_eq!(entries[0].byte_length(), 30);
        assert_eq!(entries[0].end(), 0x42);
        assert_eq!(entries[1].sub_part, 1);
        assert_eq!(entries[1].sub_part_offset, 0x42);
        assert_eq!(entries[1].byte_length(), 24);
    }

    #[test]
    fn test_parse_short_record() {
        let mut part = Vec::new();
        part.extend_from_slice(&2u32.to_le_bytes());
        part.extend_from_slice(&[0u8; 0x18]);

        assert!(matches!(
            parse_subparts(&part),
            Err(Error::Format(FormatError::IndexTruncated(1)))
        ));
    }

    #[test]
    fn test_parse_missing_count() {
        assert!(matches!(
            parse_subparts(&[1, 0]),
            Err(Error::Format(FormatError::Truncated { needed: 4, actual: 2 }))
        ));
    }
}
