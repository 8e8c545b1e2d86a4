//! PMDL file header.
//!
//! The header is a fixed 0x70-byte region at the start of the file. Only five
//! fields are understood; every other byte is carried through untouched.

use byteorder::{ByteOrder, LittleEndian};
use pmdl_common::{BinaryReader, FormatError};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Result;

/// PMDL magic bytes.
pub const PMDL_MAGIC: &[u8; 4] = b"pMdl";

/// Minimum size of the header region.
pub const HEADER_SIZE: usize = 0x70;

/// Offset of the bone count byte.
pub const BONE_COUNT_OFFSET: usize = 0x08;

/// Offset of the bone table offset field.
pub const BONES_OFFSET_OFFSET: usize = 0x50;

/// Offset of the part count field.
pub const PART_COUNT_OFFSET: usize = 0x5C;

/// Offset of the parts index offset field.
pub const PARTS_INDEX_OFFSET_OFFSET: usize = 0x60;

/// On-disk header layout.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RawHeader {
    /// Magic (`pMdl`).
    pub magic: [u8; 4],
    /// Unknown.
    pub unknown_04: [u8; 4],
    /// Number of bones.
    pub bone_count: u8,
    /// Unknown.
    pub unknown_09: [u8; 0x47],
    /// Absolute offset of the bone table.
    pub bones_offset: u32,
    /// Unknown.
    pub unknown_54: [u8; 8],
    /// Number of parts index records.
    pub part_count: u32,
    /// Absolute offset of the parts index.
    pub parts_index_offset: u32,
    /// Unknown.
    pub unknown_64: [u8; 0xC],
}

/// Parsed PMDL header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    /// Magic tag, always `pMdl` for a parsed header.
    pub magic: [u8; 4],
    /// Number of bones.
    pub bone_count: u8,
    /// Absolute offset of the bone table.
    pub bones_offset: u32,
    /// Authoritative number of parts index records.
    pub part_count: u32,
    /// Absolute offset of the parts index.
    pub parts_index_offset: u32,
}

impl Header {
    /// Parse the header from the start of a file buffer.
    pub fn parse(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                needed: HEADER_SIZE,
                actual: buffer.len(),
            }
            .into());
        }

        let raw: RawHeader = BinaryReader::new(buffer).read_struct()?;
        let magic = raw.magic;
        if &magic != PMDL_MAGIC {
            return Err(FormatError::BadMagic(magic).into());
        }

        Ok(Self {
            magic,
            bone_count: raw.bone_count,
            bones_offset: raw.bones_offset,
            part_count: raw.part_count,
            parts_index_offset: raw.parts_index_offset,
        })
    }

    /// On-disk form with every unknown byte zeroed.
    pub(crate) fn to_raw(&self) -> RawHeader {
        RawHeader {
            magic: self.magic,
            unknown_04: [0; 4],
            bone_count: self.bone_count,
            unknown_09: [0; 0x47],
            bones_offset: self.bones_offset,
            unknown_54: [0; 8],
            part_count: self.part_count,
            parts_index_offset: self.parts_index_offset,
            unknown_64: [0; 0xC],
        }
    }

    /// Write the five known fields into `buffer`, leaving all other header
    /// bytes as they are.
    pub fn write_to(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                needed: HEADER_SIZE,
                actual: buffer.len(),
            }
            .into());
        }

        buffer[..4].copy_from_slice(&self.magic);
        buffer[BONE_COUNT_OFFSET] = self.bone_count;
        LittleEndian::write_u32(&mut buffer[BONES_OFFSET_OFFSET..], self.bones_offset);
        LittleEndian::write_u32(&mut buffer[PART_COUNT_OFFSET..], self.part_count);
        LittleEndian::write_u32(
            &mut buffer[PARTS_INDEX_OFFSET_OFFSET..],
            self.parts_index_offset,
        );
        Ok(())
    }

    /// End of the parts index table.
    pub fn parts_index_end(&self) -> u64 {
        u64::from(self.parts_index_offset)
            + u64::from(self.part_count) * crate::PART_RECORD_SIZE as u64
    }
}

/// Store the part count in place.
///
/// Keeping the value consistent with the actual parts index is the caller's
/// job.
pub fn write_part_count(buffer: &mut [u8], count: u32) -> Result<()> {
    if buffer.len() < PART_COUNT_OFFSET + 4 {
        return Err(FormatError::Truncated {
            needed: PART_COUNT_OFFSET + 4,
            actual: buffer.len(),
        }
        .into());
    }
    LittleEndian::write_u32(&mut buffer[PART_COUNT_OFFSET..], count);
    Ok(())
}
