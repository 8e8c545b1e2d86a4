//! Builder for constructing PMDL files from scratch.

use pmdl_common::offsets::aligned_16;
use zerocopy::IntoBytes;

use crate::flags::SpecialFlag;
use crate::header::{Header, HEADER_SIZE, PMDL_MAGIC};
use crate::parts::{PartIndexEntry, PART_RECORD_SIZE};

#[derive(Debug, Clone)]
struct BuilderPart {
    part_id: u16,
    opacity: u16,
    special_flag: SpecialFlag,
    data: Vec<u8>,
}

/// Builder for PMDL containers.
///
/// Lays out the header, an optional raw bone table, the parts index and the
/// part data in that order, with the parts index aligned to 16 bytes.
///
/// # Example
///
/// ```
/// use pmdl_model::{PmdlBuilder, PmdlFile, SpecialFlag};
///
/// let bytes = PmdlBuilder::new()
///     .part(0x0001, 0xFFFF, SpecialFlag::None, vec![0u8; 0x40])
///     .build();
///
/// let file = PmdlFile::parse(bytes).unwrap();
/// assert_eq!(file.parts().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PmdlBuilder {
    bone_count: u8,
    bones: Vec<u8>,
    parts: Vec<BuilderPart>,
}

impl PmdlBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bone table: `count` bones stored as raw `data`.
    pub fn bones(mut self, count: u8, data: Vec<u8>) -> Self {
        self.bone_count = count;
        self.bones = data;
        self
    }

    /// Add a part.
    pub fn part(
        mut self,
        part_id: u16,
        opacity: u16,
        special_flag: SpecialFlag,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(BuilderPart {
            part_id,
            opacity,
            special_flag,
            data,
        });
        self
    }

    /// Build the PMDL binary representation.
    pub fn build(&self) -> Vec<u8> {
        let parts_index_offset = aligned_16(HEADER_SIZE + self.bones.len());
        let data_start = parts_index_offset + self.parts.len() * PART_RECORD_SIZE;
        let total = data_start + self.parts.iter().map(|p| p.data.len()).sum::<usize>();

        let header = Header {
            magic: *PMDL_MAGIC,
            bone_count: self.bone_count,
            bones_offset: HEADER_SIZE as u32,
            part_count: self.parts.len() as u32,
            parts_index_offset: parts_index_offset as u32,
        };

        let mut output = Vec::with_capacity(total);
        output.extend_from_slice(header.to_raw().as_bytes());
        output.extend_from_slice(&self.bones);
        output.resize(parts_index_offset, 0);

        let mut part_offset = data_start;
        for part in &self.parts {
            let entry = PartIndexEntry {
                part_id: part.part_id,
                opacity: part.opacity,
                part_offset: part_offset as u32,
                part_length: part.data.len() as u32,
                special_flag: part.special_flag,
            };
            output.extend_from_slice(entry.to_record().as_bytes());
            part_offset += part.data.len();
        }

        for part in &self.parts {
            output.extend_from_slice(&part.data);
        }

        output
    }
}
