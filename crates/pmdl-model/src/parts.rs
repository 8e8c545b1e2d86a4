//! Parts index.
//!
//! The parts index is a flat table of 32-byte records starting at
//! `Header::parts_index_offset`, one per part. Each record locates a part's
//! mesh data by absolute offset and length.
//!
//! # Record layout
//!
//! | Offset | Size | Field          |
//! |--------|------|----------------|
//! | 0x00   | 2    | part id        |
//! | 0x02   | 2    | opacity        |
//! | 0x04   | 4    | part offset    |
//! | 0x08   | 4    | part length    |
//! | 0x0C   | 4    | special flag   |
//! | 0x10   | 16   | reserved       |

use byteorder::{ByteOrder, LittleEndian};
use pmdl_common::{checked_range, BinaryReader, FormatError, RangeError, Relocatable};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::flags::SpecialFlag;
use crate::header::Header;
use crate::opacity::{opacity_u16_from_percent, percent_from_opacity_u16};
use crate::Result;

/// Width of one parts index record.
pub const PART_RECORD_SIZE: usize = 0x20;

/// Number of leading record bytes that carry known fields.
const PART_RECORD_FIELDS: usize = 0x10;

/// On-disk parts index record.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct PartRecord {
    /// Part id; low byte is the render depth.
    pub part_id: u16,
    /// Opacity, 0x0000..=0xFFFF.
    pub opacity: u16,
    /// Absolute offset of the part data.
    pub part_offset: u32,
    /// Length of the part data.
    pub part_length: u32,
    /// Special function code.
    pub special_flag: u32,
    /// Reserved.
    pub reserved: [u8; 16],
}

/// One parts index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartIndexEntry {
    /// Part id. The low byte is the render layer; the high byte has no known
    /// meaning and is preserved as-is.
    pub part_id: u16,
    /// Opacity, linear from 0x0000 (transparent) to 0xFFFF (opaque).
    pub opacity: u16,
    /// Absolute offset of the part data.
    pub part_offset: u32,
    /// Length of the part data.
    pub part_length: u32,
    /// Special function.
    pub special_flag: SpecialFlag,
}

impl PartIndexEntry {
    /// Render depth (low byte of the part id).
    pub const fn depth(&self) -> u8 {
        (self.part_id & 0xFF) as u8
    }

    /// Replace the render depth, keeping the high byte of the part id.
    pub fn set_depth(&mut self, depth: u8) {
        self.part_id = (self.part_id & 0xFF00) | u16::from(depth);
    }

    /// Opacity as a whole percentage.
    pub fn opacity_percent(&self) -> u8 {
        percent_from_opacity_u16(self.opacity)
    }

    /// Set opacity from a percentage, clamped to `0..=100`.
    pub fn set_opacity_percent(&mut self, percent: i32) {
        self.opacity = opacity_u16_from_percent(percent);
    }

    /// Absolute end of the part data.
    pub fn end(&self) -> u64 {
        u64::from(self.part_offset) + u64::from(self.part_length)
    }

    /// On-disk record with the reserved bytes zeroed.
    pub(crate) fn to_record(&self) -> PartRecord {
        PartRecord {
            part_id: self.part_id,
            opacity: self.opacity,
            part_offset: self.part_offset,
            part_length: self.part_length,
            special_flag: self.special_flag.code(),
            reserved: [0; 16],
        }
    }

    fn from_record(record: &PartRecord) -> Self {
        Self {
            part_id: record.part_id,
            opacity: record.opacity,
            part_offset: record.part_offset,
            part_length: record.part_length,
            special_flag: SpecialFlag::from_code(record.special_flag),
        }
    }
}

impl Relocatable for PartIndexEntry {
    fn offset(&self) -> u32 {
        self.part_offset
    }

    fn set_offset(&mut self, offset: u32) {
        self.part_offset = offset;
    }
}

/// Parse `header.part_count` records starting at `header.parts_index_offset`.
pub fn parse_parts_index(buffer: &[u8], header: &Header) -> Result<Vec<PartIndexEntry>> {
    let base = header.parts_index_offset as usize;
    let count = header.part_count as usize;

    // Don't trust `count` for the allocation.
    let mut entries = Vec::with_capacity(count.min(buffer.len() / PART_RECORD_SIZE));

    for i in 0..count {
        let offset = base
            .checked_add(i * PART_RECORD_SIZE)
            .ok_or(FormatError::IndexTruncated(i))?;
        if offset > buffer.len() {
            return Err(FormatError::IndexTruncated(i).into());
        }

        let record: PartRecord = BinaryReader::new_at(buffer, offset)
            .read_struct()
            .map_err(|_| FormatError::IndexTruncated(i))?;
        entries.push(PartIndexEntry::from_record(&record));
    }

    Ok(entries)
}

/// Byte offset of record `index` in a parts index starting at `base`.
#[inline]
pub fn record_offset(base: u32, index: usize) -> usize {
    base as usize + index * PART_RECORD_SIZE
}

fn record_fields(buffer: &mut [u8], record_offset: usize) -> Result<&mut [u8]> {
    let buffer_len = buffer.len();
    let end = record_offset + PART_RECORD_FIELDS;
    buffer.get_mut(record_offset..end).ok_or_else(|| {
        RangeError::OutOfBounds {
            offset: record_offset as u64,
            length: PART_RECORD_FIELDS as u64,
            buffer_len,
        }
        .into()
    })
}

/// Write all five fields of `entry` into the record at `record_offset`.
///
/// Reserved bytes `0x10..0x20` are left untouched.
pub fn serialize_entry(
    buffer: &mut [u8],
    record_offset: usize,
    entry: &PartIndexEntry,
) -> Result<()> {
    let record = record_fields(buffer, record_offset)?;
    LittleEndian::write_u16(&mut record[0x00..], entry.part_id);
    LittleEndian::write_u16(&mut record[0x02..], entry.opacity);
    LittleEndian::write_u32(&mut record[0x04..], entry.part_offset);
    LittleEndian::write_u32(&mut record[0x08..], entry.part_length);
    LittleEndian::write_u32(&mut record[0x0C..], entry.special_flag.code());
    Ok(())
}

/// Write only the offset and length of `entry` into the record at
/// `record_offset`.
pub fn serialize_location(
    buffer: &mut [u8],
    record_offset: usize,
    entry: &PartIndexEntry,
) -> Result<()> {
    let record = record_fields(buffer, record_offset)?;
    LittleEndian::write_u32(&mut record[0x04..], entry.part_offset);
    LittleEndian::write_u32(&mut record[0x08..], entry.part_length);
    Ok(())
}

/// Copy a part's bytes out of the file buffer.
pub fn export_part(buffer: &[u8], entry: &PartIndexEntry) -> Result<Vec<u8>> {
    let range = checked_range(
        u64::from(entry.part_offset),
        u64::from(entry.part_length),
        buffer.len(),
    )?;
    Ok(buffer[range].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::PMDL_MAGIC;
    use crate::Error;

    fn header(count: u32) -> Header {
        Header {
            magic: *PMDL_MAGIC,
            bone_count: 0,
            bones_offset: 0x70,
            part_count: count,
            parts_index_offset: 0x70,
        }
    }

    fn record(part_id: u16, opacity: u16, offset: u32, length: u32, flag: u32) -> [u8; 0x20] {
        let mut out = [0u8; 0x20];
        out[0..2].copy_from_slice(&part_id.to_le_bytes());
        out[2..4].copy_from_slice(&opacity.to_le_bytes());
        out[4..8].copy_from_slice(&offset.to_le_bytes());
        out[8..12].copy_from_slice(&length.to_le_bytes());
        out[12..16].copy_from_slice(&flag.to_le_bytes());
        out
    }

    #[test]
    fn test_record_size() {
        assert_eq!(std::mem::size_of::<PartRecord>(), PART_RECORD_SIZE);
    }

    #[test]
    fn test_parse_records() {
        let mut buffer = vec![0u8; 0x70];
        buffer.extend_from_slice(&record(0x0102, 0xFFFF, 0xB0, 0x10, 6));
        buffer.extend_from_slice(&record(0x0003, 0x8000, 0xC0, 0x20, 0x1F));

        let parts = parse_parts_index(&buffer, &header(2)).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].depth(), 0x02);
        assert_eq!(parts[0].opacity_percent(), 100);
        assert_eq!(parts[0].special_flag, SpecialFlag::Face);
        assert_eq!(parts[1].part_offset, 0xC0);
        assert_eq!(parts[1].end(), 0xE0);
        assert_eq!(parts[1].special_flag, SpecialFlag::Unknown(0x1F));
    }

    #[test]
    fn test_parse_short_record() {
        let mut buffer = vec![0u8; 0x70];
        buffer.extend_from_slice(&record(0, 0, 0, 0, 0));
        buffer.extend_from_slice(&[0u8; 0x10]);

        assert!(matches!(
            parse_parts_index(&buffer, &header(2)),
            Err(Error::Format(FormatError::IndexTruncated(1)))
        ));
    }

    #[test]
    fn test_set_depth_keeps_high_byte() {
        let mut entry = PartIndexEntry {
            part_id: 0xAB12,
            opacity: 0,
            part_offset: 0,
            part_length: 0,
            special_flag: SpecialFlag::None,
        };
        entry.set_depth(0x34);
        assert_eq!(entry.part_id, 0xAB34);
    }

    #[test]
    fn test_serialize_leaves_reserved_bytes() {
        let mut buffer = vec![0xEEu8; 0x20];
        let entry = PartIndexEntry {
            part_id: 0x0001,
            opacity: 0x7FFF,
            part_offset: 0x100,
            part_length: 0x40,
            special_flag: SpecialFlag::Unknown(9),
        };
        serialize_entry(&mut buffer, 0, &entry).unwrap();

        assert_eq!(&buffer[..0x10], &record(1, 0x7FFF, 0x100, 0x40, 9)[..0x10]);
        assert!(buffer[0x10..].iter().all(|&b| b == 0xEE));
        assert!(serialize_entry(&mut buffer, 0x18, &entry).is_err());
    }

    #[test]
    fn test_export_part_ranges() {
        let buffer: Vec<u8> = (0..0x40).collect();
        let mut entry = PartIndexEntry {
            part_id: 0,
            opacity: 0,
            part_offset: 0x10,
            part_length: 0x08,
            special_flag: SpecialFlag::None,
        };
        assert_eq!(export_part(&buffer, &entry).unwrap(), (0x10..0x18).collect::<Vec<u8>>());

        entry.part_length = 0;
        assert!(matches!(export_part(&buffer, &entry), Err(Error::Range(_))));

        entry.part_length = 0x31;
        assert!(matches!(export_part(&buffer, &entry), Err(Error::Range(_))));
    }
}
