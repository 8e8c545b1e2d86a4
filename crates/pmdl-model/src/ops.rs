//! Part-level editing.
//!
//! Every operation works on the whole file buffer together with its parsed
//! header and parts index, and keeps the three in lockstep. All offsets are
//! computed and checked on a copy of the index before the buffer is touched,
//! so a failed call leaves everything as it was.
//!
//! Part data always sits directly after the parts index, contiguous and in
//! index order, so growing or shrinking the index by one record moves every
//! part by [`PART_RECORD_SIZE`] bytes.

use pmdl_common::{bounded_range, checked_range, shift_offsets, RangeError, ValidationError};
use tracing::{debug, warn};

use crate::flags::SpecialFlag;
use crate::header::{write_part_count, Header};
use crate::parts::{
    export_part, record_offset, serialize_entry, serialize_location, PartIndexEntry,
    PART_RECORD_SIZE,
};
use crate::Result;

const RECORD_DELTA: i64 = PART_RECORD_SIZE as i64;

/// Scalar fields of one part as edited in a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartEdit {
    /// New render depth (low byte of the part id).
    pub depth: u8,
    /// New opacity in percent; clamped to `0..=100`.
    pub opacity_percent: i32,
    /// Flag label, see [`SpecialFlag::from_label`].
    pub flag_label: String,
}

impl PartEdit {
    /// The edit that leaves `entry` unchanged.
    pub fn from_entry(entry: &PartIndexEntry) -> Self {
        Self {
            depth: entry.depth(),
            opacity_percent: i32::from(entry.opacity_percent()),
            flag_label: entry.special_flag.to_string(),
        }
    }
}

/// Scalar fields to overwrite on a single part. `None` keeps the stored
/// value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartUpdate {
    /// New render depth (low byte of the part id).
    pub depth: Option<u8>,
    /// New raw opacity.
    pub opacity: Option<u16>,
    /// New special flag.
    pub special_flag: Option<SpecialFlag>,
}

/// Index fields for a part about to be appended.
#[derive(Debug, Clone, Copy)]
struct NewPart {
    part_id: u16,
    opacity: u16,
    special_flag: SpecialFlag,
}

fn check_index(index: usize, len: usize) -> std::result::Result<(), ValidationError> {
    if index >= len {
        return Err(ValidationError::IndexOutOfBounds { index, len });
    }
    Ok(())
}

fn check_length(len: usize, buffer_len: usize) -> std::result::Result<u32, RangeError> {
    u32::try_from(len).map_err(|_| RangeError::OutOfBounds {
        offset: 0,
        length: len as u64,
        buffer_len,
    })
}

/// End of the last part, or of the parts index when there are no parts.
fn data_end(header: &Header, parts: &[PartIndexEntry]) -> u64 {
    match parts.last() {
        Some(last) => last.end(),
        None => u64::from(header.parts_index_offset),
    }
}

/// Rewrite offset and length of every record from the in-memory index.
fn write_locations(buffer: &mut [u8], header: &Header, parts: &[PartIndexEntry]) -> Result<()> {
    for (i, entry) in parts.iter().enumerate() {
        serialize_location(buffer, record_offset(header.parts_index_offset, i), entry)?;
    }
    Ok(())
}

fn truncate_residue(buffer: &mut Vec<u8>, end: u64) {
    let end = end as usize;
    if buffer.len() > end {
        warn!(residue = buffer.len() - end, "truncating trailing bytes");
        buffer.truncate(end);
    }
}

/// Remove part `index` and its index record.
pub fn delete_part(
    buffer: &mut Vec<u8>,
    header: &mut Header,
    parts: &mut Vec<PartIndexEntry>,
    index: usize,
) -> Result<()> {
    check_index(index, parts.len())?;

    let target = parts[index];
    let part_range = bounded_range(
        u64::from(target.part_offset),
        u64::from(target.part_length),
        buffer.len(),
    )?;
    let record_start = record_offset(header.parts_index_offset, index);
    let record_range = checked_range(record_start as u64, PART_RECORD_SIZE as u64, buffer.len())?;
    if record_range.end > part_range.start {
        // Part data overlapping its own index would corrupt both removals.
        return Err(RangeError::OutOfBounds {
            offset: u64::from(target.part_offset),
            length: u64::from(target.part_length),
            buffer_len: buffer.len(),
        }
        .into());
    }

    let mut next = parts.clone();
    shift_offsets(&mut next, index + 1, -i64::from(target.part_length))?;
    next.remove(index);
    shift_offsets(&mut next, 0, -RECORD_DELTA)?;
    let new_count = next.len() as u32;

    write_part_count(buffer, new_count)?;
    buffer.drain(part_range);
    buffer.drain(record_range);

    header.part_count = new_count;
    *parts = next;
    write_locations(buffer, header, parts)?;
    truncate_residue(buffer, data_end(header, parts));

    debug!(
        index,
        length = target.part_length,
        remaining = new_count,
        "deleted part"
    );
    Ok(())
}

fn append_part(
    buffer: &mut Vec<u8>,
    header: &mut Header,
    parts: &mut Vec<PartIndexEntry>,
    bytes: &[u8],
    template: NewPart,
) -> Result<(u32, u32)> {
    if bytes.is_empty() {
        return Err(ValidationError::Empty.into());
    }

    let old_count = parts.len();
    let index_end = record_offset(header.parts_index_offset, old_count);
    if index_end > buffer.len() {
        return Err(RangeError::OutOfBounds {
            offset: u64::from(header.parts_index_offset),
            length: (old_count * PART_RECORD_SIZE) as u64,
            buffer_len: buffer.len(),
        }
        .into());
    }
    let part_length = check_length(bytes.len(), buffer.len())?;

    let mut next = parts.clone();
    shift_offsets(&mut next, 0, RECORD_DELTA)?;

    let insert_pos = match next.last() {
        Some(last) => last.end(),
        None => (index_end + PART_RECORD_SIZE) as u64,
    };
    let grown_len = (buffer.len() + PART_RECORD_SIZE) as u64;
    if insert_pos > grown_len || insert_pos + u64::from(part_length) > u64::from(u32::MAX) {
        return Err(RangeError::OutOfBounds {
            offset: insert_pos,
            length: u64::from(part_length),
            buffer_len: buffer.len(),
        }
        .into());
    }

    let entry = PartIndexEntry {
        part_id: template.part_id,
        opacity: template.opacity,
        part_offset: insert_pos as u32,
        part_length,
        special_flag: template.special_flag,
    };
    next.push(entry);
    let new_count = next.len() as u32;

    buffer.splice(index_end..index_end, [0u8; PART_RECORD_SIZE]);
    write_part_count(buffer, new_count)?;
    let insert_at = insert_pos as usize;
    buffer.splice(insert_at..insert_at, bytes.iter().copied());

    header.part_count = new_count;
    *parts = next;
    serialize_entry(buffer, index_end, &entry)?;
    write_locations(buffer, header, parts)?;
    truncate_residue(buffer, entry.end());

    debug!(
        index = old_count,
        offset = entry.part_offset,
        length = entry.part_length,
        "appended part"
    );
    Ok((entry.part_offset, entry.part_length))
}

/// Append `new_bytes` as a new last part with default index fields.
///
/// The new part gets the previous last part's depth plus one (saturating at
/// 0xFF, high byte carried over), or id 0 if there were no parts; it is fully
/// opaque and has no special flag. Returns the new part's offset and length.
pub fn import_part(
    buffer: &mut Vec<u8>,
    header: &mut Header,
    parts: &mut Vec<PartIndexEntry>,
    new_bytes: &[u8],
) -> Result<(u32, u32)> {
    let part_id = match parts.last() {
        Some(last) => (last.part_id & 0xFF00) | u16::from(last.depth().saturating_add(1)),
        None => 0x0000,
    };
    let template = NewPart {
        part_id,
        opacity: 0xFFFF,
        special_flag: SpecialFlag::None,
    };
    append_part(buffer, header, parts, new_bytes, template)
}

/// Append a copy of a part from another, independently loaded file.
///
/// Bytes and index fields come from `src_entry`; `src_buffer` is only read.
pub fn add_part_from_secondary(
    dest_buffer: &mut Vec<u8>,
    dest_header: &mut Header,
    dest_parts: &mut Vec<PartIndexEntry>,
    src_buffer: &[u8],
    src_entry: &PartIndexEntry,
) -> Result<(u32, u32)> {
    let bytes = export_part(src_buffer, src_entry)?;
    let template = NewPart {
        part_id: src_entry.part_id,
        opacity: src_entry.opacity,
        special_flag: src_entry.special_flag,
    };
    append_part(dest_buffer, dest_header, dest_parts, &bytes, template)
}

/// Replace the data of part `index` with `new_bytes`, which may differ in
/// length. Later parts move by the length difference.
pub fn replace_part(
    buffer: &mut Vec<u8>,
    header: &Header,
    parts: &mut [PartIndexEntry],
    index: usize,
    new_bytes: &[u8],
) -> Result<()> {
    check_index(index, parts.len())?;
    if new_bytes.is_empty() {
        return Err(ValidationError::Empty.into());
    }

    let target = parts[index];
    let range = bounded_range(
        u64::from(target.part_offset),
        u64::from(target.part_length),
        buffer.len(),
    )?;
    let new_length = check_length(new_bytes.len(), buffer.len())?;
    let delta = i64::from(new_length) - i64::from(target.part_length);

    let mut next = parts.to_vec();
    shift_offsets(&mut next, index + 1, delta)?;
    next[index].part_length = new_length;
    if next.iter().any(|p| p.end() > u64::from(u32::MAX)) {
        return Err(RangeError::OffsetOverflow {
            offset: target.part_offset,
            delta,
        }
        .into());
    }

    buffer.splice(range, new_bytes.iter().copied());
    parts.copy_from_slice(&next);
    write_locations(buffer, header, parts)?;

    debug!(index, old = target.part_length, new = new_length, "replaced part");
    Ok(())
}

/// Apply scalar edits (depth, opacity, flag) positionally and rewrite every
/// index record. Offsets and lengths are not touched.
///
/// Extra edits beyond the number of parts are ignored.
pub fn sync_parts_from_ui(
    buffer: &mut [u8],
    header: &Header,
    parts: &mut [PartIndexEntry],
    edits: &[PartEdit],
) -> Result<()> {
    let index_end = record_offset(header.parts_index_offset, parts.len());
    if index_end > buffer.len() {
        return Err(RangeError::OutOfBounds {
            offset: u64::from(header.parts_index_offset),
            length: (parts.len() * PART_RECORD_SIZE) as u64,
            buffer_len: buffer.len(),
        }
        .into());
    }

    for (entry, edit) in parts.iter_mut().zip(edits) {
        entry.set_depth(edit.depth);
        entry.set_opacity_percent(edit.opacity_percent);
        entry.special_flag = SpecialFlag::from_label(&edit.flag_label);
    }

    for (i, entry) in parts.iter().enumerate() {
        serialize_entry(buffer, record_offset(header.parts_index_offset, i), entry)?;
    }

    debug!(edits = edits.len().min(parts.len()), "synced part fields");
    Ok(())
}

/// Overwrite the scalar fields of part `index` named in `update`. Every
/// other record, and every field left as `None`, keeps its stored bytes.
pub fn set_part_fields(
    buffer: &mut [u8],
    header: &Header,
    parts: &mut [PartIndexEntry],
    index: usize,
    update: PartUpdate,
) -> Result<()> {
    check_index(index, parts.len())?;

    let mut entry = parts[index];
    if let Some(depth) = update.depth {
        entry.set_depth(depth);
    }
    if let Some(opacity) = update.opacity {
        entry.opacity = opacity;
    }
    if let Some(special_flag) = update.special_flag {
        entry.special_flag = special_flag;
    }

    serialize_entry(buffer, record_offset(header.parts_index_offset, index), &entry)?;
    parts[index] = entry;

    debug!(index, part_id = entry.part_id, opacity = entry.opacity, "updated part fields");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PmdlBuilder;
    use crate::parts::parse_parts_index;
    use crate::Error;

    struct Loaded {
        buffer: Vec<u8>,
        header: Header,
        parts: Vec<PartIndexEntry>,
    }

    fn load(buffer: Vec<u8>) -> Loaded {
        let header = Header::parse(&buffer).unwrap();
        let parts = parse_parts_index(&buffer, &header).unwrap();
        Loaded { buffer, header, parts }
    }

    fn two_parts() -> Loaded {
        load(
            PmdlBuilder::new()
                .part(0x0001, 0xFFFF, SpecialFlag::None, vec![0xA1; 0x40])
                .part(0x0002, 0x8000, SpecialFlag::Face, vec![0xB2; 0x20])
                .build(),
        )
    }

    fn assert_consistent(file: &Loaded) {
        assert_eq!(file.header.part_count as usize, file.parts.len());
        assert_eq!(Header::parse(&file.buffer).unwrap(), file.header);
        assert_eq!(parse_parts_index(&file.buffer, &file.header).unwrap(), file.parts);

        let index_end = file.header.parts_index_end();
        match file.parts.first() {
            Some(first) => assert_eq!(u64::from(first.part_offset), index_end),
            None => assert_eq!(file.buffer.len() as u64, u64::from(file.header.parts_index_offset)),
        }
        for pair in file.parts.windows(2) {
            assert_eq!(pair[1].part_offset, pair[0].part_offset + pair[0].part_length);
        }
        if let Some(last) = file.parts.last() {
            assert_eq!(last.end(), file.buffer.len() as u64);
        }
    }

    #[test]
    fn test_builder_layout_is_consistent() {
        let file = two_parts();
        assert_consistent(&file);
        assert_eq!(file.parts[0].part_offset, 0x70 + 0x40);
    }

    #[test]
    fn test_delete_first_of_two() {
        let mut f = two_parts();
        let before_len = f.buffer.len();
        let second_offset = f.parts[1].part_offset;

        delete_part(&mut f.buffer, &mut f.header, &mut f.parts, 0).unwrap();

        assert_eq!(f.header.part_count, 1);
        assert_eq!(f.parts[0].part_offset, second_offset - (0x40 + 0x20));
        assert_eq!(f.buffer.len(), before_len - (0x40 + 0x20));
        assert_eq!(f.parts[0].special_flag, SpecialFlag::Face);
        assert!(export_part(&f.buffer, &f.parts[0]).unwrap().iter().all(|&b| b == 0xB2));
        assert_consistent(&f);
    }

    #[test]
    fn test_delete_last_part_leaves_empty_index() {
        let mut f = load(
            PmdlBuilder::new()
                .part(0, 0xFFFF, SpecialFlag::None, vec![1; 0x10])
                .build(),
        );
        delete_part(&mut f.buffer, &mut f.header, &mut f.parts, 0).unwrap();

        assert!(f.parts.is_empty());
        assert_eq!(f.buffer.len(), 0x70);
        assert_consistent(&f);
    }

    #[test]
    fn test_delete_out_of_range_does_not_mutate() {
        let mut f = two_parts();
        let snapshot = f.buffer.clone();

        let err = delete_part(&mut f.buffer, &mut f.header, &mut f.parts, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert_eq!(f.buffer, snapshot);
        assert_eq!(f.parts.len(), 2);
    }

    fn with_empty_first_part() -> Loaded {
        load(
            PmdlBuilder::new()
                .part(0x0001, 0xFFFF, SpecialFlag::None, Vec::new())
                .part(0x0002, 0x8000, SpecialFlag::Face, vec![0xB2; 0x10])
                .build(),
        )
    }

    #[test]
    fn test_delete_zero_length_part() {
        let mut f = with_empty_first_part();
        assert_eq!(f.parts[0].part_length, 0);
        assert_consistent(&f);

        delete_part(&mut f.buffer, &mut f.header, &mut f.parts, 0).unwrap();

        assert_eq!(f.parts.len(), 1);
        assert_eq!(f.parts[0].special_flag, SpecialFlag::Face);
        assert_eq!(export_part(&f.buffer, &f.parts[0]).unwrap(), vec![0xB2; 0x10]);
        assert_consistent(&f);
    }

    #[test]
    fn test_replace_zero_length_part() {
        let mut f = with_empty_first_part();
        let second_offset = f.parts[1].part_offset;

        replace_part(&mut f.buffer, &f.header, &mut f.parts, 0, &[9; 4]).unwrap();

        assert_eq!(f.parts[0].part_length, 4);
        assert_eq!(f.parts[1].part_offset, second_offset + 4);
        assert_eq!(export_part(&f.buffer, &f.parts[0]).unwrap(), vec![9; 4]);
        assert_eq!(export_part(&f.buffer, &f.parts[1]).unwrap(), vec![0xB2; 0x10]);
        assert_consistent(&f);
    }

    #[test]
    fn test_delete_truncates_residue() {
        let mut f = two_parts();
        f.buffer.extend_from_slice(&[0xCC; 7]);

        delete_part(&mut f.buffer, &mut f.header, &mut f.parts, 1).unwrap();
        assert_consistent(&f);
    }

    #[test]
    fn test_import_into_empty_file() {
        let mut f = load(PmdlBuilder::new().build());
        let (offset, length) =
            import_part(&mut f.buffer, &mut f.header, &mut f.parts, &[0x5A; 0x10]).unwrap();

        assert_eq!(f.header.part_count, 1);
        assert_eq!(offset, f.header.parts_index_offset + 0x20);
        assert_eq!(length, 0x10);
        assert_eq!(f.buffer.len() as u32, offset + length);
        assert_eq!(f.parts[0].part_id, 0);
        assert_eq!(f.parts[0].opacity, 0xFFFF);
        assert_eq!(f.parts[0].special_flag, SpecialFlag::None);
        assert_consistent(&f);
    }

    #[test]
    fn test_import_increments_depth() {
        let mut f = load(
            PmdlBuilder::new()
                .part(0x12FE, 0, SpecialFlag::Hideable, vec![1; 0x10])
                .build(),
        );
        import_part(&mut f.buffer, &mut f.header, &mut f.parts, &[2; 0x10]).unwrap();
        import_part(&mut f.buffer, &mut f.header, &mut f.parts, &[3; 0x10]).unwrap();

        assert_eq!(f.parts[1].part_id, 0x12FF);
        // Saturates.
        assert_eq!(f.parts[2].part_id, 0x12FF);
        assert_consistent(&f);
    }

    #[test]
    fn test_import_empty_is_rejected() {
        let mut f = two_parts();
        let snapshot = f.buffer.clone();

        let err = import_part(&mut f.buffer, &mut f.header, &mut f.parts, &[]).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::Empty)));
        assert_eq!(f.buffer, snapshot);
    }

    #[test]
    fn test_import_then_delete_restores_layout() {
        let mut f = two_parts();
        let before_len = f.buffer.len();
        let before_parts = f.parts.clone();

        import_part(&mut f.buffer, &mut f.header, &mut f.parts, &[9; 0x30]).unwrap();
        delete_part(&mut f.buffer, &mut f.header, &mut f.parts, 2).unwrap();

        assert_eq!(f.header.part_count, 2);
        assert_eq!(f.buffer.len(), before_len);
        assert_eq!(f.parts, before_parts);
        assert_consistent(&f);
    }

    #[test]
    fn test_add_part_from_secondary() {
        let mut dest = two_parts();
        let src = load(
            PmdlBuilder::new()
                .part(0x0107, 0x1234, SpecialFlag::Unknown(0x55), vec![0xEE; 0x18])
                .build(),
        );
        let src_snapshot = src.buffer.clone();

        let (offset, length) = add_part_from_secondary(
            &mut dest.buffer,
            &mut dest.header,
            &mut dest.parts,
            &src.buffer,
            &src.parts[0],
        )
        .unwrap();

        assert_eq!(length, 0x18);
        let added = dest.parts[2];
        assert_eq!(added.part_offset, offset);
        assert_eq!(added.part_id, 0x0107);
        assert_eq!(added.opacity, 0x1234);
        assert_eq!(added.special_flag, SpecialFlag::Unknown(0x55));
        assert_eq!(export_part(&dest.buffer, &added).unwrap(), vec![0xEE; 0x18]);
        assert_eq!(src.buffer, src_snapshot);
        assert_consistent(&dest);
    }

    #[test]
    fn test_add_part_from_invalid_source_entry() {
        let mut dest = two_parts();
        let src = two_parts();
        let mut bogus = src.parts[1];
        bogus.part_length = 0x1000;

        let err = add_part_from_secondary(
            &mut dest.buffer,
            &mut dest.header,
            &mut dest.parts,
            &src.buffer,
            &bogus,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Range(_)));
        assert_eq!(dest.parts.len(), 2);
    }

    #[test]
    fn test_replace_grows_and_shifts_later_parts() {
        let mut f = two_parts();
        let old_second = f.parts[1].part_offset;

        replace_part(&mut f.buffer, &f.header, &mut f.parts, 0, &[0x77; 0x50]).unwrap();

        assert_eq!(f.parts[0].part_length, 0x50);
        assert_eq!(f.parts[1].part_offset, old_second + 0x10);
        assert_eq!(export_part(&f.buffer, &f.parts[0]).unwrap(), vec![0x77; 0x50]);
        assert!(export_part(&f.buffer, &f.parts[1]).unwrap().iter().all(|&b| b == 0xB2));
        assert_consistent(&f);
    }

    #[test]
    fn test_replace_uses_payload_length_not_part_count() {
        let mut f = two_parts();
        replace_part(&mut f.buffer, &f.header, &mut f.parts, 1, &[1; 0x08]).unwrap();

        assert_eq!(f.parts[1].part_length, 0x08);
        assert_ne!(f.parts[1].part_length as usize, f.parts.len());
        assert_consistent(&f);
    }

    #[test]
    fn test_sequence_preserves_invariants() {
        let mut f = two_parts();
        let src = two_parts();

        import_part(&mut f.buffer, &mut f.header, &mut f.parts, &[3; 0x24]).unwrap();
        assert_consistent(&f);
        replace_part(&mut f.buffer, &f.header, &mut f.parts, 1, &[4; 0x04]).unwrap();
        assert_consistent(&f);
        let src_entry = src.parts[0];
        add_part_from_secondary(&mut f.buffer, &mut f.header, &mut f.parts, &src.buffer, &src_entry)
            .unwrap();
        assert_consistent(&f);
        delete_part(&mut f.buffer, &mut f.header, &mut f.parts, 0).unwrap();
        assert_consistent(&f);
        delete_part(&mut f.buffer, &mut f.header, &mut f.parts, 1).unwrap();
        assert_consistent(&f);
        assert_eq!(f.parts.len(), 2);
    }

    #[test]
    fn test_set_part_fields_leaves_other_fields_raw() {
        let mut f = load(
            PmdlBuilder::new()
                .part(0x0301, 0x1234, SpecialFlag::None, vec![1; 0x10])
                .part(0x0302, 0x4321, SpecialFlag::Hideable, vec![2; 0x10])
                .build(),
        );
        let before = f.buffer.clone();
        let update = PartUpdate {
            depth: Some(0x0C),
            ..Default::default()
        };

        set_part_fields(&mut f.buffer, &f.header, &mut f.parts, 1, update).unwrap();

        let reparsed = parse_parts_index(&f.buffer, &f.header).unwrap();
        assert_eq!(reparsed, f.parts);
        assert_eq!(reparsed[0].opacity, 0x1234);
        assert_eq!(reparsed[1].opacity, 0x4321);
        assert_eq!(reparsed[1].part_id, 0x030C);
        assert_eq!(reparsed[1].special_flag, SpecialFlag::Hideable);

        let first = record_offset(f.header.parts_index_offset, 0);
        assert_eq!(
            &f.buffer[first..first + PART_RECORD_SIZE],
            &before[first..first + PART_RECORD_SIZE]
        );
    }

    #[test]
    fn test_set_part_fields_out_of_range() {
        let mut f = two_parts();
        let snapshot = f.buffer.clone();
        let update = PartUpdate {
            opacity: Some(0),
            special_flag: Some(SpecialFlag::Face),
            ..Default::default()
        };

        assert!(set_part_fields(&mut f.buffer, &f.header, &mut f.parts, 2, update).is_err());
        assert_eq!(f.buffer, snapshot);
    }

    #[test]
    fn test_sync_writes_scalar_fields() {
        let mut f = two_parts();
        let offsets: Vec<u32> = f.parts.iter().map(|p| p.part_offset).collect();
        let edits = vec![
            PartEdit {
                depth: 0x10,
                opacity_percent: 0,
                flag_label: "Equip. 1".to_string(),
            },
            PartEdit {
                depth: 0x20,
                opacity_percent: 100,
                flag_label: "something else".to_string(),
            },
        ];

        sync_parts_from_ui(&mut f.buffer, &f.header, &mut f.parts, &edits).unwrap();

        let reparsed = parse_parts_index(&f.buffer, &f.header).unwrap();
        assert_eq!(reparsed, f.parts);
        assert_eq!(reparsed[0].depth(), 0x10);
        assert_eq!(reparsed[0].opacity, 0);
        assert_eq!(reparsed[0].special_flag, SpecialFlag::Equip1);
        assert_eq!(reparsed[1].opacity, 0xFFFF);
        assert_eq!(reparsed[1].special_flag, SpecialFlag::None);
        assert_eq!(reparsed.iter().map(|p| p.part_offset).collect::<Vec<_>>(), offsets);
    }

    #[test]
    fn test_sync_preserves_unknown_flag_through_its_label() {
        let mut f = load(
            PmdlBuilder::new()
                .part(0x0300, 0xFFFF, SpecialFlag::Unknown(0x42), vec![1; 0x10])
                .build(),
        );
        let edits: Vec<PartEdit> = f.parts.iter().map(PartEdit::from_entry).collect();

        sync_parts_from_ui(&mut f.buffer, &f.header, &mut f.parts, &edits).unwrap();

        assert_eq!(f.parts[0].special_flag, SpecialFlag::Unknown(0x42));
        assert_eq!(f.parts[0].part_id, 0x0300);
    }
}
