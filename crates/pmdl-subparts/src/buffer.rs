//! Subpart-level editing on one part's bytes.
//!
//! A [`PartBuffer`] owns the exported bytes of a single part together with
//! its parsed subparts index. Every edit rewrites the embedded table, trims
//! the buffer to the end of the last vertex block and pads it to 16 bytes.
//! Folding the result back into the file is the caller's job (see
//! `pmdl_model::PmdlFile::replace_part`).
//!
//! Edits run against a scratch copy and are only committed when every step
//! succeeded, so a failed call leaves the buffer untouched.

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};
use pmdl_common::{align_16, shift_offsets, RangeError, ValidationError};
use tracing::debug;

use crate::index::{
    parse_subparts, record_offset, SubPartFields, SubPartIndexEntry, SUBPART_RECORD_SIZE,
};
use crate::sidecar::SubPartFile;
use crate::Result;

const RECORD_DELTA: i64 = SUBPART_RECORD_SIZE as i64;

/// Range of an entry's vertex block. Empty blocks are allowed.
fn block_range(data_len: usize, entry: &SubPartIndexEntry) -> Result<Range<usize>> {
    if entry.end() > data_len as u64 {
        return Err(RangeError::OutOfBounds {
            offset: u64::from(entry.sub_part_offset),
            length: entry.byte_length() as u64,
            buffer_len: data_len,
        }
        .into());
    }
    Ok(entry.sub_part_offset as usize..entry.end() as usize)
}

fn check_payload(fields: &SubPartFields, vertex_bytes: &[u8]) -> Result<()> {
    if vertex_bytes.is_empty() {
        return Err(ValidationError::Empty.into());
    }
    if vertex_bytes.len() != fields.byte_length() {
        return Err(ValidationError::SizeMismatch {
            expected: fields.byte_length(),
            actual: vertex_bytes.len(),
        }
        .into());
    }
    Ok(())
}

fn table_range_error(count: usize, data_len: usize) -> RangeError {
    RangeError::OutOfBounds {
        offset: 0,
        length: record_offset(count) as u64,
        buffer_len: data_len,
    }
}

/// Copy one vertex block out of a part.
pub fn export_subpart(part_bytes: &[u8], entry: &SubPartIndexEntry) -> Result<Vec<u8>> {
    let range = block_range(part_bytes.len(), entry)?;
    Ok(part_bytes[range].to_vec())
}

/// Trim `part_bytes` to the end of the last vertex block (or of the empty
/// table) and zero-pad to a multiple of 16.
pub fn finalize(part_bytes: &mut Vec<u8>, subparts: &[SubPartIndexEntry]) -> Result<()> {
    let end = match subparts.last() {
        Some(last) => last.end(),
        None => record_offset(0) as u64,
    };
    if end > part_bytes.len() as u64 {
        return Err(RangeError::OutOfBounds {
            offset: 0,
            length: end,
            buffer_len: part_bytes.len(),
        }
        .into());
    }

    part_bytes.truncate(end as usize);
    align_16(part_bytes);
    Ok(())
}

/// Write the count and every record from `subparts` into the table at the
/// start of `part_bytes`. Record bytes 0x01 and 0x03 are left as they are.
fn write_table(part_bytes: &mut [u8], subparts: &[SubPartIndexEntry]) -> Result<()> {
    if record_offset(subparts.len()) > part_bytes.len() {
        return Err(table_range_error(subparts.len(), part_bytes.len()).into());
    }

    LittleEndian::write_u32(&mut part_bytes[..4], subparts.len() as u32);
    for (i, entry) in subparts.iter().enumerate() {
        let record = &mut part_bytes[record_offset(i)..record_offset(i + 1)];
        record[0x00] = entry.num_vertices;
        record[0x02] = entry.num_bones;
        record[0x04..0x08].copy_from_slice(&entry.id_bones);
        LittleEndian::write_u32(&mut record[0x08..], entry.unk);
        LittleEndian::write_u32(&mut record[0x0C..], entry.sub_part_offset);
    }
    Ok(())
}

/// One part's bytes and its subparts index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartBuffer {
    data: Vec<u8>,
    subparts: Vec<SubPartIndexEntry>,
}

impl PartBuffer {
    /// Parse the subparts index of an exported part.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let subparts = parse_subparts(&data)?;
        Ok(Self { data, subparts })
    }

    /// Build a part from scratch out of vertex blocks laid out in order
    /// directly after the table.
    pub fn build(blocks: &[(SubPartFields, &[u8])]) -> Result<Self> {
        let mut data = vec![0u8; record_offset(blocks.len())];
        let mut subparts = Vec::with_capacity(blocks.len());

        for (i, (fields, vertices)) in blocks.iter().enumerate() {
            if vertices.len() != fields.byte_length() {
                return Err(ValidationError::SizeMismatch {
                    expected: fields.byte_length(),
                    actual: vertices.len(),
                }
                .into());
            }
            subparts.push(SubPartIndexEntry::new(i, *fields, data.len() as u32));
            data.extend_from_slice(vertices);
        }

        let mut part = Self { data, subparts };
        part.commit_table()?;
        Ok(part)
    }

    /// Get the part bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning the part bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Get the subparts index.
    pub fn subparts(&self) -> &[SubPartIndexEntry] {
        &self.subparts
    }

    /// Get one subparts index entry.
    pub fn subpart(&self, index: usize) -> Result<&SubPartIndexEntry> {
        self.subparts.get(index).ok_or_else(|| {
            ValidationError::IndexOutOfBounds {
                index,
                len: self.subparts.len(),
            }
            .into()
        })
    }

    /// Copy the vertex block of subpart `index`.
    pub fn export_subpart(&self, index: usize) -> Result<Vec<u8>> {
        export_subpart(&self.data, self.subpart(index)?)
    }

    /// Export subpart `index` in sidecar form (record header + vertices).
    pub fn export_sidecar(&self, index: usize) -> Result<SubPartFile> {
        let entry = self.subpart(index)?;
        Ok(SubPartFile {
            fields: entry.fields(),
            vertices: export_subpart(&self.data, entry)?,
        })
    }

    /// Trim to the last vertex block and align to 16 bytes.
    pub fn finalize(&mut self) -> Result<()> {
        finalize(&mut self.data, &self.subparts)
    }

    fn commit_table(&mut self) -> Result<()> {
        write_table(&mut self.data, &self.subparts)?;
        finalize(&mut self.data, &self.subparts)
    }

    fn transact<T>(&mut self, edit: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mut scratch = self.clone();
        let out = edit(&mut scratch)?;
        *self = scratch;
        Ok(out)
    }

    /// Replace the vertex block of subpart `index`, taking the record fields
    /// from `fields`. Later blocks move by the size difference, which is
    /// returned.
    pub fn replace_subpart(
        &mut self,
        index: usize,
        fields: SubPartFields,
        vertex_bytes: &[u8],
    ) -> Result<i64> {
        check_payload(&fields, vertex_bytes)?;

        self.transact(|part| {
            let entry = *part.subpart(index)?;
            let range = block_range(part.data.len(), &entry)?;
            let delta = vertex_bytes.len() as i64 - range.len() as i64;

            shift_offsets(&mut part.subparts, index + 1, delta)?;
            part.subparts[index] = SubPartIndexEntry::new(index, fields, entry.sub_part_offset);
            part.data.splice(range, vertex_bytes.iter().copied());
            part.commit_table()?;

            debug!(index, delta, "replaced subpart");
            Ok(delta)
        })
    }

    /// Insert a new subpart directly after subpart `after`, or at the front
    /// when `after` is `None`.
    ///
    /// Returns the inserted block length and the new block's offset.
    pub fn insert_subpart(
        &mut self,
        after: Option<usize>,
        fields: SubPartFields,
        vertex_bytes: &[u8],
    ) -> Result<(usize, u32)> {
        check_payload(&fields, vertex_bytes)?;
        if let Some(anchor) = after {
            self.subpart(anchor)?;
        }

        self.transact(|part| {
            let count = part.subparts.len();
            if record_offset(count) > part.data.len() {
                return Err(table_range_error(count, part.data.len()).into());
            }

            // Grow the table by one record.
            let slot = after.map_or(0, |anchor| anchor + 1);
            let record_at = record_offset(slot);
            part.data
                .splice(record_at..record_at, [0u8; SUBPART_RECORD_SIZE]);
            shift_offsets(&mut part.subparts, 0, RECORD_DELTA)?;

            let insert_at = match after {
                Some(anchor) => part.subparts[anchor].end(),
                None => part
                    .subparts
                    .first()
                    .map_or(record_offset(count + 1) as u64, |first| {
                        u64::from(first.sub_part_offset)
                    }),
            };
            if insert_at > part.data.len() as u64 {
                return Err(RangeError::OutOfBounds {
                    offset: insert_at,
                    length: vertex_bytes.len() as u64,
                    buffer_len: part.data.len(),
                }
                .into());
            }
            let new_offset = insert_at as u32;

            let at = insert_at as usize;
            part.data.splice(at..at, vertex_bytes.iter().copied());
            part.subparts
                .insert(slot, SubPartIndexEntry::new(slot, fields, new_offset));
            shift_offsets(&mut part.subparts, slot + 1, vertex_bytes.len() as i64)?;
            part.reindex();
            part.commit_table()?;

            debug!(slot, offset = new_offset, length = vertex_bytes.len(), "inserted subpart");
            Ok((vertex_bytes.len(), new_offset))
        })
    }

    /// Insert a copy of subpart `source_index` of another part after
    /// subpart `after`. `source` is only read.
    pub fn insert_from(
        &mut self,
        after: Option<usize>,
        source: &PartBuffer,
        source_index: usize,
    ) -> Result<(usize, u32)> {
        let sidecar = source.export_sidecar(source_index)?;
        self.insert_subpart(after, sidecar.fields, &sidecar.vertices)
    }

    /// Remove subpart `index` and its record. Returns the removed block
    /// length.
    pub fn delete_subpart(&mut self, index: usize) -> Result<usize> {
        self.transact(|part| part.remove_one(index))
    }

    /// Remove several subparts at once. Returns the total removed block
    /// length.
    pub fn delete_subparts(&mut self, indices: &[usize]) -> Result<usize> {
        let mut order = indices.to_vec();
        order.sort_unstable_by(|a, b| b.cmp(a));
        order.dedup();

        self.transact(|part| {
            let mut removed = 0;
            for index in order {
                removed += part.remove_one(index)?;
            }
            Ok(removed)
        })
    }

    fn remove_one(&mut self, index: usize) -> Result<usize> {
        let entry = *self.subpart(index)?;
        let block = block_range(self.data.len(), &entry)?;
        let record = record_offset(index)..record_offset(index + 1);
        if record.end > block.start {
            return Err(table_range_error(self.subparts.len(), block.start).into());
        }

        let removed = block.len();
        self.data.drain(block);
        self.data.drain(record);

        self.subparts.remove(index);
        shift_offsets(&mut self.subparts, 0, -RECORD_DELTA)?;
        shift_offsets(&mut self.subparts, index, -(removed as i64))?;
        self.reindex();
        self.commit_table()?;

        debug!(index, removed, "deleted subpart");
        Ok(removed)
    }

    /// Overwrite the bone ids of subpart `index`.
    pub fn set_bone_ids(&mut self, index: usize, id_bones: [u8; 4]) -> Result<()> {
        self.transact(|part| {
            part.subpart(index)?;
            part.subparts[index].id_bones = id_bones;
            write_table(&mut part.data, &part.subparts)
        })
    }

    /// Overwrite the unknown field of subpart `index`.
    pub fn set_unk(&mut self, index: usize, unk: u32) -> Result<()> {
        self.transact(|part| {
            part.subpart(index)?;
            part.subparts[index].unk = unk;
            write_table(&mut part.data, &part.subparts)
        })
    }

    fn reindex(&mut self) {
        for (i, entry) in self.subparts.iter_mut().enumerate() {
            entry.sub_part = i;
        }
    }
}
