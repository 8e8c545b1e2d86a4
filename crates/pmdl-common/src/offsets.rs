//! Offset cascading and buffer alignment.
//!
//! Every index table in a PMDL file stores byte offsets into the region that
//! follows it. Whenever bytes are inserted, removed or resized, every entry
//! positioned after the edit point has to move by exactly the same delta.
//! [`shift_offsets`] is the one place that arithmetic happens.

use std::ops::Range;

use crate::RangeError;

/// An index entry carrying a 32-bit byte offset.
pub trait Relocatable {
    /// The stored offset.
    fn offset(&self) -> u32;

    /// Overwrite the stored offset.
    fn set_offset(&mut self, offset: u32);
}

/// Shift the offset of every entry at position `from` or later by `delta`.
///
/// Either every entry moves or none does: all results are computed before any
/// entry is written.
///
/// # Example
///
/// ```
/// use pmdl_common::{shift_offsets, Relocatable};
///
/// struct Slot(u32);
///
/// impl Relocatable for Slot {
///     fn offset(&self) -> u32 { self.0 }
///     fn set_offset(&mut self, offset: u32) { self.0 = offset; }
/// }
///
/// let mut slots = [Slot(0x10), Slot(0x20), Slot(0x30)];
/// shift_offsets(&mut slots, 1, -0x8).unwrap();
/// assert_eq!(slots.iter().map(|s| s.0).collect::<Vec<_>>(), [0x10, 0x18, 0x28]);
/// ```
pub fn shift_offsets<T: Relocatable>(
    entries: &mut [T],
    from: usize,
    delta: i64,
) -> Result<(), RangeError> {
    if delta == 0 || from >= entries.len() {
        return Ok(());
    }

    let shifted = entries[from..]
        .iter()
        .map(|entry| {
            let offset = entry.offset();
            i64::from(offset)
                .checked_add(delta)
                .and_then(|value| u32::try_from(value).ok())
                .ok_or(RangeError::OffsetOverflow { offset, delta })
        })
        .collect::<Result<Vec<u32>, RangeError>>()?;

    for (entry, offset) in entries[from..].iter_mut().zip(shifted) {
        entry.set_offset(offset);
    }
    Ok(())
}

/// Validate that `offset..offset + length` lies inside a buffer of
/// `buffer_len` bytes. Empty ranges are allowed.
pub fn bounded_range(
    offset: u64,
    length: u64,
    buffer_len: usize,
) -> Result<Range<usize>, RangeError> {
    let err = RangeError::OutOfBounds {
        offset,
        length,
        buffer_len,
    };

    let end = offset.checked_add(length).ok_or_else(|| err.clone())?;
    if end > buffer_len as u64 {
        return Err(err);
    }
    Ok(offset as usize..end as usize)
}

/// Like [`bounded_range`], but the range must also be non-empty.
pub fn checked_range(
    offset: u64,
    length: u64,
    buffer_len: usize,
) -> Result<Range<usize>, RangeError> {
    if length == 0 {
        return Err(RangeError::OutOfBounds {
            offset,
            length,
            buffer_len,
        });
    }
    bounded_range(offset, length, buffer_len)
}

/// Round `len` up to the next multiple of 16.
#[inline]
pub const fn aligned_16(len: usize) -> usize {
    (len + 15) & !15
}

/// Zero-pad `buffer` until its length is a multiple of 16.
pub fn align_16(buffer: &mut Vec<u8>) {
    let target = aligned_16(buffer.len());
    buffer.resize(target, 0);
}
