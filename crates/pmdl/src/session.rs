//! Editing session over a primary and an optional secondary file.
//!
//! The primary file is the one being edited. The secondary is only read,
//! as a source for parts and subparts to copy over. Each [`Document`] keeps
//! a [`PartBuffers`] cache with the parsed subparts of the parts that have
//! been looked at. Subpart edits run on a cached buffer and are folded back
//! into the file with `replace_part` before the cache is updated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pmdl_model::{PartEdit, PartUpdate, PmdlFile};
use pmdl_subparts::{PartBuffer, SubPartFile};
use tracing::debug;

use crate::naming::file_stem;
use crate::{Error, Result};

/// Parsed subparts of a file's parts, keyed by part index.
#[derive(Debug, Clone, Default)]
pub struct PartBuffers {
    parts: HashMap<usize, PartBuffer>,
}

impl PartBuffers {
    /// Get a cached part.
    pub fn get(&self, part: usize) -> Option<&PartBuffer> {
        self.parts.get(&part)
    }

    /// Get part `part`, parsing it out of `file` on first use.
    pub fn load(&mut self, file: &PmdlFile, part: usize) -> Result<&PartBuffer> {
        use std::collections::hash_map::Entry;

        let buffer: &PartBuffer = match self.parts.entry(part) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(PartBuffer::parse(file.export_part(part)?)?),
        };
        Ok(buffer)
    }

    /// Store a freshly edited part.
    pub fn insert(&mut self, part: usize, buffer: PartBuffer) {
        self.parts.insert(part, buffer);
    }

    /// Forget part `part`, so it is re-parsed on next use.
    pub fn invalidate(&mut self, part: usize) {
        self.parts.remove(&part);
    }

    /// Forget every cached part.
    pub fn clear(&mut self) {
        self.parts.clear();
    }

    /// Number of cached parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether no part is cached.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// An open PMDL file with its subparts cache.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    file: PmdlFile,
    buffers: PartBuffers,
}

impl Document {
    /// Wrap an already parsed file.
    pub fn new(path: impl Into<PathBuf>, file: PmdlFile) -> Self {
        Self {
            path: path.into(),
            file,
            buffers: PartBuffers::default(),
        }
    }

    /// Read and parse a file from disk.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = PmdlFile::open(&path)?;
        Ok(Self::new(path, file))
    }

    /// Path the document is read from and saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem used to name exported sidecars.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }

    /// The parsed file.
    pub fn file(&self) -> &PmdlFile {
        &self.file
    }

    /// Subpart cache.
    pub fn buffers(&self) -> &PartBuffers {
        &self.buffers
    }

    /// Write back to the path the document was opened from.
    pub fn save(&self) -> Result<()> {
        self.file.save(&self.path)?;
        debug!(path = %self.path.display(), "saved pmdl");
        Ok(())
    }

    /// Write to `path` and make it the document's path.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.path = path.into();
        self.save()
    }

    /// Subparts of part `part`.
    pub fn part_buffer(&mut self, part: usize) -> Result<&PartBuffer> {
        self.buffers.load(&self.file, part)
    }

    /// Run `edit` on a copy of part `part` and fold the result back into the
    /// file. Nothing changes if either step fails.
    pub fn edit_part<T>(
        &mut self,
        part: usize,
        edit: impl FnOnce(&mut PartBuffer) -> pmdl_subparts::Result<T>,
    ) -> Result<T> {
        let mut scratch = self.part_buffer(part)?.clone();
        let out = edit(&mut scratch)?;
        self.file.replace_part(part, scratch.data())?;
        self.buffers.insert(part, scratch);
        Ok(out)
    }

    // Part level

    /// Copy the bytes of part `index`.
    pub fn export_part(&self, index: usize) -> Result<Vec<u8>> {
        Ok(self.file.export_part(index)?)
    }

    /// Remove part `index`.
    pub fn delete_part(&mut self, index: usize) -> Result<()> {
        self.file.delete_part(index)?;
        // Later parts were renumbered.
        self.buffers.clear();
        Ok(())
    }

    /// Append a new part with default index fields.
    pub fn import_part(&mut self, data: &[u8]) -> Result<(u32, u32)> {
        Ok(self.file.import_part(data)?)
    }

    /// Append a copy of part `index` of `source`.
    pub fn add_part_from(&mut self, source: &PmdlFile, index: usize) -> Result<(u32, u32)> {
        Ok(self.file.add_part_from(source, index)?)
    }

    /// Replace the data of part `index`.
    pub fn replace_part(&mut self, index: usize, data: &[u8]) -> Result<()> {
        self.file.replace_part(index, data)?;
        self.buffers.invalidate(index);
        Ok(())
    }

    /// Overwrite depth, opacity or flag of part `index` only.
    pub fn set_part_fields(&mut self, index: usize, update: PartUpdate) -> Result<()> {
        Ok(self.file.set_part_fields(index, update)?)
    }

    /// Apply depth/opacity/flag edits positionally.
    pub fn sync_from_edits(&mut self, edits: &[PartEdit]) -> Result<()> {
        Ok(self.file.sync_parts(edits)?)
    }

    // Subpart level

    /// Export subpart `index` of part `part` in sidecar form.
    pub fn export_subpart(&mut self, part: usize, index: usize) -> Result<SubPartFile> {
        Ok(self.part_buffer(part)?.export_sidecar(index)?)
    }

    /// Replace a subpart with the contents of a sidecar. Returns the size
    /// change.
    pub fn replace_subpart(
        &mut self,
        part: usize,
        index: usize,
        sidecar: &SubPartFile,
    ) -> Result<i64> {
        self.edit_part(part, |buffer| {
            buffer.replace_subpart(index, sidecar.fields, &sidecar.vertices)
        })
    }

    /// Insert sidecars in order, the first after `after` and each following
    /// one after the previous. Returns the final offsets of the new blocks.
    pub fn insert_subparts(
        &mut self,
        part: usize,
        after: Option<usize>,
        sidecars: &[SubPartFile],
    ) -> Result<Vec<u32>> {
        self.edit_part(part, |buffer| {
            let mut anchor = after;
            let mut slots = Vec::with_capacity(sidecars.len());
            for sidecar in sidecars {
                buffer.insert_subpart(anchor, sidecar.fields, &sidecar.vertices)?;
                let slot = anchor.map_or(0, |i| i + 1);
                slots.push(slot);
                anchor = Some(slot);
            }
            Ok(slots
                .into_iter()
                .map(|slot| buffer.subparts()[slot].sub_part_offset)
                .collect())
        })
    }

    /// Insert a copy of subpart `source_index` of `source` after `after`.
    pub fn insert_subpart_from(
        &mut self,
        part: usize,
        after: Option<usize>,
        source: &PartBuffer,
        source_index: usize,
    ) -> Result<(usize, u32)> {
        self.edit_part(part, |buffer| buffer.insert_from(after, source, source_index))
    }

    /// Delete several subparts. Returns the removed block bytes.
    pub fn delete_subparts(&mut self, part: usize, indices: &[usize]) -> Result<usize> {
        self.edit_part(part, |buffer| buffer.delete_subparts(indices))
    }

    /// Overwrite the bone ids of one subpart.
    pub fn set_bone_ids(&mut self, part: usize, index: usize, id_bones: [u8; 4]) -> Result<()> {
        self.edit_part(part, |buffer| buffer.set_bone_ids(index, id_bones))
    }

    /// Overwrite the unknown field of one subpart.
    pub fn set_unk(&mut self, part: usize, index: usize, unk: u32) -> Result<()> {
        self.edit_part(part, |buffer| buffer.set_unk(index, unk))
    }
}

/// The files open in one editing session.
#[derive(Debug, Default)]
pub struct Session {
    primary: Option<Document>,
    secondary: Option<Document>,
}

impl Session {
    /// Create a session with no files open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the file to edit, replacing any previous primary.
    pub fn open_primary(&mut self, path: impl Into<PathBuf>) -> Result<&mut Document> {
        let document = Document::open(path)?;
        Ok(self.primary.insert(document))
    }

    /// Open the file to copy from, replacing any previous secondary.
    pub fn open_secondary(&mut self, path: impl Into<PathBuf>) -> Result<&mut Document> {
        let document = Document::open(path)?;
        Ok(self.secondary.insert(document))
    }

    /// The file being edited.
    pub fn primary(&self) -> Result<&Document> {
        self.primary.as_ref().ok_or(Error::NoPrimary)
    }

    /// The file being edited, mutably.
    pub fn primary_mut(&mut self) -> Result<&mut Document> {
        self.primary.as_mut().ok_or(Error::NoPrimary)
    }

    /// The file to copy from.
    pub fn secondary(&self) -> Result<&Document> {
        self.secondary.as_ref().ok_or(Error::NoSecondary)
    }

    /// The file to copy from, mutably (its subpart cache fills lazily).
    pub fn secondary_mut(&mut self) -> Result<&mut Document> {
        self.secondary.as_mut().ok_or(Error::NoSecondary)
    }

    /// Drop the primary file and its cache.
    pub fn close_primary(&mut self) -> Option<Document> {
        self.primary.take()
    }

    /// Drop the secondary file and its cache.
    pub fn close_secondary(&mut self) -> Option<Document> {
        self.secondary.take()
    }

    /// Append a copy of secondary part `index` to the primary.
    pub fn add_part_from_secondary(&mut self, index: usize) -> Result<(u32, u32)> {
        let primary = self.primary.as_mut().ok_or(Error::NoPrimary)?;
        let secondary = self.secondary.as_ref().ok_or(Error::NoSecondary)?;
        primary.add_part_from(secondary.file(), index)
    }

    /// Insert a copy of secondary subpart `source_index` of part
    /// `source_part` into primary part `part`, after subpart `after`.
    pub fn add_subpart_from_secondary(
        &mut self,
        part: usize,
        after: Option<usize>,
        source_part: usize,
        source_index: usize,
    ) -> Result<(usize, u32)> {
        let primary = self.primary.as_mut().ok_or(Error::NoPrimary)?;
        let secondary = self.secondary.as_mut().ok_or(Error::NoSecondary)?;
        let source = secondary.part_buffer(source_part)?;
        primary.insert_subpart_from(part, after, source, source_index)
    }

    /// Apply depth/opacity/flag edits to the primary.
    pub fn sync_from_edits(&mut self, edits: &[PartEdit]) -> Result<()> {
        self.primary_mut()?.sync_from_edits(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmdl_model::{PmdlBuilder, SpecialFlag};
    use pmdl_subparts::SubPartFields;

    fn fields(num_vertices: u8, num_bones: u8) -> SubPartFields {
        SubPartFields {
            num_vertices,
            num_bones,
            ..Default::default()
        }
    }

    fn part_with(blocks: &[(SubPartFields, u8)]) -> Vec<u8> {
        let vertices: Vec<Vec<u8>> = blocks
            .iter()
            .map(|(f, fill)| vec![*fill; f.byte_length()])
            .collect();
        let layout: Vec<(SubPartFields, &[u8])> = blocks
            .iter()
            .zip(&vertices)
            .map(|((f, _), v)| (*f, v.as_slice()))
            .collect();
        PartBuffer::build(&layout).unwrap().into_bytes()
    }

    fn sample_file() -> PmdlFile {
        let data = PmdlBuilder::new()
            .bones(2, vec![0xB0; 0x20])
            .part(
                0x0100,
                0xFFFF,
                SpecialFlag::None,
                part_with(&[(fields(2, 0), 0xA1), (fields(1, 1), 0xA2)]),
            )
            .part(
                0x0101,
                0x8000,
                SpecialFlag::Face,
                part_with(&[(fields(3, 2), 0xB1)]),
            )
            .build();
        PmdlFile::parse(data).unwrap()
    }

    #[test]
    fn test_subpart_edit_folds_back_into_file() {
        let mut doc = Document::new("mem.pmdl", sample_file());
        let second_part_before = doc.export_part(1).unwrap();

        let grown = SubPartFile {
            fields: fields(3, 0),
            vertices: vec![0xEE; 24],
        };
        let delta = doc.replace_subpart(0, 0, &grown).unwrap();
        assert_eq!(delta, 8);

        let reparsed = PartBuffer::parse(doc.export_part(0).unwrap()).unwrap();
        assert_eq!(&reparsed, doc.buffers().get(0).unwrap());
        assert_eq!(reparsed.export_subpart(0).unwrap(), vec![0xEE; 24]);
        assert_eq!(reparsed.export_subpart(1).unwrap(), vec![0xA2; 10]);
        assert_eq!(doc.export_part(1).unwrap(), second_part_before);
    }

    #[test]
    fn test_failed_edit_leaves_document_untouched() {
        let mut doc = Document::new("mem.pmdl", sample_file());
        let before = doc.file().data().to_vec();

        let bad = SubPartFile {
            fields: fields(1, 0),
            vertices: vec![0; 7],
        };
        assert!(doc.replace_subpart(0, 0, &bad).is_err());
        assert!(doc.insert_subparts(0, Some(0), &[bad.clone(), bad]).is_err());
        assert!(doc.delete_subparts(0, &[5]).is_err());

        assert_eq!(doc.file().data(), before.as_slice());
    }

    #[test]
    fn test_insert_subparts_chain() {
        let mut doc = Document::new("mem.pmdl", sample_file());
        let sidecars: Vec<SubPartFile> = [0x11, 0x22]
            .into_iter()
            .map(|fill| SubPartFile {
                fields: fields(1, 0),
                vertices: vec![fill; 8],
            })
            .collect();

        let offsets = doc.insert_subparts(0, Some(0), &sidecars).unwrap();
        assert_eq!(offsets.len(), 2);

        let part = doc.part_buffer(0).unwrap().clone();
        let fills: Vec<u8> = (0..4).map(|i| part.export_subpart(i).unwrap()[0]).collect();
        assert_eq!(fills, vec![0xA1, 0x11, 0x22, 0xA2]);
        assert_eq!(part.subparts()[1].sub_part_offset, offsets[0]);
        assert_eq!(part.subparts()[2].sub_part_offset, offsets[1]);
    }

    #[test]
    fn test_delete_part_clears_cache() {
        let mut doc = Document::new("mem.pmdl", sample_file());
        doc.part_buffer(0).unwrap();
        doc.part_buffer(1).unwrap();
        assert_eq!(doc.buffers().len(), 2);

        doc.delete_part(0).unwrap();
        assert!(doc.buffers().is_empty());
        assert_eq!(doc.part_buffer(0).unwrap().subparts().len(), 1);
    }

    #[test]
    fn test_session_requires_open_files() {
        let mut session = Session::new();

        assert!(matches!(session.primary(), Err(Error::NoPrimary)));
        assert!(matches!(session.sync_from_edits(&[]), Err(Error::NoPrimary)));

        session.primary = Some(Document::new("a.pmdl", sample_file()));
        assert!(matches!(session.add_part_from_secondary(0), Err(Error::NoSecondary)));
        assert!(matches!(
            session.add_subpart_from_secondary(0, None, 0, 0),
            Err(Error::NoSecondary)
        ));

        assert!(session.close_primary().is_some());
        assert!(session.primary().is_err());
    }

    #[test]
    fn test_copy_from_secondary() {
        let dir = tempfile::tempdir().unwrap();
        let primary_path = dir.path().join("a.pmdl");
        let secondary_path = dir.path().join("b.pmdl");
        sample_file().save(&primary_path).unwrap();
        sample_file().save(&secondary_path).unwrap();

        let mut session = Session::new();
        session.open_primary(&primary_path).unwrap();
        session.open_secondary(&secondary_path).unwrap();
        let secondary_before = session.secondary().unwrap().file().data().to_vec();

        session.add_part_from_secondary(1).unwrap();
        session.add_subpart_from_secondary(0, Some(1), 1, 0).unwrap();
        session.primary().unwrap().save().unwrap();

        let reopened = PmdlFile::open(&primary_path).unwrap();
        assert_eq!(reopened.parts().len(), 3);
        assert_eq!(reopened.parts()[2].special_flag, SpecialFlag::Face);

        let part = PartBuffer::parse(reopened.export_part(0).unwrap()).unwrap();
        assert_eq!(part.subparts().len(), 3);
        assert_eq!(part.subparts()[2].fields(), fields(3, 2));
        assert_eq!(part.export_subpart(2).unwrap(), vec![0xB1; 36]);

        assert_eq!(session.secondary().unwrap().file().data(), secondary_before.as_slice());
    }

    #[test]
    fn test_sync_and_field_edits() {
        let mut doc = Document::new("mem.pmdl", sample_file());
        let mut edits: Vec<PartEdit> =
            doc.file().parts().iter().map(PartEdit::from_entry).collect();
        edits[1].depth = 0x07;
        edits[1].opacity_percent = 100;

        doc.sync_from_edits(&edits).unwrap();
        doc.set_bone_ids(1, 0, [9, 8, 0, 0]).unwrap();
        doc.set_unk(1, 0, 0xDEAD).unwrap();

        let reparsed = PmdlFile::parse(doc.file().data().to_vec()).unwrap();
        assert_eq!(reparsed.parts()[1].depth(), 0x07);
        assert_eq!(reparsed.parts()[1].opacity, 0xFFFF);
        let part = PartBuffer::parse(reparsed.export_part(1).unwrap()).unwrap();
        assert_eq!(part.subparts()[0].id_bones, [9, 8, 0, 0]);
        assert_eq!(part.subparts()[0].unk, 0xDEAD);
    }

    #[test]
    fn test_stem_and_save_as() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new("Ryu.pmdl", sample_file());
        assert_eq!(doc.stem(), "Ryu");

        let out = dir.path().join("Ken.pmdl");
        doc.save_as(&out).unwrap();
        assert_eq!(doc.stem(), "Ken");
        assert_eq!(PmdlFile::open(&out).unwrap().data(), doc.file().data());
    }
}
