//! Enumerates `objects/pack/*.idx` siblings and dispatches lookups across
//! the resulting pack files.

use std::path::Path;

use gitver_hash::ObjectId;
use gitver_pack::cache::PackId;
use gitver_pack::{PackError, PackFile, PackIndex};

use crate::OdbError;

/// All packs discovered under one object directory, opened once at
/// `ObjectStore` construction. Enumeration order is newest-`.idx`-mtime
/// first, matching the convention of preferring recently written packs;
/// a pack whose index or data fails to open is skipped rather than
/// failing the whole set.
pub struct PackSet {
    packs: Vec<PackFile>,
}

impl PackSet {
    pub fn open(objects_dir: &Path, use_mapped_index: bool) -> Result<Self, OdbError> {
        let pack_dir = objects_dir.join("pack");
        if !pack_dir.is_dir() {
            return Ok(Self { packs: Vec::new() });
        }

        let mut entries: Vec<_> = std::fs::read_dir(&pack_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "idx"))
            .collect();

        entries.sort_by(|a, b| {
            let a_time = a.metadata().and_then(|m| m.modified()).ok();
            let b_time = b.metadata().and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        let mut packs = Vec::new();
        for entry in entries {
            let idx_path = entry.path();
            let pack_path = idx_path.with_extension("pack");
            match Self::open_one(&idx_path, &pack_path, use_mapped_index) {
                Ok(pack) => packs.push(pack),
                Err(error) => {
                    tracing::warn!(path = %idx_path.display(), %error, "skipping unreadable pack");
                }
            }
        }

        tracing::debug!(count = packs.len(), dir = %pack_dir.display(), "packs discovered");
        Ok(Self { packs })
    }

    fn open_one(idx_path: &Path, pack_path: &Path, use_mapped_index: bool) -> Result<PackFile, PackError> {
        let index = PackIndex::open(idx_path, use_mapped_index)?;
        PackFile::open(pack_path, index)
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PackId, &PackFile)> {
        self.packs.iter().enumerate()
    }

    pub fn get(&self, id: PackId) -> Option<&PackFile> {
        self.packs.get(id)
    }

    /// First pack (in enumeration order) containing `oid`, and its offset.
    pub fn locate(&self, oid: &ObjectId) -> Result<Option<(PackId, u64)>, OdbError> {
        for (id, pack) in self.iter() {
            if let Some(offset) = pack.offset_of(oid)? {
                return Ok(Some((id, offset)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_objects_dir_has_no_packs() {
        let dir = tempfile::tempdir().unwrap();
        let set = PackSet::open(dir.path(), true).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn missing_pack_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let set = PackSet::open(&dir.path().join("nonexistent"), true).unwrap();
        assert!(set.is_empty());
    }
}
