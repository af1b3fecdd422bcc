//! Unified, read-only object lookup across loose storage and pack files.
//!
//! An [`ObjectStore`] is the thing a `Repository` actually asks for bytes:
//! it tries loose storage first (a missing loose file is not an error, it
//! just falls through), then every discovered pack in turn, threading one
//! shared [`PackObjectCache`] through every pack access.

pub mod pack_set;

use std::path::{Path, PathBuf};

use gitver_hash::ObjectId;
use gitver_loose::LooseObjectReader;
use gitver_object::ObjectType;
use gitver_pack::cache::CacheLimit;
use gitver_pack::pack::PackedObject;
use gitver_pack::{PackError, PackObjectCache};

pub use pack_set::PackSet;

#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("object type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },
    #[error("invalid object id prefix: {0}")]
    InvalidObjectId(String),
    #[error(transparent)]
    Loose(#[from] gitver_loose::LooseError),
    #[error(transparent)]
    Pack(#[from] gitver_pack::PackError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Structured reader configuration (spec's `UseMappedIndex` /
/// `CacheLimitBytes`), not strings — passed down from `gitver-repo`.
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    pub use_mapped_index: bool,
    pub cache_limit: CacheLimit,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            use_mapped_index: true,
            cache_limit: CacheLimit::Unbounded,
        }
    }
}

/// Loose storage + every discovered pack, behind one `read`/`contains`
/// surface. Owns the single `PackObjectCache` shared across all packs for
/// the lifetime of the enclosing `Repository`.
pub struct ObjectStore {
    objects_dir: PathBuf,
    loose: LooseObjectReader,
    packs: PackSet,
    cache: PackObjectCache,
}

impl ObjectStore {
    pub fn open(objects_dir: impl AsRef<Path>, options: ReaderOptions) -> Result<Self, OdbError> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        let loose = LooseObjectReader::new(&objects_dir);
        let packs = PackSet::open(&objects_dir, options.use_mapped_index)?;
        let cache = PackObjectCache::new(options.cache_limit);

        tracing::debug!(dir = %objects_dir.display(), packs = packs.len(), "object store opened");

        Ok(Self {
            objects_dir,
            loose,
            packs,
            cache,
        })
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        if oid.is_empty() {
            return false;
        }
        if self.loose.contains(oid) {
            return true;
        }
        matches!(self.packs.locate(oid), Ok(Some(_)))
    }

    /// Read an object's bytes, validating `expected_type` if given.
    ///
    /// `Empty` is "not requested": returns `Ok(None)` without touching
    /// storage. Any other OID absent from every source is `ObjectNotFound`.
    pub fn read(
        &mut self,
        oid: &ObjectId,
        expected_type: Option<ObjectType>,
    ) -> Result<Option<PackedObject>, OdbError> {
        if oid.is_empty() {
            return Ok(None);
        }

        if self.loose.contains(oid) {
            let (obj_type, stream) = self.loose.read(oid)?;
            let data = stream.read_to_vec()?;
            if let Some(expected) = expected_type {
                if obj_type != expected {
                    return Err(OdbError::TypeMismatch {
                        expected,
                        actual: obj_type,
                    });
                }
            }
            return Ok(Some(PackedObject { obj_type, data }));
        }

        if let Some((pack_id, offset)) = self.packs.locate(oid)? {
            let packs = &self.packs;
            let loose = &self.loose;
            let mut resolver = |base_oid: &ObjectId| resolve_external_base(packs, loose, base_oid);
            let pack = packs.get(pack_id).expect("pack_id from locate() is valid");
            let obj = pack.get_object(pack_id, offset, expected_type, &mut self.cache, &mut resolver)?;
            return Ok(Some(obj));
        }

        Err(OdbError::ObjectNotFound(*oid))
    }

    pub fn read_header(&mut self, oid: &ObjectId) -> Result<Option<(ObjectType, usize)>, OdbError> {
        if oid.is_empty() {
            return Ok(None);
        }
        if self.loose.contains(oid) {
            let (obj_type, len) = self.loose.read_header(oid)?;
            return Ok(Some((obj_type, len)));
        }
        // Packs only store offsets, not an independent header; the object
        // must be fully reconstructed to learn its type and size.
        Ok(self.read(oid, None)?.map(|obj| (obj.obj_type, obj.data.len())))
    }

    /// All OIDs whose hex form starts with `hex_prefix` (loose + every
    /// pack). Requires at least 2 hex characters, matching the fan-out
    /// table's granularity; shorter prefixes return no matches.
    pub fn lookup_prefix(&self, hex_prefix: &str) -> Result<Vec<ObjectId>, OdbError> {
        let mut matches = Vec::new();
        if hex_prefix.len() < 2 {
            return Ok(matches);
        }
        let first_byte = u8::from_str_radix(&hex_prefix[..2], 16)
            .map_err(|_| OdbError::InvalidObjectId(hex_prefix.to_string()))?;

        let subdir = self.objects_dir.join(format!("{first_byte:02x}"));
        if subdir.is_dir() {
            for entry in std::fs::read_dir(&subdir)? {
                let entry = entry?;
                let candidate = format!("{first_byte:02x}{}", entry.file_name().to_string_lossy());
                if candidate.starts_with(hex_prefix) {
                    if let Ok(oid) = ObjectId::parse(&candidate) {
                        matches.push(oid);
                    }
                }
            }
        }

        for (_, pack) in self.packs.iter() {
            for (oid, _offset) in pack.index().lookup_prefix(&[first_byte])? {
                if oid.format().starts_with(hex_prefix) {
                    matches.push(oid);
                }
            }
        }

        Ok(matches)
    }
}

/// Ref-delta base lookup that falls outside the pack currently being read:
/// tries loose storage, then every pack in turn, each with its own
/// throwaway cache (cross-pack bases are the rare case; the shared
/// `PackObjectCache` stays reserved for the top-level call that invoked
/// this resolver, avoiding a reentrant borrow of it).
fn resolve_external_base(
    packs: &PackSet,
    loose: &LooseObjectReader,
    oid: &ObjectId,
) -> Result<Option<PackedObject>, PackError> {
    if oid.is_empty() {
        return Ok(None);
    }

    if loose.contains(oid) {
        let (obj_type, stream) = loose
            .read(oid)
            .map_err(|e| PackError::ExternalResolveError(e.to_string()))?;
        let data = stream.read_to_vec().map_err(PackError::Io)?;
        return Ok(Some(PackedObject { obj_type, data }));
    }

    for (pack_id, pack) in packs.iter() {
        if let Some(offset) = pack.offset_of(oid)? {
            let mut local_cache = PackObjectCache::unbounded();
            let mut inner_resolver = |o: &ObjectId| resolve_external_base(packs, loose, o);
            let obj = pack.get_object(pack_id, offset, None, &mut local_cache, &mut inner_resolver)?;
            return Ok(Some(obj));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use gitver_hash::hasher::Hasher;
    use std::io::Write;

    fn write_loose_object(objects_dir: &Path, obj_type: &str, content: &[u8]) -> ObjectId {
        let oid = Hasher::hash_object(obj_type, content).unwrap();
        let (subdir, file) = oid.loose_path_parts();
        let dir = objects_dir.join(&subdir);
        std::fs::create_dir_all(&dir).unwrap();

        let mut raw = format!("{obj_type} {}\0", content.len()).into_bytes();
        raw.extend_from_slice(content);
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&raw).unwrap();
        std::fs::write(dir.join(file), enc.finish().unwrap()).unwrap();
        oid
    }

    #[test]
    fn reads_loose_blob() {
        let dir = tempfile::tempdir().unwrap();
        let oid = write_loose_object(dir.path(), "blob", b"Hello, World");

        let mut store = ObjectStore::open(dir.path(), ReaderOptions::default()).unwrap();
        assert!(store.contains(&oid));
        let obj = store.read(&oid, Some(ObjectType::Blob)).unwrap().unwrap();
        assert_eq!(obj.data, b"Hello, World");
    }

    #[test]
    fn empty_oid_reads_as_none_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ObjectStore::open(dir.path(), ReaderOptions::default()).unwrap();
        assert!(store.read(&ObjectId::EMPTY, None).unwrap().is_none());
    }

    #[test]
    fn missing_object_is_not_found_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ObjectStore::open(dir.path(), ReaderOptions::default()).unwrap();
        let oid = ObjectId::parse("0000000000000000000000000000000000000001").unwrap();
        assert!(matches!(store.read(&oid, None), Err(OdbError::ObjectNotFound(_))));
    }

    #[test]
    fn lookup_prefix_finds_loose_match() {
        let dir = tempfile::tempdir().unwrap();
        let oid = write_loose_object(dir.path(), "blob", b"Hello, World");
        let store = ObjectStore::open(dir.path(), ReaderOptions::default()).unwrap();
        let hex = oid.format();
        let matches = store.lookup_prefix(&hex[..8]).unwrap();
        assert_eq!(matches, vec![oid]);
    }

    #[test]
    fn short_prefix_returns_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        write_loose_object(dir.path(), "blob", b"Hello, World");
        let store = ObjectStore::open(dir.path(), ReaderOptions::default()).unwrap();
        assert!(store.lookup_prefix("a").unwrap().is_empty());
    }
}
