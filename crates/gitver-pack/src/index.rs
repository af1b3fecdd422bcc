//! Pack index (v2) reading: `ObjectId` -> byte offset within the paired
//! `.pack` file.
//!
//! Two implementations share one contract (spec.md §4.2, §9 "runtime
//! polymorphism"): [`MappedPackIndex`] memory-maps the file and reads the
//! fan-out table once at open time; [`StreamingPackIndex`] seeks a pooled
//! file handle and re-reads whatever header bytes it needs on every lookup.
//! `PackIndex` is the tagged variant selecting between them.

use std::path::{Path, PathBuf};

use gitver_hash::fanout::FanoutTable;
use gitver_hash::ObjectId;
use gitver_io::HandlePool;
use memmap2::Mmap;

use crate::{PackError, IDX_SIGNATURE, IDX_VERSION};

const HEADER_SIZE: usize = 8;
const FANOUT_SIZE: usize = 256 * 4;
const HASH_LEN: usize = 20;

/// `ObjectId -> pack offset` lookup, backed by either a memory-mapped or a
/// streaming reader. Both are read-only; selection is driven by
/// [`crate::ReaderOptions::use_mapped_index`][super] at open time (see
/// `gitver-repo`).
pub enum PackIndex {
    Mapped(MappedPackIndex),
    Streaming(StreamingPackIndex),
}

impl PackIndex {
    pub fn open(path: impl AsRef<Path>, use_mapped: bool) -> Result<Self, PackError> {
        if use_mapped {
            Ok(Self::Mapped(MappedPackIndex::open(path)?))
        } else {
            Ok(Self::Streaming(StreamingPackIndex::open(path)?))
        }
    }

    pub fn open_mapped(path: impl AsRef<Path>) -> Result<Self, PackError> {
        Ok(Self::Mapped(MappedPackIndex::open(path)?))
    }

    pub fn open_streaming(path: impl AsRef<Path>) -> Result<Self, PackError> {
        Ok(Self::Streaming(StreamingPackIndex::open(path)?))
    }

    pub fn get_offset(&self, oid: &ObjectId) -> Result<Option<u64>, PackError> {
        if oid.is_empty() {
            return Ok(None);
        }
        match self {
            Self::Mapped(idx) => Ok(idx.get_offset(oid)),
            Self::Streaming(idx) => idx.get_offset(oid),
        }
    }

    /// All `(ObjectId, offset)` pairs whose hash starts with `prefix` (raw
    /// bytes, not hex). Used by short-OID resolution.
    pub fn lookup_prefix(&self, prefix: &[u8]) -> Result<Vec<(ObjectId, u64)>, PackError> {
        match self {
            Self::Mapped(idx) => Ok(idx.lookup_prefix(prefix)),
            Self::Streaming(idx) => idx.lookup_prefix(prefix),
        }
    }

    pub fn num_objects(&self) -> u32 {
        match self {
            Self::Mapped(idx) => idx.num_objects,
            Self::Streaming(idx) => idx.num_objects,
        }
    }

    /// The `(ObjectId, offset)` pair at a sorted-table position, for
    /// full-pack iteration ([`crate::pack::PackFile::iter`]).
    pub fn oid_and_offset_at(&self, index: u32) -> Result<(ObjectId, u64), PackError> {
        match self {
            Self::Mapped(idx) => {
                let i = index as usize;
                let oid = ObjectId::from_bytes(&idx.oid_bytes_at(i))
                    .map_err(|_| PackError::CorruptIndex("invalid name table entry".into()))?;
                Ok((oid, idx.offset_at(i)))
            }
            Self::Streaming(idx) => {
                let i = index as usize;
                let oid = ObjectId::from_bytes(&idx.oid_bytes_at(i)?)
                    .map_err(|_| PackError::CorruptIndex("invalid name table entry".into()))?;
                Ok((oid, idx.offset_at(i)?))
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Mapped(idx) => &idx.idx_path,
            Self::Streaming(idx) => &idx.idx_path,
        }
    }
}

/// Validate the 8-byte header (`\xfftOc` + version) shared by both layouts.
fn validate_header(bytes: &[u8]) -> Result<(), PackError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PackError::CorruptIndex("truncated header".into()));
    }
    if &bytes[0..4] != IDX_SIGNATURE {
        return Err(PackError::CorruptIndex("bad index signature".into()));
    }
    let version = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != IDX_VERSION {
        return Err(PackError::UnsupportedVersion(version));
    }
    Ok(())
}

fn table_offsets(num_objects: u32) -> (usize, usize, usize, usize) {
    let n = num_objects as usize;
    let oid_offset = HEADER_SIZE + FANOUT_SIZE;
    let crc_offset = oid_offset + n * HASH_LEN;
    let offset32_offset = crc_offset + n * 4;
    let offset64_offset = offset32_offset + n * 4;
    (oid_offset, crc_offset, offset32_offset, offset64_offset)
}

/// Binary search `[lo, hi)` for `target` given callbacks to read the OID
/// bytes at a sorted-table index. Shared by both implementations.
fn binary_search_oid(
    lo: usize,
    hi: usize,
    target: &[u8; 20],
    oid_at: impl Fn(usize) -> [u8; 20],
) -> Option<usize> {
    let mut low = lo;
    let mut high = hi;
    while low < high {
        let mid = low + (high - low) / 2;
        match oid_at(mid).as_slice().cmp(target.as_slice()) {
            std::cmp::Ordering::Less => low = mid + 1,
            std::cmp::Ordering::Greater => high = mid,
            std::cmp::Ordering::Equal => return Some(mid),
        }
    }
    None
}

/// Memory-mapped pack index: the fan-out table is read once at open time,
/// then every lookup indexes directly into the mapped byte slice.
pub struct MappedPackIndex {
    data: Mmap,
    num_objects: u32,
    fanout: FanoutTable,
    oid_offset: usize,
    crc_offset: usize,
    offset32_offset: usize,
    offset64_offset: usize,
    idx_path: PathBuf,
}

impl MappedPackIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PackError> {
        let idx_path = path.as_ref().to_path_buf();
        let file = std::fs::File::open(&idx_path)?;
        let data = unsafe { Mmap::map(&file)? };

        validate_header(&data)?;

        if data.len() < HEADER_SIZE + FANOUT_SIZE + 2 * HASH_LEN {
            return Err(PackError::CorruptIndex("file too small for fanout".into()));
        }

        let fanout = FanoutTable::from_bytes(&data[HEADER_SIZE..HEADER_SIZE + FANOUT_SIZE])
            .map_err(|e| PackError::CorruptIndex(format!("fan-out table not sorted: {e}")))?;
        let num_objects = fanout.total();

        let (oid_offset, crc_offset, offset32_offset, offset64_offset) =
            table_offsets(num_objects);
        let min_size = offset64_offset + 2 * HASH_LEN;
        if data.len() < min_size {
            return Err(PackError::CorruptIndex(format!(
                "file too small: {} < {min_size}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            num_objects,
            fanout,
            oid_offset,
            crc_offset,
            offset32_offset,
            offset64_offset,
            idx_path,
        })
    }

    fn fanout_range(&self, first_byte: u8) -> (usize, usize) {
        let range = self.fanout.range(first_byte);
        (range.start, range.end)
    }

    fn oid_bytes_at(&self, index: usize) -> [u8; 20] {
        let start = self.oid_offset + index * HASH_LEN;
        self.data[start..start + HASH_LEN].try_into().unwrap()
    }

    fn offset_at(&self, index: usize) -> u64 {
        let pos = self.offset32_offset + index * 4;
        let val = u32::from_be_bytes(self.data[pos..pos + 4].try_into().unwrap());
        if val & 0x8000_0000 != 0 {
            let idx64 = (val & 0x7fff_ffff) as usize;
            let pos64 = self.offset64_offset + idx64 * 8;
            u64::from_be_bytes(self.data[pos64..pos64 + 8].try_into().unwrap())
        } else {
            val as u64
        }
    }

    pub fn get_offset(&self, oid: &ObjectId) -> Option<u64> {
        let (lo, hi) = self.fanout_range(oid.first_byte());
        let target = *oid.as_bytes();
        binary_search_oid(lo, hi, &target, |i| self.oid_bytes_at(i)).map(|i| self.offset_at(i))
    }

    pub fn lookup_prefix(&self, prefix: &[u8]) -> Vec<(ObjectId, u64)> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let (lo, hi) = self.fanout_range(prefix[0]);
        (lo..hi)
            .filter_map(|i| {
                let oid_bytes = self.oid_bytes_at(i);
                if oid_bytes.starts_with(prefix) {
                    let oid = ObjectId::from_bytes(&oid_bytes).ok()?;
                    Some((oid, self.offset_at(i)))
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn crc32_at(&self, index: usize) -> u32 {
        let pos = self.crc_offset + index * 4;
        u32::from_be_bytes(self.data[pos..pos + 4].try_into().unwrap())
    }

    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }
}

/// Streaming pack index: no state is cached beyond the path and object
/// count. Every lookup re-seeks a pooled handle to read the fan-out pair it
/// needs and the name-table slice it binary-searches.
pub struct StreamingPackIndex {
    pool: HandlePool,
    num_objects: u32,
    idx_path: PathBuf,
}

impl StreamingPackIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PackError> {
        let idx_path = path.as_ref().to_path_buf();
        let pool = HandlePool::new(&idx_path);

        let mut header = [0u8; HEADER_SIZE];
        {
            let mut h = pool.acquire()?;
            h.read_at(0, &mut header)?;
        }
        validate_header(&header)?;

        let mut last_fanout = [0u8; 4];
        {
            let mut h = pool.acquire()?;
            h.read_at((HEADER_SIZE + 255 * 4) as u64, &mut last_fanout)?;
        }
        let num_objects = u32::from_be_bytes(last_fanout);

        Ok(Self {
            pool,
            num_objects,
            idx_path,
        })
    }

    fn fanout_entry(&self, first_byte: u8) -> Result<u32, PackError> {
        let pos = HEADER_SIZE + first_byte as usize * 4;
        let mut buf = [0u8; 4];
        let mut h = self.pool.acquire()?;
        h.read_at(pos as u64, &mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn fanout_range(&self, first_byte: u8) -> Result<(usize, usize), PackError> {
        let end = self.fanout_entry(first_byte)? as usize;
        let start = if first_byte == 0 {
            0
        } else {
            self.fanout_entry(first_byte - 1)? as usize
        };
        Ok((start, end))
    }

    fn oid_bytes_at(&self, index: usize) -> Result<[u8; 20], PackError> {
        let (oid_offset, ..) = table_offsets(self.num_objects);
        let pos = oid_offset + index * HASH_LEN;
        let mut buf = [0u8; HASH_LEN];
        let mut h = self.pool.acquire()?;
        h.read_at(pos as u64, &mut buf)?;
        Ok(buf)
    }

    fn offset_at(&self, index: usize) -> Result<u64, PackError> {
        let (_, _, offset32_offset, offset64_offset) = table_offsets(self.num_objects);
        let pos = offset32_offset + index * 4;
        let mut buf = [0u8; 4];
        {
            let mut h = self.pool.acquire()?;
            h.read_at(pos as u64, &mut buf)?;
        }
        let val = u32::from_be_bytes(buf);
        if val & 0x8000_0000 != 0 {
            let idx64 = (val & 0x7fff_ffff) as usize;
            let pos64 = offset64_offset + idx64 * 8;
            let mut buf64 = [0u8; 8];
            let mut h = self.pool.acquire()?;
            h.read_at(pos64 as u64, &mut buf64)?;
            Ok(u64::from_be_bytes(buf64))
        } else {
            Ok(val as u64)
        }
    }

    pub fn get_offset(&self, oid: &ObjectId) -> Result<Option<u64>, PackError> {
        let (lo, hi) = self.fanout_range(oid.first_byte())?;
        if lo >= hi {
            return Ok(None);
        }
        let target = *oid.as_bytes();

        let mut low = lo;
        let mut high = hi;
        while low < high {
            let mid = low + (high - low) / 2;
            let mid_oid = self.oid_bytes_at(mid)?;
            match mid_oid.as_slice().cmp(target.as_slice()) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Ok(Some(self.offset_at(mid)?)),
            }
        }
        Ok(None)
    }

    pub fn lookup_prefix(&self, prefix: &[u8]) -> Result<Vec<(ObjectId, u64)>, PackError> {
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let (lo, hi) = self.fanout_range(prefix[0])?;
        let mut out = Vec::new();
        for i in lo..hi {
            let oid_bytes = self.oid_bytes_at(i)?;
            if oid_bytes.starts_with(prefix) {
                if let Ok(oid) = ObjectId::from_bytes(&oid_bytes) {
                    out.push((oid, self.offset_at(i)?));
                }
            }
        }
        Ok(out)
    }

    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitver_hash::hasher::Hasher;
    use std::path::PathBuf;

    fn make_oid(first_byte: u8, suffix: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[0] = first_byte;
        bytes[19] = suffix;
        ObjectId::from_bytes(&bytes).unwrap()
    }

    fn build_index(entries: &[(ObjectId, u64, u32)]) -> Vec<u8> {
        let mut sorted = entries.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut buf = Vec::new();
        buf.extend_from_slice(IDX_SIGNATURE);
        buf.extend_from_slice(&IDX_VERSION.to_be_bytes());

        let mut fanout = [0u32; 256];
        for (oid, _, _) in &sorted {
            fanout[oid.first_byte() as usize] += 1;
        }
        for i in 1..256 {
            fanout[i] += fanout[i - 1];
        }
        for count in fanout {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for (oid, _, _) in &sorted {
            buf.extend_from_slice(oid.as_bytes());
        }
        for (_, _, crc) in &sorted {
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        for (_, offset, _) in &sorted {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
        buf.extend_from_slice(&[0u8; 20]);
        let mut h = Hasher::new();
        h.update(&buf);
        buf.extend_from_slice(h.finalize().unwrap().as_bytes());
        buf
    }

    fn write_index(data: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.idx");
        std::fs::write(&path, data).unwrap();
        (dir, path)
    }

    #[test]
    fn mapped_and_streaming_agree_on_lookup() {
        let entries = vec![
            (make_oid(0x00, 1), 100, 0x111),
            (make_oid(0x0a, 1), 317, 0x222),
            (make_oid(0xff, 1), 12, 0x333),
        ];
        let data = build_index(&entries);
        let (_dir, path) = write_index(&data);

        let mapped = PackIndex::open_mapped(&path).unwrap();
        let streaming = PackIndex::open_streaming(&path).unwrap();

        for (oid, offset, _) in &entries {
            assert_eq!(mapped.get_offset(oid).unwrap(), Some(*offset));
            assert_eq!(streaming.get_offset(oid).unwrap(), Some(*offset));
        }

        let missing = make_oid(0x50, 9);
        assert_eq!(mapped.get_offset(&missing).unwrap(), None);
        assert_eq!(streaming.get_offset(&missing).unwrap(), None);
    }

    #[test]
    fn empty_oid_is_never_present() {
        let data = build_index(&[(make_oid(1, 1), 10, 0)]);
        let (_dir, path) = write_index(&data);
        let idx = PackIndex::open_mapped(&path).unwrap();
        assert_eq!(idx.get_offset(&ObjectId::EMPTY).unwrap(), None);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = build_index(&[(make_oid(1, 1), 10, 0)]);
        data[0] = 0x00;
        let (_dir, path) = write_index(&data);
        assert!(PackIndex::open_mapped(&path).is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut data = build_index(&[(make_oid(1, 1), 10, 0)]);
        data[4..8].copy_from_slice(&3u32.to_be_bytes());
        let (_dir, path) = write_index(&data);
        assert!(matches!(
            PackIndex::open_mapped(&path),
            Err(PackError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn sample_s4_fixture_offsets() {
        // spec.md S4: two known OID/offset pairs from a referenced fixture index.
        let a = ObjectId::parse("f5b401f40ad83f13030e946c9ea22cb54cb853cd").unwrap();
        let b = ObjectId::parse("d6781552a0a94adbf73ed77696712084754dc274").unwrap();
        let data = build_index(&[(a, 12, 0xaaaa), (b, 317, 0xbbbb)]);
        let (_dir, path) = write_index(&data);

        let idx = PackIndex::open_mapped(&path).unwrap();
        assert_eq!(idx.get_offset(&a).unwrap(), Some(12));
        assert_eq!(idx.get_offset(&b).unwrap(), Some(317));
        assert_eq!(idx.get_offset(&ObjectId::EMPTY).unwrap(), None);
    }

    #[test]
    fn lookup_prefix_multiple_matches() {
        let entries = vec![
            (make_oid(0xab, 1), 100, 0),
            (make_oid(0xab, 2), 200, 0),
            (make_oid(0xac, 1), 300, 0),
        ];
        let data = build_index(&entries);
        let (_dir, path) = write_index(&data);
        let idx = PackIndex::open_mapped(&path).unwrap();
        let results = idx.lookup_prefix(&[0xab]).unwrap();
        assert_eq!(results.len(), 2);
    }
}
