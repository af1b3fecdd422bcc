//! Memoizes reconstructed pack object bytes by `(pack, offset)`.
//!
//! Delta reconstruction is the most expensive operation in this crate; a
//! version-height traversal re-visits the same base objects across many
//! commits, so caching the fully materialized bytes (not just the base,
//! the *result*) turns repeated ofs-delta walks from O(depth) re-inflation
//! into a single hash lookup.

use gitver_object::ObjectType;
use lru::LruCache;

/// Identifies a pack within a `PackSet` for cache-keying purposes. Assigned
/// by whoever opens packs (`PackSet`), stable for the lifetime of the
/// `Repository`.
pub type PackId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    pack: PackId,
    offset: u64,
}

#[derive(Debug, Clone)]
struct CachedObject {
    obj_type: ObjectType,
    data: Vec<u8>,
}

/// Upper bound on total cached bytes. `Unbounded` matches the source's
/// default and is the right choice for typical version-height traversals
/// (spec.md §4.3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLimit {
    Unbounded,
    Bytes(u64),
}

impl Default for CacheLimit {
    fn default() -> Self {
        Self::Unbounded
    }
}

/// LRU-on-total-bytes memoization of reconstructed pack objects, keyed by
/// `(pack, offset)`.
///
/// Capacity is unbounded in entry count (an `LruCache` needs *some* cap);
/// eviction is driven instead by `limit`, tracked as `bytes_held` and
/// enforced on insert by popping the least-recently-used entry until back
/// under budget.
pub struct PackObjectCache {
    entries: LruCache<CacheKey, CachedObject>,
    limit: CacheLimit,
    bytes_held: u64,
}

impl PackObjectCache {
    pub fn new(limit: CacheLimit) -> Self {
        Self {
            entries: LruCache::unbounded(),
            limit,
            bytes_held: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(CacheLimit::Unbounded)
    }

    /// Look up a previously materialized object, promoting it to
    /// most-recently-used.
    pub fn get(&mut self, pack: PackId, offset: u64) -> Option<(ObjectType, &[u8])> {
        let key = CacheKey { pack, offset };
        self.entries
            .get(&key)
            .map(|cached| (cached.obj_type, cached.data.as_slice()))
    }

    /// Insert a materialized object, evicting least-recently-used entries
    /// if this would exceed the configured byte budget.
    pub fn insert(&mut self, pack: PackId, offset: u64, obj_type: ObjectType, data: Vec<u8>) {
        let key = CacheKey { pack, offset };
        let size = data.len() as u64;

        if let Some(old) = self.entries.put(key, CachedObject { obj_type, data }) {
            self.bytes_held -= old.data.len() as u64;
        }
        self.bytes_held += size;

        if let CacheLimit::Bytes(limit) = self.limit {
            while self.bytes_held > limit {
                match self.entries.pop_lru() {
                    Some((_, evicted)) => self.bytes_held -= evicted.data.len() as u64,
                    None => break,
                }
            }
        }
    }

    pub fn contains(&self, pack: PackId, offset: u64) -> bool {
        self.entries.contains(&CacheKey { pack, offset })
    }

    pub fn bytes_held(&self) -> u64 {
        self.bytes_held
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bytes_held = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let mut cache = PackObjectCache::unbounded();
        cache.insert(0, 12, ObjectType::Blob, b"hello".to_vec());
        let (ty, data) = cache.get(0, 12).unwrap();
        assert_eq!(ty, ObjectType::Blob);
        assert_eq!(data, b"hello");
    }

    #[test]
    fn distinct_packs_do_not_collide_on_offset() {
        let mut cache = PackObjectCache::unbounded();
        cache.insert(0, 100, ObjectType::Blob, b"from pack 0".to_vec());
        cache.insert(1, 100, ObjectType::Blob, b"from pack 1".to_vec());
        assert_eq!(cache.get(0, 100).unwrap().1, b"from pack 0");
        assert_eq!(cache.get(1, 100).unwrap().1, b"from pack 1");
    }

    #[test]
    fn miss_returns_none() {
        let mut cache = PackObjectCache::unbounded();
        assert!(cache.get(0, 999).is_none());
    }

    #[test]
    fn byte_limit_evicts_least_recently_used() {
        let mut cache = PackObjectCache::new(CacheLimit::Bytes(10));
        cache.insert(0, 1, ObjectType::Blob, vec![0u8; 6]);
        cache.insert(0, 2, ObjectType::Blob, vec![0u8; 6]);
        // Inserting the second entry should have evicted the first (6+6 > 10).
        assert!(cache.get(0, 1).is_none());
        assert!(cache.get(0, 2).is_some());
        assert!(cache.bytes_held() <= 10);
    }

    #[test]
    fn unbounded_never_evicts() {
        let mut cache = PackObjectCache::unbounded();
        for i in 0..1000u64 {
            cache.insert(0, i, ObjectType::Blob, vec![0u8; 100]);
        }
        assert_eq!(cache.len(), 1000);
    }
}
