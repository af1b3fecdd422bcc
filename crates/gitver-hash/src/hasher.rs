use crate::{HashError, ObjectId};

/// Streaming SHA-1 computation with collision detection, finalizing into an
/// [`ObjectId`].
///
/// Only used by tests and by callers that want to verify a reconstructed
/// object's bytes against the OID they were requested by; the reader itself
/// never needs to hash on the read path (object-type/content verification is
/// explicitly out of scope, see the crate-level docs).
pub struct Hasher {
    inner: sha1_checked::Sha1,
}

impl Hasher {
    pub fn new() -> Self {
        use digest::Digest;
        Self {
            inner: sha1_checked::Sha1::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        use digest::Digest;
        self.inner.update(data);
    }

    /// Finalize and return the ObjectId. Fails if collision detection fires.
    pub fn finalize(self) -> Result<ObjectId, HashError> {
        let result = self.inner.try_finalize();
        if result.has_collision() {
            return Err(HashError::Sha1Collision);
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(result.hash().as_slice());
        Ok(ObjectId::from_array(bytes))
    }

    /// Hash a canonical git object encoding: `"{type} {len}\0{content}"`.
    pub fn hash_object(obj_type: &str, data: &[u8]) -> Result<ObjectId, HashError> {
        let header = format!("{} {}\0", obj_type, data.len());
        let mut h = Self::new();
        h.update(header.as_bytes());
        h.update(data);
        h.finalize()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}
