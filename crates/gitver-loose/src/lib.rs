//! Reads `objects/xx/yyyy...` loose objects: a single zlib frame whose
//! inflated content begins with an ASCII `"<type> <len>\0"` header followed
//! by the raw object bytes.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use gitver_hash::ObjectId;
use gitver_io::ZLibStream;
use gitver_object::{header, ObjectType};

#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("corrupt loose object: {reason}")]
    Corrupt { reason: String },
}

/// A readable, length-bounded stream over one loose object's payload (the
/// bytes after the `"<type> <len>\0"` header).
pub type LooseObjectStream = ZLibStream<File>;

pub struct LooseObjectReader {
    objects_dir: PathBuf,
}

impl LooseObjectReader {
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
        }
    }

    pub fn object_path(&self, oid: &ObjectId) -> PathBuf {
        let (dir, file) = oid.loose_path_parts();
        self.objects_dir.join(dir).join(file)
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.object_path(oid).is_file()
    }

    /// Read just the type and declared content length, without touching
    /// the payload.
    pub fn read_header(&self, oid: &ObjectId) -> Result<(ObjectType, usize), LooseError> {
        let path = self.object_path(oid);
        match peek_header(&path) {
            Ok((ty, len, _)) => Ok((ty, len)),
            Err(LooseError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                Err(LooseError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    /// Open the payload stream for an object, skipping past its header.
    pub fn read(&self, oid: &ObjectId) -> Result<(ObjectType, LooseObjectStream), LooseError> {
        let path = self.object_path(oid);
        let (obj_type, content_len, header_len) = match peek_header(&path) {
            Ok(v) => v,
            Err(LooseError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LooseError::NotFound)
            }
            Err(e) => return Err(e),
        };

        let file = File::open(&path)?;
        let mut stream = ZLibStream::new(file, (header_len + content_len) as u64);
        io::copy(&mut (&mut stream).take(header_len as u64), &mut io::sink())?;
        Ok((obj_type, stream))
    }
}

/// Decode just enough of the zlib frame to find the `"<type> <len>\0"`
/// header, growing the read buffer until the NUL terminator appears.
///
/// Returns `(type, declared_content_len, header_byte_len)`.
fn peek_header(path: &Path) -> Result<(ObjectType, usize, usize), LooseError> {
    let file = File::open(path)?;
    let mut decoder = ZlibDecoder::new(file);
    let mut buf = Vec::with_capacity(32);
    let mut chunk = [0u8; 32];

    loop {
        if let Ok((ty, len, hlen)) = header::parse_header(&buf) {
            return Ok((ty, len, hlen));
        }
        let n = decoder.read(&mut chunk)?;
        if n == 0 {
            return Err(LooseError::Corrupt {
                reason: "truncated header".into(),
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn write_loose_object(dir: &Path, obj_type: &str, content: &[u8]) -> ObjectId {
        let oid = gitver_hash::hasher::Hasher::hash_object(obj_type, content).unwrap();
        let (subdir, file) = oid.loose_path_parts();
        let object_dir = dir.join(&subdir);
        std::fs::create_dir_all(&object_dir).unwrap();

        let mut raw = format!("{obj_type} {}\0", content.len()).into_bytes();
        raw.extend_from_slice(content);

        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&raw).unwrap();
        let compressed = enc.finish().unwrap();

        std::fs::write(object_dir.join(file), compressed).unwrap();
        oid
    }

    #[test]
    fn reads_header_and_payload() {
        let dir = tempfile::tempdir().unwrap();
        let oid = write_loose_object(dir.path(), "blob", b"Hello, World");

        let reader = LooseObjectReader::new(dir.path());
        assert!(reader.contains(&oid));

        let (ty, len) = reader.read_header(&oid).unwrap();
        assert_eq!(ty, ObjectType::Blob);
        assert_eq!(len, 12);

        let (ty, stream) = reader.read(&oid).unwrap();
        assert_eq!(ty, ObjectType::Blob);
        let payload = stream.read_to_vec().unwrap();
        assert_eq!(payload, b"Hello, World");
    }

    #[test]
    fn matches_expected_fixture_hash() {
        let dir = tempfile::tempdir().unwrap();
        let oid = write_loose_object(dir.path(), "blob", b"Hello, World");
        assert_eq!(oid.format(), "1856e9be02756984c385482a07e42f42efd5d2f3");
    }

    #[test]
    fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LooseObjectReader::new(dir.path());
        let oid = ObjectId::parse("0000000000000000000000000000000000000001").unwrap();
        assert!(matches!(reader.read_header(&oid), Err(LooseError::NotFound)));
    }

    #[test]
    fn empty_content_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let oid = write_loose_object(dir.path(), "blob", b"");
        let (_, stream) = LooseObjectReader::new(dir.path()).read(&oid).unwrap();
        assert!(stream.read_to_vec().unwrap().is_empty());
    }
}
