//! Pack index lookup and pack object decoding, including ofs-delta/ref-delta
//! chain reconstruction.

pub mod cache;
pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;
pub mod verify;

use gitver_hash::ObjectId;
use gitver_object::ObjectType;

pub use cache::PackObjectCache;
pub use index::PackIndex;
pub use pack::PackFile;

/// Errors produced while reading pack indexes and pack files.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("corrupt pack index: {0}")]
    CorruptIndex(String),
    #[error("corrupt pack: {0}")]
    CorruptPack(String),
    #[error("invalid delta instruction at offset {offset}: {reason}")]
    InvalidDelta { offset: u64, reason: String },
    #[error("missing delta base object {0}")]
    MissingBase(ObjectId),
    #[error("delta chain too deep at offset {offset} (max {max_depth})")]
    DeltaChainTooDeep { offset: u64, max_depth: u32 },
    #[error("pack checksum mismatch")]
    ChecksumMismatch,
    #[error("corrupt pack entry at offset {0}")]
    CorruptEntry(u64),
    #[error("unsupported pack/index version {0}")]
    UnsupportedVersion(u32),
    #[error("object type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },
    #[error("failed to resolve external delta base: {0}")]
    ExternalResolveError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Object type as tagged in a pack entry header. `OfsDelta`/`RefDelta` are
/// pack-internal; a delta's effective type is inherited from its resolved
/// base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryType {
    Commit,
    Tree,
    Blob,
    Tag,
    OfsDelta { base_offset: u64 },
    RefDelta { base_oid: ObjectId },
}

impl PackEntryType {
    pub fn to_object_type(self) -> Option<ObjectType> {
        match self {
            Self::Commit => Some(ObjectType::Commit),
            Self::Tree => Some(ObjectType::Tree),
            Self::Blob => Some(ObjectType::Blob),
            Self::Tag => Some(ObjectType::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }
}

pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const IDX_SIGNATURE: &[u8; 4] = &[0xff, b't', b'O', b'c'];
pub const IDX_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;
/// A generous bound; real repositories rarely exceed a few dozen.
pub const MAX_DELTA_CHAIN_DEPTH: u32 = 512;
