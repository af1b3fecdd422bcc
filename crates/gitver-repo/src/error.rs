use std::path::PathBuf;

use gitver_hash::ObjectId;
use gitver_object::ObjectType;

/// Errors from repository discovery and top-level object reads
/// (spec.md §7). This is the union type external collaborators (the
/// version-computation layer) match against; it composes every lower
/// crate's error via `#[from]`/`#[error(transparent)]`.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a git repository (or any of the parent directories): {0}")]
    NotARepository(PathBuf),

    #[error("invalid .git indirection at {path}: {reason}")]
    InvalidGitDir { path: PathBuf, reason: String },

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("object type mismatch: expected {expected}, got {actual}")]
    ObjectTypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("object id '{0}' is ambiguous: matches {1} objects")]
    AmbiguousObjectId(String, usize),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error(transparent)]
    Object(#[from] gitver_object::ObjectError),

    #[error(transparent)]
    Odb(#[from] gitver_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] gitver_ref::RefError),

    #[error(transparent)]
    Hash(#[from] gitver_hash::HashError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
