//! `RefResolver`: HEAD resolution and named-ref lookup (spec.md §4.7).

use std::path::{Path, PathBuf};

use gitver_hash::ObjectId;

use crate::error::RefError;
use crate::loose::read_loose_ref;
use crate::name::RefName;
use crate::packed::PackedRefs;
use crate::Reference;

/// A generous bound on symbolic ref indirection depth; real repositories
/// never chain symbolic refs, but a corrupt one could otherwise loop
/// forever.
const MAX_SYMREF_DEPTH: u32 = 16;

/// Resolves `HEAD` and named references against a repository's directory
/// layout. `HEAD` is read from `git_dir` (the per-worktree metadata
/// directory); every other ref name is resolved against `common_dir` (the
/// shared metadata directory), matching spec.md §3's layout invariants.
pub struct RefResolver {
    git_dir: PathBuf,
    common_dir: PathBuf,
}

impl RefResolver {
    pub fn new(git_dir: impl Into<PathBuf>, common_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            common_dir: common_dir.into(),
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    /// Read `HEAD` without following a symbolic target.
    pub fn head(&self) -> Result<Reference, RefError> {
        let head_name = RefName::new_unchecked("HEAD");
        match read_loose_ref(&self.git_dir, &head_name)? {
            Some(reference) => Ok(reference),
            None => Err(RefError::Parse("HEAD file is missing".into())),
        }
    }

    /// Fully resolve `HEAD` to a direct `ObjectId`. A symbolic `HEAD`
    /// pointing at a nonexistent target resolves to `ObjectId::EMPTY`
    /// ("unborn branch"), per spec.md §4.7.
    pub fn head_oid(&self) -> Result<ObjectId, RefError> {
        match self.head()? {
            Reference::Direct(oid) => Ok(oid),
            Reference::Symbolic(target) => {
                tracing::debug!(target = %target, "HEAD is symbolic");
                Ok(self.resolve(&target)?.unwrap_or(ObjectId::EMPTY))
            }
        }
    }

    /// Resolve a ref name (e.g. `refs/heads/master`) to a direct OID,
    /// following symbolic indirection. `Ok(None)` when the name resolves to
    /// nothing in either loose or packed storage.
    pub fn resolve(&self, name: &RefName) -> Result<Option<ObjectId>, RefError> {
        self.resolve_depth(name, 0)
    }

    fn resolve_depth(&self, name: &RefName, depth: u32) -> Result<Option<ObjectId>, RefError> {
        if depth >= MAX_SYMREF_DEPTH {
            return Err(RefError::SymrefLoop(name.to_string()));
        }

        match self.read_ref(name)? {
            Some(Reference::Direct(oid)) => Ok(Some(oid)),
            Some(Reference::Symbolic(target)) => self.resolve_depth(&target, depth + 1),
            None => Ok(None),
        }
    }

    /// Read one ref's immediate value (direct or symbolic, unresolved),
    /// trying loose storage first and falling through to packed-refs, per
    /// spec.md §4.7's two-step resolution order for named references.
    pub fn read_ref(&self, name: &RefName) -> Result<Option<Reference>, RefError> {
        if let Some(reference) = read_loose_ref(&self.common_dir, name)? {
            return Ok(Some(reference));
        }

        let packed = PackedRefs::load(&self.common_dir)?;
        Ok(packed.find(name).map(|r| Reference::Direct(r.oid)))
    }

    /// Name of the branch `HEAD` points to, stripped of `refs/heads/`.
    /// `None` when `HEAD` is detached.
    pub fn current_branch_name(&self) -> Result<Option<String>, RefError> {
        match self.head()? {
            Reference::Symbolic(target) if target.is_branch() => {
                Ok(Some(target.short_name().to_string()))
            }
            Reference::Symbolic(_) | Reference::Direct(_) => Ok(None),
        }
    }

    /// True iff `HEAD` is symbolic and its target does not resolve to any
    /// commit yet (a freshly initialized repository).
    pub fn is_unborn(&self) -> Result<bool, RefError> {
        match self.head()? {
            Reference::Symbolic(target) => Ok(self.resolve(&target)?.is_none()),
            Reference::Direct(_) => Ok(false),
        }
    }
}
