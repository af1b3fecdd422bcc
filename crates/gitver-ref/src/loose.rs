//! Reads a single loose ref file: `HEAD`, or any file under `refs/**`.
//!
//! A loose ref file holds either `ref: <target>\n` (symbolic) or 40 hex
//! characters (direct), exactly as spec.md §4.7 describes for `HEAD` and
//! extends uniformly to every other loose ref name.

use std::fs;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use gitver_hash::ObjectId;

use crate::error::RefError;
use crate::name::RefName;
use crate::Reference;

/// Read a loose ref file rooted at `dir` (a `GitDirectory` for `HEAD`, a
/// `CommonDirectory` for anything under `refs/`). `Ok(None)` when the file
/// does not exist — a missing loose ref is not an error, per spec.md §4.7's
/// fall-through to packed-refs.
pub(crate) fn read_loose_ref(dir: &Path, name: &RefName) -> Result<Option<Reference>, RefError> {
    let path = loose_ref_path(dir, name);
    let contents = match fs::read(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RefError::IoPath {
                path,
                source: e,
            })
        }
    };

    let trimmed = contents.trim();

    if let Some(target) = trimmed.strip_prefix(b"ref: ") {
        let target_str = std::str::from_utf8(target.trim())
            .map_err(|_| RefError::Parse("invalid UTF-8 in symbolic ref target".into()))?;
        let target = RefName::new(target_str)?;
        return Ok(Some(Reference::Symbolic(target)));
    }

    let hex = std::str::from_utf8(trimmed)
        .map_err(|_| RefError::Parse("invalid UTF-8 in ref OID".into()))?;
    let oid = ObjectId::parse(hex)?;
    Ok(Some(Reference::Direct(oid)))
}

fn loose_ref_path(dir: &Path, name: &RefName) -> PathBuf {
    dir.join(name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_direct_ref() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("refs/heads")).unwrap();
        std::fs::write(
            dir.path().join("refs/heads/main"),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709\n",
        )
        .unwrap();

        let name = RefName::new("refs/heads/main").unwrap();
        let reference = read_loose_ref(dir.path(), &name).unwrap().unwrap();
        assert_eq!(
            reference,
            Reference::Direct(ObjectId::parse("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap())
        );
    }

    #[test]
    fn reads_symbolic_head() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("HEAD"), "ref: refs/heads/main\n").unwrap();

        let name = RefName::new("HEAD").unwrap();
        let reference = read_loose_ref(dir.path(), &name).unwrap().unwrap();
        assert_eq!(
            reference,
            Reference::Symbolic(RefName::new("refs/heads/main").unwrap())
        );
    }

    #[test]
    fn missing_ref_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let name = RefName::new("refs/heads/nonexistent").unwrap();
        assert!(read_loose_ref(dir.path(), &name).unwrap().is_none());
    }
}
