//! Resolves a slash-separated path within a tree object to an `ObjectId`
//! (spec.md §4.8).

use bstr::ByteSlice;

use gitver_hash::ObjectId;
use gitver_object::{ObjectType, Tree};
use gitver_odb::ObjectStore;

use crate::RepoError;

/// Walk `path` (e.g. `src/main.rs`) starting at `root_tree`, descending one
/// path component per subtree read. Returns `ObjectId::EMPTY` if any
/// component is absent, matching spec.md §4.8's "entry not found" case —
/// not every caller wants an error for a routine missing-path lookup.
pub fn resolve_path(
    store: &mut ObjectStore,
    root_tree: ObjectId,
    path: &[u8],
) -> Result<ObjectId, RepoError> {
    let mut current = root_tree;

    for component in path.split_str(b"/").filter(|c| !c.is_empty()) {
        let tree = read_tree(store, current)?;
        match tree {
            Some(tree) => match tree.find(component.as_bstr()) {
                Some(entry) => current = entry.oid,
                None => return Ok(ObjectId::EMPTY),
            },
            None => return Ok(ObjectId::EMPTY),
        }
    }

    Ok(current)
}

fn read_tree(store: &mut ObjectStore, oid: ObjectId) -> Result<Option<Tree>, RepoError> {
    if oid.is_empty() {
        return Ok(None);
    }
    match store.read(&oid, Some(ObjectType::Tree))? {
        Some(obj) => Ok(Some(Tree::parse(&obj.data)?)),
        None => Ok(None),
    }
}
