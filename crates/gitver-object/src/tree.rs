use bstr::{BStr, BString, ByteSlice};

use crate::ObjectError;
use gitver_hash::ObjectId;

/// One entry in a tree object's wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Octal file mode, e.g. `0o100644` (regular file) or `0o40000` (tree).
    pub mode: u32,
    pub name: BString,
    pub oid: ObjectId,
}

impl TreeEntry {
    /// Whether this entry's mode denotes a subtree (directory).
    pub fn is_tree(&self) -> bool {
        self.mode == 0o40000
    }
}

/// A parsed tree object: an ordered list of entries.
///
/// Wire format (post-inflate): a concatenation of
/// `"<octal-mode> <name>\0<20 raw bytes of ObjectId>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < content.len() {
            let space = content[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "missing space after mode".into(),
                })?;
            let mode_str = std::str::from_utf8(&content[pos..pos + space]).map_err(|_| {
                ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "non-utf8 mode".into(),
                }
            })?;
            let mode = u32::from_str_radix(mode_str, 8).map_err(|_| ObjectError::InvalidTreeEntry {
                offset: pos,
                reason: format!("non-octal mode '{mode_str}'"),
            })?;
            pos += space + 1;

            let nul = content[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "missing NUL after name".into(),
                })?;
            let name = BString::from(&content[pos..pos + nul]);
            pos += nul + 1;

            if pos + 20 > content.len() {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "truncated object id".into(),
                });
            }
            let oid = ObjectId::from_bytes(&content[pos..pos + 20])
                .map_err(|e| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: e.to_string(),
                })?;
            pos += 20;

            entries.push(TreeEntry { mode, name, oid });
        }

        Ok(Self { entries })
    }

    /// Find an entry by exact name (linear scan, per the wire format's
    /// unsorted-by-name-but-git-sorted-on-disk layout — no binary search
    /// here since the component doesn't promise a comparator-compatible
    /// order for arbitrary byte strings).
    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_bstr() == name)
    }
}
