//! Parses `<CommonDirectory>/packed-refs`: refs/tags's annotated targets get
//! peeled on a `^<hex>` line following the ref they belong to; spec.md only
//! needs the ref→OID mapping, but peeled values are kept since they come
//! for free from the same scan and later tag-following collaborators want
//! them.

use std::fs;
use std::path::Path;

use bstr::ByteSlice;
use gitver_hash::ObjectId;

use crate::error::RefError;
use crate::name::RefName;

#[derive(Debug, Clone)]
pub struct PackedRef {
    pub name: RefName,
    pub oid: ObjectId,
    pub peeled: Option<ObjectId>,
}

/// The parsed contents of a `packed-refs` file. An absent file parses as
/// empty — packed-refs is an optimization, not a requirement.
#[derive(Debug, Clone, Default)]
pub struct PackedRefs {
    refs: Vec<PackedRef>,
}

impl PackedRefs {
    pub fn parse(data: &[u8]) -> Result<Self, RefError> {
        let mut refs: Vec<PackedRef> = Vec::new();

        for line in data.lines() {
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }

            if let Some(hex) = line.strip_prefix(b"^") {
                let hex = std::str::from_utf8(hex)
                    .map_err(|_| RefError::Parse("invalid UTF-8 in peeled OID".into()))?;
                let peeled = ObjectId::parse(hex.trim())?;
                if let Some(last) = refs.last_mut() {
                    last.peeled = Some(peeled);
                }
                continue;
            }

            let space = line
                .find_byte(b' ')
                .ok_or_else(|| RefError::Parse("malformed packed-refs line".into()))?;
            let hex = std::str::from_utf8(&line[..space])
                .map_err(|_| RefError::Parse("invalid UTF-8 in packed-refs OID".into()))?;
            let oid = ObjectId::parse(hex)?;

            let name_str = std::str::from_utf8(&line[space + 1..])
                .map_err(|_| RefError::Parse("invalid UTF-8 in packed-refs name".into()))?;
            let name = RefName::new(name_str.trim())?;

            refs.push(PackedRef {
                name,
                oid,
                peeled: None,
            });
        }

        Ok(Self { refs })
    }

    /// Load from `<dir>/packed-refs`. Missing file parses as empty, not an
    /// error.
    pub fn load(dir: &Path) -> Result<Self, RefError> {
        let path = dir.join("packed-refs");
        match fs::read(&path) {
            Ok(data) => Self::parse(&data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(RefError::IoPath { path, source: e }),
        }
    }

    /// Exact-name scan, per spec.md §4.7 ("scanning for an exact name
    /// match").
    pub fn find(&self, name: &RefName) -> Option<&PackedRef> {
        self.refs.iter().find(|r| &r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackedRef> {
        self.refs.iter()
    }
}
