use crate::ObjectError;
use gitver_hash::ObjectId;

/// A commit record decoded just far enough for ancestry traversal.
///
/// Per the reader's scope, structured decoding stops at the tree id and
/// parent list: author/committer signatures, any extra headers (encoding,
/// gpgsig, mergetag, ...) and the commit message are exposed verbatim as
/// `rest`, a plain byte range starting right after the last `parent` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub rest: Vec<u8>,
}

impl Commit {
    /// Parse the inflated content of a commit object (no loose-object
    /// header, just `"tree <hex>\n" ["parent <hex>\n"]* <rest>`).
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut lines = LineSplitter::new(content);

        let tree_line = lines
            .next()
            .ok_or(ObjectError::MissingCommitField { field: "tree" })?;
        let tree_hex = tree_line
            .strip_prefix(b"tree ")
            .ok_or(ObjectError::MissingCommitField { field: "tree" })?;
        let tree = parse_oid_field(tree_hex)?;

        let mut parents = Vec::new();
        let rest_start = loop {
            let mark = lines.position();
            match lines.next() {
                Some(line) if line.starts_with(b"parent ") => {
                    parents.push(parse_oid_field(&line[b"parent ".len()..])?);
                }
                _ => break mark,
            }
        };

        let rest = content[rest_start..].to_vec();

        Ok(Self {
            tree,
            parents,
            rest,
        })
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn first_parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }
}

fn parse_oid_field(hex: &[u8]) -> Result<ObjectId, ObjectError> {
    let hex = std::str::from_utf8(hex)
        .map_err(|_| ObjectError::InvalidHeader("non-utf8 object id".into()))?;
    ObjectId::parse(hex).map_err(|e| ObjectError::InvalidHeader(e.to_string()))
}

/// Splits `\n`-terminated lines while tracking the byte offset of the next
/// unread line, so the parser can cut `rest` at an exact boundary without
/// re-scanning.
struct LineSplitter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LineSplitter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for LineSplitter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(nl) => {
                let line = &rest[..nl];
                self.pos += nl + 1;
                Some(line)
            }
            None => {
                self.pos = self.data.len();
                Some(rest)
            }
        }
    }
}
