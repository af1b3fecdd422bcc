//! The top-level, read-only entry point for this workspace: discovers a
//! repository's directory layout, then exposes `HEAD`, object, commit and
//! tree-entry reads over it (spec.md §4.9).

mod discover;
mod env;
mod error;
mod tree_walker;

pub use discover::{discover, discover_with_env, DiscoveredLayout};
pub use env::EnvOverrides;
pub use error::RepoError;

use std::path::{Path, PathBuf};

use gitver_hash::ObjectId;
use gitver_object::{Commit, ObjectType};
use gitver_odb::{ObjectStore, ReaderOptions};
use gitver_pack::pack::PackedObject;
use gitver_ref::{RefResolver, Reference};

/// A discovered repository: its directory layout, plus the object store and
/// ref resolver opened against it.
pub struct Repository {
    layout: DiscoveredLayout,
    store: ObjectStore,
    refs: RefResolver,
}

impl Repository {
    /// Discover and open a repository starting from `path`, honoring
    /// `GIT_DIR`/`GIT_OBJECT_DIRECTORY`/`GIT_COMMON_DIR` if set.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    pub fn open_with_options(
        path: impl AsRef<Path>,
        options: ReaderOptions,
    ) -> Result<Self, RepoError> {
        let layout = discover(path.as_ref())?;
        Self::from_layout(layout, options)
    }

    /// Open against an already-discovered layout, e.g. one built from
    /// explicit [`EnvOverrides`] rather than a filesystem walk.
    pub fn from_layout(layout: DiscoveredLayout, options: ReaderOptions) -> Result<Self, RepoError> {
        let store = ObjectStore::open(&layout.objects_dir, options)?;
        let refs = RefResolver::new(&layout.git_dir, &layout.common_dir);

        tracing::info!(
            git_dir = %layout.git_dir.display(),
            bare = layout.working_dir.is_none(),
            "repository opened"
        );

        Ok(Self {
            layout,
            store,
            refs,
        })
    }

    pub fn git_dir(&self) -> &Path {
        &self.layout.git_dir
    }

    pub fn common_dir(&self) -> &Path {
        &self.layout.common_dir
    }

    pub fn objects_dir(&self) -> &Path {
        &self.layout.objects_dir
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.layout.working_dir.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.layout.working_dir.is_none()
    }

    /// `GetHead`: the raw `HEAD` value, direct or symbolic, unresolved.
    pub fn head(&self) -> Result<Reference, RepoError> {
        Ok(self.refs.head()?)
    }

    /// `HEAD` fully resolved to a direct `ObjectId`. `ObjectId::EMPTY` for an
    /// unborn branch.
    pub fn head_oid(&self) -> Result<ObjectId, RepoError> {
        Ok(self.refs.head_oid()?)
    }

    /// `GetHeadCommit`: the commit `HEAD` points at. `None` for an unborn
    /// branch, matching `head_oid()`'s `EMPTY` sentinel.
    pub fn head_commit(&mut self) -> Result<Option<Commit>, RepoError> {
        let oid = self.head_oid()?;
        if oid.is_empty() {
            return Ok(None);
        }
        self.get_commit(&oid).map(Some)
    }

    /// `GetObject`: an object's bytes, validating `expected_type` if given.
    /// `oid == ObjectId::EMPTY` returns `Ok(None)` without raising, per the
    /// "absent" convention `ObjectId::EMPTY` carries throughout this crate.
    pub fn get_object(
        &mut self,
        oid: &ObjectId,
        expected_type: Option<ObjectType>,
    ) -> Result<Option<PackedObject>, RepoError> {
        if oid.is_empty() {
            return Ok(None);
        }
        Ok(self.store.read(oid, expected_type)?)
    }

    /// `GetCommit`: an object read as a commit and decoded.
    pub fn get_commit(&mut self, oid: &ObjectId) -> Result<Commit, RepoError> {
        let obj = self
            .get_object(oid, Some(ObjectType::Commit))?
            .ok_or(RepoError::ObjectNotFound(*oid))?;
        Ok(Commit::parse(&obj.data)?)
    }

    /// `GetTreeEntry`: resolve a slash-separated path under `tree_id`,
    /// `ObjectId::EMPTY` if any component is absent.
    pub fn get_tree_entry(
        &mut self,
        tree_id: ObjectId,
        path: &[u8],
    ) -> Result<ObjectId, RepoError> {
        tree_walker::resolve_path(&mut self.store, tree_id, path)
    }

    /// Name of the branch `HEAD` points to, stripped of `refs/heads/`.
    /// `None` when `HEAD` is detached.
    pub fn current_branch_name(&self) -> Result<Option<String>, RepoError> {
        Ok(self.refs.current_branch_name()?)
    }

    /// True iff `HEAD` is symbolic and its target does not resolve yet.
    pub fn is_unborn(&self) -> Result<bool, RepoError> {
        Ok(self.refs.is_unborn()?)
    }

    /// Resolve an abbreviated hex prefix to a single `ObjectId`, erroring
    /// `AmbiguousObjectId` when more than one object shares it.
    pub fn resolve_short_oid(&self, prefix: &str) -> Result<ObjectId, RepoError> {
        let matches = self.store.lookup_prefix(prefix)?;
        match matches.len() {
            0 => Err(RepoError::InvalidObjectId(prefix.to_string())),
            1 => Ok(matches[0]),
            n => Err(RepoError::AmbiguousObjectId(prefix.to_string(), n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use gitver_hash::hasher::Hasher;
    use std::io::Write;

    fn init_repo(root: &Path) -> PathBuf {
        let git_dir = root.join(".git");
        std::fs::create_dir_all(git_dir.join("objects")).unwrap();
        std::fs::create_dir_all(git_dir.join("refs/heads")).unwrap();
        git_dir
    }

    fn write_loose(objects_dir: &Path, obj_type: &str, content: &[u8]) -> ObjectId {
        let oid = Hasher::hash_object(obj_type, content).unwrap();
        let (subdir, file) = oid.loose_path_parts();
        let dir = objects_dir.join(&subdir);
        std::fs::create_dir_all(&dir).unwrap();
        let mut raw = format!("{obj_type} {}\0", content.len()).into_bytes();
        raw.extend_from_slice(content);
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&raw).unwrap();
        std::fs::write(dir.join(file), enc.finish().unwrap()).unwrap();
        oid
    }

    #[test]
    fn opens_unborn_repository_and_reports_it() {
        let root = tempfile::tempdir().unwrap();
        let git_dir = init_repo(root.path());
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/master\n").unwrap();

        let repo = Repository::open(root.path()).unwrap();
        assert!(repo.is_unborn().unwrap());
        assert_eq!(repo.head_oid().unwrap(), ObjectId::EMPTY);
        assert_eq!(repo.current_branch_name().unwrap().as_deref(), Some("master"));
    }

    #[test]
    fn resolves_head_to_commit_and_tree_entry() {
        let root = tempfile::tempdir().unwrap();
        let git_dir = init_repo(root.path());
        let objects_dir = git_dir.join("objects");

        let blob = write_loose(&objects_dir, "blob", b"hello world");
        let mut tree_bytes = Vec::new();
        tree_bytes.extend_from_slice(b"100644 hello.txt\0");
        tree_bytes.extend_from_slice(blob.as_bytes());
        let tree = write_loose(&objects_dir, "tree", &tree_bytes);

        let commit_body = format!(
            "tree {}\nauthor A <a@example.com> 0 +0000\ncommitter A <a@example.com> 0 +0000\n\ninitial\n",
            tree.format()
        );
        let commit = write_loose(&objects_dir, "commit", commit_body.as_bytes());

        std::fs::write(git_dir.join("refs/heads/master"), format!("{}\n", commit.format())).unwrap();
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/master\n").unwrap();

        let mut repo = Repository::open(root.path()).unwrap();
        assert!(!repo.is_unborn().unwrap());
        assert_eq!(repo.head_oid().unwrap(), commit);

        let head_commit = repo.head_commit().unwrap().unwrap();
        assert_eq!(head_commit.tree, tree);

        let entry = repo.get_tree_entry(head_commit.tree, b"hello.txt").unwrap();
        assert_eq!(entry, blob);

        let missing = repo.get_tree_entry(head_commit.tree, b"missing.txt").unwrap();
        assert_eq!(missing, ObjectId::EMPTY);
    }

    #[test]
    fn detached_head_reports_no_branch() {
        let root = tempfile::tempdir().unwrap();
        let git_dir = init_repo(root.path());
        let blob = write_loose(&git_dir.join("objects"), "blob", b"x");
        std::fs::write(git_dir.join("HEAD"), format!("{}\n", blob.format())).unwrap();

        let repo = Repository::open(root.path()).unwrap();
        assert_eq!(repo.current_branch_name().unwrap(), None);
        assert!(!repo.is_unborn().unwrap());
    }

    #[test]
    fn resolve_short_oid_finds_unique_prefix() {
        let root = tempfile::tempdir().unwrap();
        let git_dir = init_repo(root.path());
        let blob = write_loose(&git_dir.join("objects"), "blob", b"unique content");
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/master\n").unwrap();

        let repo = Repository::open(root.path()).unwrap();
        let hex = blob.format();
        assert_eq!(repo.resolve_short_oid(&hex[..10]).unwrap(), blob);
    }

    #[test]
    fn missing_git_dir_fails_to_open() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            Repository::open(root.path()),
            Err(RepoError::NotARepository(_))
        ));
    }
}
