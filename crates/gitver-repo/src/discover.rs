//! Discovers a repository's directory layout by walking upward from a
//! filesystem path (spec.md §4.9).

use std::path::{Path, PathBuf};

use crate::env::EnvOverrides;
use crate::RepoError;

/// The directory layout spec.md §3 names: `GitDirectory`, `CommonDirectory`,
/// `ObjectDirectory`, and `WorkingDirectory` (absent for bare repos).
#[derive(Debug, Clone)]
pub struct DiscoveredLayout {
    pub git_dir: PathBuf,
    pub common_dir: PathBuf,
    pub objects_dir: PathBuf,
    pub working_dir: Option<PathBuf>,
}

/// Walk upward from `start` looking for `.git`, per spec.md §4.9: a
/// directory `.git` makes `GitDirectory == CommonDirectory`; a file `.git`
/// is a `gitdir: <path>` indirection (worktrees), whose target may itself
/// carry a `commondir` file pointing at the shared metadata directory.
pub fn discover(start: &Path) -> Result<DiscoveredLayout, RepoError> {
    discover_with_env(start, &EnvOverrides::from_env())
}

pub fn discover_with_env(start: &Path, env: &EnvOverrides) -> Result<DiscoveredLayout, RepoError> {
    if let Some(git_dir) = &env.git_dir {
        let git_dir = if git_dir.is_absolute() {
            git_dir.clone()
        } else {
            start.join(git_dir)
        };
        return layout_from_git_dir(&git_dir, None, env);
    }

    let mut current = start.to_path_buf();
    loop {
        let dot_git = current.join(".git");

        if dot_git.is_dir() {
            return layout_from_git_dir(&dot_git, Some(current.clone()), env);
        }

        if dot_git.is_file() {
            let target = read_gitdir_indirection(&dot_git)?;
            let target = resolve_relative(&target, &current);
            return layout_from_git_dir(&target, Some(current.clone()), env);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Err(RepoError::NotARepository(start.to_path_buf())),
        }
    }
}

/// Build a `DiscoveredLayout` once `git_dir` is known, resolving
/// `CommonDirectory` from an optional `commondir` file (spec.md §3: "if
/// `<GitDirectory>/commondir` exists, `CommonDirectory` is read from it").
fn layout_from_git_dir(
    git_dir: &Path,
    working_dir: Option<PathBuf>,
    env: &EnvOverrides,
) -> Result<DiscoveredLayout, RepoError> {
    if !git_dir.is_dir() {
        return Err(RepoError::InvalidGitDir {
            path: git_dir.to_path_buf(),
            reason: "gitdir target is not a directory".into(),
        });
    }

    let common_dir = if let Some(cd) = &env.common_dir {
        cd.clone()
    } else {
        let commondir_file = git_dir.join("commondir");
        match std::fs::read_to_string(&commondir_file) {
            Ok(contents) => resolve_relative(Path::new(contents.trim()), git_dir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => git_dir.to_path_buf(),
            Err(e) => {
                return Err(RepoError::InvalidGitDir {
                    path: commondir_file,
                    reason: e.to_string(),
                })
            }
        }
    };

    let objects_dir = env
        .object_directory
        .clone()
        .unwrap_or_else(|| common_dir.join("objects"));

    tracing::debug!(
        git_dir = %git_dir.display(),
        common_dir = %common_dir.display(),
        "repository discovered"
    );

    Ok(DiscoveredLayout {
        git_dir: git_dir.to_path_buf(),
        common_dir,
        objects_dir,
        working_dir,
    })
}

fn read_gitdir_indirection(dot_git_file: &Path) -> Result<PathBuf, RepoError> {
    let contents = std::fs::read_to_string(dot_git_file)?;
    let first_line = contents.lines().next().unwrap_or("");
    let target = first_line
        .strip_prefix("gitdir: ")
        .ok_or_else(|| RepoError::InvalidGitDir {
            path: dot_git_file.to_path_buf(),
            reason: format!("expected 'gitdir: <path>', got '{first_line}'"),
        })?;
    Ok(PathBuf::from(target.trim()))
}

fn resolve_relative(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
