//! Environment-variable discovery overrides, grounded in the teacher's
//! `git-repository::env::EnvOverrides` (SPEC_FULL.md §3). Narrow: the reader
//! only reads object/ref state, so only the overrides that change *where*
//! it looks are carried — nothing that changes *how* it writes, since it
//! never writes.

use std::path::PathBuf;

/// `GIT_DIR` / `GIT_OBJECT_DIRECTORY` / `GIT_COMMON_DIR` overrides, read
/// once at discovery time.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub git_dir: Option<PathBuf>,
    pub object_directory: Option<PathBuf>,
    pub common_dir: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            git_dir: std::env::var_os("GIT_DIR").map(PathBuf::from),
            object_directory: std::env::var_os("GIT_OBJECT_DIRECTORY").map(PathBuf::from),
            common_dir: std::env::var_os("GIT_COMMON_DIR").map(PathBuf::from),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}
