use std::path::PathBuf;

/// Errors produced while resolving HEAD, loose refs and packed-refs.
#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("invalid ref name: {0}")]
    InvalidName(String),

    #[error("symbolic ref loop detected at '{0}'")]
    SymrefLoop(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error on {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hash(#[from] gitver_hash::HashError),
}
