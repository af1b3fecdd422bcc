//! Shared, ambient I/O primitives for the gitver-reader object reader:
//! pooled file handles for amortizing open cost across recursive delta base
//! lookups, and a length-bounded zlib streaming reader shared by the pack
//! and loose-object backends.

mod handle;
mod zlib;

pub use handle::{HandlePool, PooledHandle};
pub use zlib::ZLibStream;
