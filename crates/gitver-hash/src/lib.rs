//! Object identity for the gitver-reader managed Git object reader.
//!
//! Provides the `ObjectId` value type (a 20-byte SHA-1 digest with a
//! distinguished `EMPTY` value for "absent"), hex encode/decode, a streaming
//! hasher, and the fan-out table used by pack indexes.

mod error;
pub mod fanout;
pub mod hasher;
pub mod hex;
mod oid;

pub use error::HashError;
pub use oid::ObjectId;
