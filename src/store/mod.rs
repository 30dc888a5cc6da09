//! Persistence: the key-value catalog index and the blob store.

pub mod blob;
pub mod catalog;
pub mod kv;

pub use blob::{paths, BlobStore, ByteStream, FsBlobStore};
pub use catalog::Catalog;
pub use kv::{KvStore, SqliteKv};
