//! castkeep - Podcast catalog and feed publication engine
//!
//! Manages productions (podcasts) and their resources (a show, its
//! episodes, media assets), and assembles published RSS feeds from them.
//!
//! # Architecture
//!
//! The system is built around a small set of collaborators:
//! - Catalog rows live in an embedded key-value store; documents and media
//!   live in a blob store laid out for direct CDN serving
//! - Asset references are checked before any catalog mutation; remote
//!   media is imported asynchronously under content-addressed paths
//! - Publication runs behind two gates: a structural validator and the
//!   feed builder's own temporal visibility filter
//!
//! # Modules
//!
//! - `assets`: reference resolution, content import, duration probing
//! - `domain`: data structures (Production, Resource, documents)
//! - `feed`: channel assembly and RSS serialization
//! - `queue`: import task queue collaborator
//! - `service`: the operations exposed to the CLI
//! - `store`: key-value catalog and blob storage
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Create a production
//! castkeep create "my show" --title "My Show"
//!
//! # Apply a show or episode document
//! castkeep apply <guid> --file show.yaml
//!
//! # Publish the feed
//! castkeep build <guid>
//! ```

pub mod assets;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod http;
pub mod queue;
pub mod service;
pub mod store;
pub mod validator;

// Re-export main types at crate root for convenience
pub use domain::{AssetRef, Document, Production, RelMode, Resource, ResourceKind};
pub use error::{Error, Result};
pub use feed::FeedBuilder;
pub use service::{Caller, CatalogService};
pub use store::{BlobStore, Catalog, FsBlobStore, KvStore, SqliteKv};
