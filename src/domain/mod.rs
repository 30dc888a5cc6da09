//! Domain types for the podcast catalog.
//!
//! This module contains the core data structures:
//! - Production: the top-level podcast entity
//! - Resource: catalog rows indexing shows, episodes, and assets
//! - Document: the tagged union of YAML document bodies

pub mod document;
pub mod production;
pub mod resource;

// Re-export commonly used types
pub use document::{label, AssetDoc, Category, Document, EpisodeDoc, Labels, Person, ShowDoc, ShowType};
pub use production::{now_epoch, slugify, Production};
pub use resource::{AssetRef, RelMode, Resource, ResourceKind};
