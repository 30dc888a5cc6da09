//! Asset resolution and content import.
//!
//! - `resolver`: pure URI resolution over the three reference modes, plus
//!   the synchronous reachability check that gates catalog mutations
//! - `importer`: the queue-triggered worker that transfers remote media
//!   into the blob store under a content-addressed path
//! - `duration`: best-effort play-duration probe for audio payloads

pub mod duration;
pub mod importer;
pub mod resolver;

pub use duration::probe_duration;
pub use importer::Importer;
pub use resolver::{asset_guid, fingerprint_path, resolve_uri, Resolver};
