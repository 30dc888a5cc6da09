//! Feed assembly and publication.
//!
//! - `channel`: transforms show/episode documents into channel and item
//!   values with all asset references resolved
//! - `xml`: RSS 2.0 + iTunes serialization and the minimal reader used to
//!   verify round-trips
//! - `builder`: the publication pipeline gating, filtering, and writing
//!   the feed object

pub mod builder;
pub mod channel;
pub mod xml;

pub use builder::FeedBuilder;
pub use channel::{channel_from_show, item_from_episode, Channel, Enclosure, Item};
pub use xml::{parse_feed, write_feed, ParsedFeed};
