//! Show, episode, and asset documents stored as YAML in the blob store.
//!
//! Documents are the source of truth for content; catalog rows are a
//! secondary index over them. The union is discriminated once, when a
//! document is loaded; downstream components consume the already-matched
//! variant and never re-inspect a kind string.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::resource::{AssetRef, ResourceKind};

/// Label keys understood by the feed builder.
pub mod label {
    pub const GUID: &str = "guid";
    pub const TYPE: &str = "type";
    pub const BLOCK: &str = "block";
    pub const EXPLICIT: &str = "explicit";
    pub const COMPLETE: &str = "complete";
    pub const SEASON: &str = "season";
    pub const EPISODE: &str = "episode";
}

/// Free-form metadata labels. BTreeMap keeps YAML output stable.
pub type Labels = BTreeMap<String, String>;

/// A person referenced from a document (author, owner).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Two-tier iTunes category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub subcategory: Option<String>,
}

/// Presentation order of a show's episodes. The only place this enum is
/// enforced is channel assembly; the label value must match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowType {
    Episodic,
    Serial,
}

impl std::fmt::Display for ShowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShowType::Episodic => write!(f, "Episodic"),
            ShowType::Serial => write!(f, "Serial"),
        }
    }
}

impl std::str::FromStr for ShowType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Episodic" => Ok(ShowType::Episodic),
            "Serial" => Ok(ShowType::Serial),
            other => Err(Error::ValidationFailed(format!(
                "show type must be \"Episodic\" or \"Serial\", got \"{}\"",
                other
            ))),
        }
    }
}

/// The tagged union of document bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Document {
    Show(ShowDoc),
    Episode(EpisodeDoc),
    Asset(AssetDoc),
}

impl Document {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Document::Show(_) => ResourceKind::Show,
            Document::Episode(_) => ResourceKind::Episode,
            Document::Asset(_) => ResourceKind::Asset,
        }
    }

    /// Parse a YAML document, discriminating the variant in one pass.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// The show document: channel-level content for a production.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowDoc {
    /// Equals the owning production's GUID; set by the service on write
    #[serde(default)]
    pub guid: String,

    pub title: String,
    pub summary: String,

    /// Public site link for the channel
    #[serde(default)]
    pub link: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Explicit author; the channel falls back to `owner` when unset
    #[serde(default)]
    pub author: Option<Person>,

    pub owner: Person,

    #[serde(default)]
    pub copyright: String,

    #[serde(default)]
    pub category: Option<Category>,

    /// Cover art reference
    #[serde(default)]
    pub image: Option<AssetRef>,

    /// Canonical feed URL; emitting it turns on the atom self-link
    #[serde(default)]
    pub feed_link: Option<String>,

    #[serde(default)]
    pub labels: Labels,
}

impl ShowDoc {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Embedded asset references needing resolution before a write.
    pub fn assets(&self) -> Vec<&AssetRef> {
        self.image.iter().collect()
    }
}

fn default_language() -> String {
    "en".to_string()
}

/// The episode document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeDoc {
    /// Globally unique; assigned by the service when empty
    #[serde(default)]
    pub guid: String,

    pub title: String,
    pub summary: String,

    #[serde(default)]
    pub description: String,

    /// Effective publish time; episodes dated in the future stay out of
    /// the built feed
    pub published: DateTime<Utc>,

    /// Episode ordinal within the production
    #[serde(default)]
    pub index: i64,

    #[serde(default)]
    pub link: String,

    /// The audio enclosure
    pub enclosure: AssetRef,

    /// Episode art
    #[serde(default)]
    pub image: Option<AssetRef>,

    #[serde(default)]
    pub labels: Labels,
}

impl EpisodeDoc {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn is_blocked(&self) -> bool {
        self.label(label::BLOCK) == Some("yes")
    }

    pub fn assets(&self) -> Vec<&AssetRef> {
        std::iter::once(&self.enclosure).chain(self.image.iter()).collect()
    }
}

/// A standalone asset registration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDoc {
    #[serde(default)]
    pub guid: String,

    #[serde(default)]
    pub name: String,

    pub asset: AssetRef,
}
