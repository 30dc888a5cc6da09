//! Resource rows: the catalog's secondary index over blob documents.
//!
//! A resource row never holds document content. It indexes a show, episode,
//! or asset so the validator and feed builder can enumerate a production
//! without touching the blob store.

use serde::{Deserialize, Serialize};

/// Kind of a catalog resource. Immutable once a GUID is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Show,
    Episode,
    Asset,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Show => write!(f, "show"),
            ResourceKind::Episode => write!(f, "episode"),
            ResourceKind::Asset => write!(f, "asset"),
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "show" => Ok(ResourceKind::Show),
            "episode" => Ok(ResourceKind::Episode),
            "asset" => Ok(ResourceKind::Asset),
            _ => anyhow::bail!("Unknown resource kind: {}", s),
        }
    }
}

/// A single resource row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Globally unique identifier, regardless of kind
    pub guid: String,

    /// Kind of the indexed document
    pub kind: ResourceKind,

    /// Owning production GUID
    pub parent_guid: String,

    /// Resource name (slug)
    pub name: String,

    /// Blob path of the backing document; for assets, the raw media object
    /// (empty when the media is external)
    #[serde(default)]
    pub location: String,

    /// MIME type of the referenced media, when known
    #[serde(default)]
    pub content_type: String,

    /// Size in bytes, when known
    #[serde(default)]
    pub size: i64,

    /// Play duration in seconds (episodes and audio assets)
    #[serde(default)]
    pub duration: i64,

    /// Episode ordinal
    #[serde(default)]
    pub index: i64,

    /// Effective publish epoch; feed temporal filtering key for episodes
    #[serde(default)]
    pub published: i64,

    /// Creation epoch
    pub created: i64,

    /// Last update epoch
    pub updated: i64,
}

/// Reference mode for an embedded asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelMode {
    /// Media already uploaded under the production's own CDN prefix
    Local,

    /// Media served from a third-party URL, referenced as-is
    #[default]
    External,

    /// Remote media to be transferred into the blob store under a
    /// content-addressed path
    Import,
}

impl std::fmt::Display for RelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelMode::Local => write!(f, "local"),
            RelMode::External => write!(f, "external"),
            RelMode::Import => write!(f, "import"),
        }
    }
}

/// An asset reference embedded in a show or episode document.
///
/// Not itself a catalog row until resolved; import-mode references become
/// rows only after the content importer's transfer succeeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetRef {
    /// Source URI: a bare object name for `local`, a URL otherwise
    pub uri: String,

    /// Reference mode; unset means external
    #[serde(default)]
    pub rel: RelMode,

    /// MIME type declared by the author
    #[serde(default, rename = "type")]
    pub media_type: String,

    /// Declared size in bytes
    #[serde(default)]
    pub size: i64,
}

impl AssetRef {
    /// An external reference, used as-is.
    pub fn external(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            rel: RelMode::External,
            ..Default::default()
        }
    }

    /// A reference to media under the production's CDN prefix.
    pub fn local(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            rel: RelMode::Local,
            ..Default::default()
        }
    }

    /// A remote reference to be imported and content-addressed.
    pub fn import(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            rel: RelMode::Import,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [ResourceKind::Show, ResourceKind::Episode, ResourceKind::Asset] {
            let parsed: ResourceKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("channel".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_rel_mode_defaults_to_external() {
        let asset: AssetRef = serde_yaml::from_str("uri: https://cdn.example.com/a.mp3").unwrap();
        assert_eq!(asset.rel, RelMode::External);
    }

    #[test]
    fn test_asset_ref_yaml_uses_rel_names() {
        let asset = AssetRef::import("https://origin.example.com/ep1.mp3");
        let yaml = serde_yaml::to_string(&asset).unwrap();
        assert!(yaml.contains("rel: import"));
    }
}
