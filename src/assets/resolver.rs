//! Asset reference resolution.
//!
//! Three reference modes:
//! - `local`: media already under the production's CDN prefix
//! - `external`: third-party URL, referenced as-is, never proxied
//! - `import`: remote media transferred into the blob store under a
//!   content-addressed fingerprint path
//!
//! The fingerprint is a truncated SHA-256 of the source URI carrying the
//! URI's original file extension, so the same remote URI always maps to the
//! same path no matter how often or where it is referenced.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::domain::{AssetRef, RelMode};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::queue::{ImportTask, TaskQueue};
use crate::store::BlobStore;

/// Hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 32;

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// File extension of the path portion of a URI, lowercased. Query and
/// fragment are ignored.
fn source_extension(uri: &str) -> Option<String> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            Some(ext.to_ascii_lowercase())
        }
        _ => None,
    }
}

/// Content-addressed blob path for an imported asset:
/// `{prod}/{fingerprint}.{ext}` (no extension when the URI has none).
pub fn fingerprint_path(parent: &str, uri: &str) -> String {
    let hash = &sha256_hex(uri)[..FINGERPRINT_LEN];
    match source_extension(uri) {
        Some(ext) => format!("{}/{}.{}", parent, hash, ext),
        None => format!("{}/{}", parent, hash),
    }
}

/// Deterministic catalog GUID for an imported asset. Re-importing the same
/// URI under the same production always resolves to the same row.
pub fn asset_guid(parent: &str, uri: &str) -> String {
    sha256_hex(&format!("{}:{}", parent, uri))[..FINGERPRINT_LEN].to_string()
}

/// Resolve an asset reference into the URL the feed will carry.
pub fn resolve_uri(asset: &AssetRef, cdn_base: &str, parent: &str) -> String {
    let cdn_base = cdn_base.trim_end_matches('/');
    match asset.rel {
        RelMode::Local => format!("{}/{}/{}", cdn_base, parent, asset.uri),
        RelMode::Import => format!("{}/{}", cdn_base, fingerprint_path(parent, &asset.uri)),
        RelMode::External => asset.uri.clone(),
    }
}

/// Reachability checking and import scheduling for asset references.
pub struct Resolver {
    blob: Arc<dyn BlobStore>,
    http: Arc<dyn HttpClient>,
    queue: Arc<dyn TaskQueue>,
    cdn_base: String,
}

impl Resolver {
    pub fn new(
        blob: Arc<dyn BlobStore>,
        http: Arc<dyn HttpClient>,
        queue: Arc<dyn TaskQueue>,
        cdn_base: impl Into<String>,
    ) -> Self {
        Self {
            blob,
            http,
            queue,
            cdn_base: cdn_base.into(),
        }
    }

    /// Resolve against this resolver's CDN base.
    pub fn resolve(&self, asset: &AssetRef, parent: &str) -> String {
        resolve_uri(asset, &self.cdn_base, parent)
    }

    /// Check that a reference is usable before any catalog mutation.
    ///
    /// For import-mode references this may enqueue a transfer and return
    /// before it completes; transfer failures are not visible here.
    #[instrument(skip(self, asset), fields(rel = %asset.rel, uri = %asset.uri))]
    pub async fn ensure_asset(&self, parent: &str, asset: &AssetRef) -> Result<()> {
        match asset.rel {
            RelMode::Local => {
                let object = format!("{}/{}", parent, asset.uri);
                if !self.blob.exists(&object).await? {
                    return Err(Error::Unreachable(format!(
                        "local asset '{}' not present in storage",
                        object
                    )));
                }
                Ok(())
            }
            RelMode::External => {
                let head = self.http.head(&asset.uri).await?;
                if !head.is_reachable() {
                    return Err(Error::Unreachable(format!(
                        "external asset '{}' returned status {}",
                        asset.uri, head.status
                    )));
                }
                Ok(())
            }
            RelMode::Import => {
                // Fail fast on a dead origin before scheduling anything.
                let head = self.http.head(&asset.uri).await?;
                if !head.is_reachable() {
                    return Err(Error::Unreachable(format!(
                        "import source '{}' returned status {}",
                        asset.uri, head.status
                    )));
                }
                let path = fingerprint_path(parent, &asset.uri);
                if self.blob.exists(&path).await? {
                    debug!(path, "imported object already present");
                    return Ok(());
                }
                self.queue
                    .enqueue(ImportTask {
                        parent_guid: parent.to_string(),
                        source_uri: asset.uri.clone(),
                    })
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_returns_uri_unchanged() {
        let asset = AssetRef::external("https://elsewhere.example.com/a.mp3");
        assert_eq!(
            resolve_uri(&asset, "https://cdn.example.com", "p1"),
            "https://elsewhere.example.com/a.mp3"
        );
    }

    #[test]
    fn test_local_prefixes_cdn_and_parent() {
        let asset = AssetRef::local("cover.png");
        assert_eq!(
            resolve_uri(&asset, "https://cdn.example.com/", "p1"),
            "https://cdn.example.com/p1/cover.png"
        );
    }

    #[test]
    fn test_import_path_carries_hash_not_uri() {
        let asset = AssetRef::import("https://origin.example.com/media/ep1.mp3");
        let resolved = resolve_uri(&asset, "https://cdn.example.com", "p1");
        assert!(resolved.starts_with("https://cdn.example.com/p1/"));
        assert!(resolved.ends_with(".mp3"));
        assert!(!resolved.contains("origin.example.com"));
        assert!(!resolved.contains("ep1"));
    }

    #[test]
    fn test_fingerprint_is_idempotent() {
        let a = fingerprint_path("p1", "https://origin.example.com/ep1.mp3");
        let b = fingerprint_path("p1", "https://origin.example.com/ep1.mp3");
        assert_eq!(a, b);

        // a different URI maps elsewhere
        let c = fingerprint_path("p1", "https://origin.example.com/ep2.mp3");
        assert_ne!(a, c);

        assert_eq!(
            asset_guid("p1", "https://origin.example.com/ep1.mp3"),
            asset_guid("p1", "https://origin.example.com/ep1.mp3")
        );
        assert_ne!(
            asset_guid("p1", "https://origin.example.com/ep1.mp3"),
            asset_guid("p2", "https://origin.example.com/ep1.mp3")
        );
    }

    #[test]
    fn test_extension_handling() {
        assert_eq!(
            source_extension("https://x.example.com/a/b/file.MP3"),
            Some("mp3".to_string())
        );
        assert_eq!(
            source_extension("https://x.example.com/file.png?size=big"),
            Some("png".to_string())
        );
        assert_eq!(source_extension("https://x.example.com/noext"), None);

        let with_ext = fingerprint_path("p1", "https://x.example.com/a.mp3");
        assert!(with_ext.ends_with(".mp3"));
        let without = fingerprint_path("p1", "https://x.example.com/noext");
        assert!(!without.rsplit('/').next().unwrap().contains('.'));
    }
}
