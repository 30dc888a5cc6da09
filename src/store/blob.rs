//! Blob store: YAML documents, raw media objects, and published feeds.
//!
//! The filesystem implementation stages streamed writes under a hidden
//! directory and renames into place only after the byte count checks out,
//! so a partial or corrupt transfer never becomes a visible object.
//!
//! Layout under the root:
//!
//! ```text
//! {root}/
//! ├── {prod}/show-{prod}.yaml
//! ├── {prod}/{kind}-{id}.yaml
//! ├── {prod}/{fingerprint}.{ext}
//! ├── {prod}/feed.xml
//! └── .staging/{random}          # in-progress streamed writes
//! ```

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Deterministic object paths. Reproduced bit-exact for CDN compatibility.
pub mod paths {
    use crate::domain::ResourceKind;

    /// `{prod}/show-{prod}.yaml`
    pub fn show_doc(prod: &str) -> String {
        format!("{}/show-{}.yaml", prod, prod)
    }

    /// `{prod}/{kind}-{id}.yaml`
    pub fn resource_doc(prod: &str, kind: ResourceKind, id: &str) -> String {
        format!("{}/{}-{}.yaml", prod, kind, id)
    }

    /// `{prod}/feed.xml`
    pub fn feed(prod: &str) -> String {
        format!("{}/feed.xml", prod)
    }
}

/// A stream of body chunks from an HTTP response.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Storage backend for documents and media objects.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()>;

    /// `Ok(None)` if the object does not exist.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Deleting a missing object is a no-op.
    async fn delete(&self, path: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Stream `body` into a staged object, committing it at `path` only when
    /// the byte count matches `expected` (when declared). Returns the bytes
    /// written. On a count mismatch nothing becomes visible and the error is
    /// an integrity failure.
    async fn put_stream(&self, path: &str, body: ByteStream, expected: Option<u64>)
        -> Result<u64>;
}

/// Filesystem-backed blob store.
pub struct FsBlobStore {
    root: PathBuf,
    staging: PathBuf,
}

impl FsBlobStore {
    /// Open the store, creating the root and staging directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let staging = root.join(".staging");
        std::fs::create_dir_all(&staging)?;
        Ok(Self { root, staging })
    }

    fn object_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    async fn ensure_parent(&self, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.object_path(path);
        self.ensure_parent(&target).await?;
        fs::write(&target, data).await?;
        debug!(path, bytes = data.len(), "wrote blob");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.object_path(path)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Internal(
                anyhow::Error::new(e).context(format!("read blob {}", path)),
            )),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match fs::remove_file(self.object_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Internal(
                anyhow::Error::new(e).context(format!("delete blob {}", path)),
            )),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.object_path(path)).await?)
    }

    async fn put_stream(
        &self,
        path: &str,
        mut body: ByteStream,
        expected: Option<u64>,
    ) -> Result<u64> {
        let staged = self.staging.join(Uuid::new_v4().simple().to_string());
        let mut file = fs::File::create(&staged).await?;

        let mut written: u64 = 0;
        let mut stream_error: Option<Error> = None;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                Err(e) => {
                    stream_error = Some(Error::Internal(
                        anyhow::Error::new(e).context(format!("stream body for {}", path)),
                    ));
                    break;
                }
            }
        }
        file.flush().await?;
        drop(file);

        if let Some(e) = stream_error {
            let _ = fs::remove_file(&staged).await;
            return Err(e);
        }

        if let Some(expected) = expected {
            if written != expected {
                let _ = fs::remove_file(&staged).await;
                return Err(Error::IntegrityFailure(format!(
                    "{}: wrote {} bytes, declared content length {}",
                    path, written, expected
                )));
            }
        }

        let target = self.object_path(path);
        self.ensure_parent(&target).await?;
        fs::rename(&staged, &target).await?;
        debug!(path, bytes = written, "committed streamed blob");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stream_of(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(futures::stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    #[tokio::test]
    async fn test_put_get_exists_delete() {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp.path()).unwrap();

        store.put("p1/show-p1.yaml", b"title: x").await.unwrap();
        assert!(store.exists("p1/show-p1.yaml").await.unwrap());
        assert_eq!(store.get("p1/show-p1.yaml").await.unwrap().unwrap(), b"title: x");

        store.delete("p1/show-p1.yaml").await.unwrap();
        assert!(!store.exists("p1/show-p1.yaml").await.unwrap());
        assert!(store.get("p1/show-p1.yaml").await.unwrap().is_none());

        // deleting again is a no-op
        store.delete("p1/show-p1.yaml").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_stream_commits_on_matching_length() {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp.path()).unwrap();

        let written = store
            .put_stream("p1/abc.mp3", stream_of(vec![b"hello ", b"world"]), Some(11))
            .await
            .unwrap();
        assert_eq!(written, 11);
        assert_eq!(store.get("p1/abc.mp3").await.unwrap().unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_put_stream_mismatch_leaves_nothing_visible() {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp.path()).unwrap();

        let err = store
            .put_stream("p1/abc.mp3", stream_of(vec![b"short"]), Some(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IntegrityFailure(_)));
        assert!(!store.exists("p1/abc.mp3").await.unwrap());

        // staging directory holds no leftovers
        let mut staged = tokio::fs::read_dir(temp.path().join(".staging")).await.unwrap();
        assert!(staged.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_stream_without_declared_length() {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp.path()).unwrap();

        let written = store
            .put_stream("p1/x.bin", stream_of(vec![b"abc"]), None)
            .await
            .unwrap();
        assert_eq!(written, 3);
        assert!(store.exists("p1/x.bin").await.unwrap());
    }

    #[test]
    fn test_path_layout_is_exact() {
        use crate::domain::ResourceKind;
        assert_eq!(paths::show_doc("p1"), "p1/show-p1.yaml");
        assert_eq!(
            paths::resource_doc("p1", ResourceKind::Episode, "e9"),
            "p1/episode-e9.yaml"
        );
        assert_eq!(paths::feed("p1"), "p1/feed.xml");
    }
}
