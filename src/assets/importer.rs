//! Content importer: queue-triggered, content-addressed transfer of
//! remote media into the blob store.
//!
//! Integrity comes first: the transfer streams into a staged object and a
//! byte count that disagrees with the declared Content-Length fails the
//! task before anything becomes visible. The catalog row is written only
//! after the object is committed; that upsert is the moment the asset
//! becomes visible to the validator and the feed builder. Redundant
//! deliveries of the same fingerprint are tolerated, the whole operation
//! is idempotent.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::assets::duration::probe_duration;
use crate::assets::resolver::{asset_guid, fingerprint_path};
use crate::domain::{now_epoch, Resource, ResourceKind};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::queue::ImportTask;
use crate::store::{BlobStore, Catalog};

/// Queue consumer performing content imports.
pub struct Importer {
    catalog: Arc<Catalog>,
    blob: Arc<dyn BlobStore>,
    http: Arc<dyn HttpClient>,
}

impl Importer {
    pub fn new(
        catalog: Arc<Catalog>,
        blob: Arc<dyn BlobStore>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            catalog,
            blob,
            http,
        }
    }

    /// Handle one import task. Retry on failure belongs to the queue.
    #[instrument(skip(self, task), fields(parent = %task.parent_guid, uri = %task.source_uri))]
    pub async fn handle(&self, task: &ImportTask) -> Result<()> {
        let response = self.http.fetch(&task.source_uri).await?;
        if response.status != 200 {
            return Err(Error::Unreachable(format!(
                "import source '{}' returned status {}",
                task.source_uri, response.status
            )));
        }

        let content_type = response
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let declared = response.content_length;

        let location = fingerprint_path(&task.parent_guid, &task.source_uri);
        let written = self
            .blob
            .put_stream(&location, response.body, declared)
            .await?;
        debug!(location, bytes = written, "transfer committed");

        let duration = self.probe_audio(&location, &content_type).await;

        let now = now_epoch();
        // The origin's Last-Modified, when parseable, becomes the row's
        // creation epoch; otherwise the import time does.
        let created = response
            .last_modified
            .as_deref()
            .and_then(parse_http_date)
            .unwrap_or(now);
        let resource = Resource {
            guid: asset_guid(&task.parent_guid, &task.source_uri),
            kind: ResourceKind::Asset,
            parent_guid: task.parent_guid.clone(),
            name: source_name(&task.source_uri),
            location,
            content_type,
            size: written as i64,
            duration,
            index: 0,
            published: 0,
            created,
            updated: now,
        };
        self.catalog.upsert_resource(resource)?;
        info!(bytes = written, "imported asset cataloged");
        Ok(())
    }

    /// Best-effort duration metadata; never fails the import.
    async fn probe_audio(&self, location: &str, content_type: &str) -> i64 {
        if !content_type.starts_with("audio/") {
            return 0;
        }
        match self.blob.get(location).await {
            Ok(Some(data)) => probe_duration(&data, content_type).unwrap_or(0) as i64,
            _ => 0,
        }
    }
}

/// Epoch seconds from an HTTP date header (RFC 2822 format).
fn parse_http_date(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.timestamp())
}

/// Object name from the last path segment of the source URI.
fn source_name(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(path)
        .to_string()
}
