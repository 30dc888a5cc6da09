//! Service layer: the operations exposed to the CLI and to any future
//! transport.
//!
//! Everything is injected; the service owns no singletons. Ownership
//! enforcement is the calling layer's job — the caller context is used
//! here for ownership assignment on create and for audit logging.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::assets::Resolver;
use crate::domain::{
    now_epoch, slugify, AssetRef, Document, EpisodeDoc, Production, RelMode, Resource,
    ResourceKind, ShowDoc,
};
use crate::error::{Error, Result};
use crate::feed::FeedBuilder;
use crate::http::HttpClient;
use crate::queue::TaskQueue;
use crate::store::{paths, BlobStore, Catalog};
use crate::validator::validate_production;

/// The account on whose behalf an operation runs.
#[derive(Debug, Clone)]
pub struct Caller {
    pub account: String,
}

impl Caller {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }
}

/// Catalog mutation and feed publication operations.
pub struct CatalogService {
    catalog: Arc<Catalog>,
    blob: Arc<dyn BlobStore>,
    resolver: Resolver,
    builder: FeedBuilder,
}

impl CatalogService {
    pub fn new(
        catalog: Arc<Catalog>,
        blob: Arc<dyn BlobStore>,
        http: Arc<dyn HttpClient>,
        queue: Arc<dyn TaskQueue>,
        cdn_base: impl Into<String>,
    ) -> Self {
        let cdn_base = cdn_base.into();
        let resolver = Resolver::new(blob.clone(), http, queue, cdn_base.clone());
        let builder = FeedBuilder::new(catalog.clone(), blob.clone(), cdn_base);
        Self {
            catalog,
            blob,
            resolver,
            builder,
        }
    }

    /// Create a production owned by the caller. Idempotent per name+owner;
    /// the same name under a different owner is a conflict.
    #[instrument(skip(self, title, summary), fields(account = %caller.account))]
    pub fn create_production(
        &self,
        caller: &Caller,
        name: &str,
        title: &str,
        summary: &str,
    ) -> Result<Production> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(Error::ValidationFailed(format!(
                "production name '{}' normalizes to an empty slug",
                name
            )));
        }
        self.catalog
            .create_production(Production::new(slug, &caller.account, title, summary))
    }

    pub fn get_production(&self, guid: &str) -> Result<Production> {
        self.catalog
            .get_production(guid)?
            .ok_or_else(|| Error::NotFound(format!("production '{}' not found", guid)))
    }

    pub fn validate_production(&self, guid: &str) -> Result<()> {
        validate_production(&self.catalog, guid)
    }

    pub fn list_resources(
        &self,
        parent: &str,
        kind: Option<ResourceKind>,
    ) -> Result<Vec<Resource>> {
        self.catalog.list_resources(parent, kind)
    }

    /// Apply a document to a production: check every embedded asset
    /// reference, write the YAML at its deterministic path, then upsert the
    /// catalog row. Any content change resets publication state so readers
    /// stop trusting the previously published feed.
    #[instrument(skip(self, doc), fields(account = %caller.account, production = %prod, kind = %doc.kind()))]
    pub async fn update_resource(
        &self,
        caller: &Caller,
        prod: &str,
        doc: Document,
    ) -> Result<Resource> {
        let mut production = self.get_production(prod)?;

        for asset in doc_assets(&doc) {
            self.resolver.ensure_asset(prod, asset).await?;
        }

        let (row, path) = self.plan_document(prod, &doc)?;
        let doc = with_guid(doc, &row.guid);
        self.blob.put(&path, doc.to_yaml()?.as_bytes()).await?;
        let row = self.catalog.upsert_resource(row)?;

        production.mark_stale();
        self.catalog.put_production(&production)?;
        info!(guid = %row.guid, "resource updated");
        Ok(row)
    }

    /// Typed variant of [`update_resource`](Self::update_resource) for shows.
    pub async fn update_show(&self, caller: &Caller, prod: &str, show: ShowDoc) -> Result<Resource> {
        self.update_resource(caller, prod, Document::Show(show)).await
    }

    /// Typed variant of [`update_resource`](Self::update_resource) for episodes.
    pub async fn update_episode(
        &self,
        caller: &Caller,
        prod: &str,
        episode: EpisodeDoc,
    ) -> Result<Resource> {
        self.update_resource(caller, prod, Document::Episode(episode))
            .await
    }

    /// Remove a resource row, its backing blob, and re-check the parent.
    ///
    /// The row and blob go first; if the parent is no longer buildable the
    /// production's publication state is reset. A failure in that
    /// bookkeeping write does not restore the deleted resource.
    #[instrument(skip(self), fields(account = %caller.account))]
    pub async fn delete_resource(&self, caller: &Caller, guid: &str) -> Result<Resource> {
        let row = self
            .catalog
            .remove_resource(guid)?
            .ok_or_else(|| Error::NotFound(format!("resource '{}' not found", guid)))?;

        match row.kind {
            // An asset may own both a raw object (location) and a
            // registration document; imported rows never wrote the latter
            // and deleting a missing object is a no-op.
            ResourceKind::Asset => {
                if !row.location.is_empty() {
                    self.blob.delete(&row.location).await?;
                }
                self.blob
                    .delete(&paths::resource_doc(
                        &row.parent_guid,
                        ResourceKind::Asset,
                        &row.guid,
                    ))
                    .await?;
            }
            // Show and episode rows carry their document path in location.
            ResourceKind::Show | ResourceKind::Episode => {
                self.blob.delete(&row.location).await?;
            }
        }

        if let Err(e) = validate_production(&self.catalog, &row.parent_guid) {
            warn!(parent = %row.parent_guid, "parent no longer buildable after delete: {}", e);
            if let Some(mut production) = self.catalog.get_production(&row.parent_guid)? {
                production.mark_stale();
                self.catalog.put_production(&production)?;
            }
        }
        info!(guid = %row.guid, kind = %row.kind, "resource deleted");
        Ok(row)
    }

    /// Check an asset reference is usable; may schedule an import.
    pub async fn ensure_asset(&self, parent: &str, asset: &AssetRef) -> Result<()> {
        self.resolver.ensure_asset(parent, asset).await
    }

    pub async fn build_feed(&self, prod: &str, validate_only: bool) -> Result<String> {
        self.builder.build(prod, validate_only).await
    }

    /// Derive the catalog row and blob path for a document.
    fn plan_document(&self, prod: &str, doc: &Document) -> Result<(Resource, String)> {
        let now = now_epoch();
        match doc {
            Document::Show(show) => {
                let location = paths::show_doc(prod);
                let row = Resource {
                    guid: prod.to_string(),
                    kind: ResourceKind::Show,
                    parent_guid: prod.to_string(),
                    name: slugify(&show.title),
                    location: location.clone(),
                    content_type: "text/yaml".to_string(),
                    size: 0,
                    duration: 0,
                    index: 0,
                    published: 0,
                    created: now,
                    updated: now,
                };
                Ok((row, location))
            }
            Document::Episode(episode) => {
                let guid = fresh_guid(&episode.guid);
                let location = paths::resource_doc(prod, ResourceKind::Episode, &guid);
                let row = Resource {
                    guid: guid.clone(),
                    kind: ResourceKind::Episode,
                    parent_guid: prod.to_string(),
                    name: slugify(&episode.title),
                    location: location.clone(),
                    content_type: episode.enclosure.media_type.clone(),
                    size: episode.enclosure.size,
                    duration: 0,
                    index: episode.index,
                    published: episode.published.timestamp(),
                    created: now,
                    updated: now,
                };
                Ok((row, location))
            }
            Document::Asset(asset) => {
                let guid = fresh_guid(&asset.guid);
                let location = match asset.asset.rel {
                    RelMode::Local => format!("{}/{}", prod, asset.asset.uri),
                    RelMode::Import => {
                        crate::assets::fingerprint_path(prod, &asset.asset.uri)
                    }
                    RelMode::External => String::new(),
                };
                let row = Resource {
                    guid: guid.clone(),
                    kind: ResourceKind::Asset,
                    parent_guid: prod.to_string(),
                    name: asset.name.clone(),
                    location,
                    content_type: asset.asset.media_type.clone(),
                    size: asset.asset.size,
                    duration: 0,
                    index: 0,
                    published: 0,
                    created: now,
                    updated: now,
                };
                Ok((row, paths::resource_doc(prod, ResourceKind::Asset, &guid)))
            }
        }
    }
}

/// Asset references embedded in a document.
fn doc_assets(doc: &Document) -> Vec<&AssetRef> {
    match doc {
        Document::Show(show) => show.assets(),
        Document::Episode(episode) => episode.assets(),
        Document::Asset(asset) => vec![&asset.asset],
    }
}

/// Keep a caller-supplied GUID, mint one otherwise.
fn fresh_guid(guid: &str) -> String {
    if guid.is_empty() {
        Uuid::new_v4().simple().to_string()
    } else {
        guid.to_string()
    }
}

/// Stamp the row GUID back into the document before it is persisted.
fn with_guid(mut doc: Document, guid: &str) -> Document {
    match &mut doc {
        Document::Show(show) => show.guid = guid.to_string(),
        Document::Episode(episode) => episode.guid = guid.to_string(),
        Document::Asset(asset) => asset.guid = guid.to_string(),
    }
    doc
}
