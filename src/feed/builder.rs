//! Feed publication pipeline.
//!
//! Build runs in two phases with distinct gates. The structural gate is the
//! validator: exactly one show, at least one episode, regardless of dates.
//! The temporal gate runs here: episodes publish-dated in the future or
//! carrying a block label are dropped from the feed without affecting
//! buildability. A build that fails either gate marks the production stale
//! so readers stop trusting any previously published feed object.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::{now_epoch, Document, Production, Resource, ResourceKind};
use crate::error::{Error, Result};
use crate::feed::channel::{channel_from_show, item_from_episode, Channel};
use crate::feed::xml::write_feed;
use crate::store::{paths, BlobStore, Catalog};
use crate::validator::validate_production;

/// Assembles and publishes feeds for productions.
pub struct FeedBuilder {
    catalog: Arc<Catalog>,
    blob: Arc<dyn BlobStore>,
    cdn_base: String,
}

impl FeedBuilder {
    pub fn new(catalog: Arc<Catalog>, blob: Arc<dyn BlobStore>, cdn_base: impl Into<String>) -> Self {
        Self {
            catalog,
            blob,
            cdn_base: cdn_base.into(),
        }
    }

    /// Build the feed for a production and return the XML.
    ///
    /// With `validate_only` the full pipeline runs, gates included, but the
    /// feed object is not written and publication state is untouched.
    #[instrument(skip(self), fields(production = %guid))]
    pub async fn build(&self, guid: &str, validate_only: bool) -> Result<String> {
        let mut production = self
            .catalog
            .get_production(guid)?
            .ok_or_else(|| Error::NotFound(format!("production '{}' not found", guid)))?;

        if let Err(e) = validate_production(&self.catalog, guid) {
            self.invalidate(&mut production)?;
            return Err(e);
        }

        let episodes = self.visible_episodes(&production).await?;
        if episodes.is_empty() {
            self.invalidate(&mut production)?;
            return Err(Error::ValidationFailed(format!(
                "production '{}' has no visible episodes",
                guid
            )));
        }

        let mut channel = self.load_channel(&production).await?;
        let latest = episodes[0].0.published;
        channel.pub_date = Some(latest);
        for (row, doc) in &episodes {
            channel
                .items
                .push(item_from_episode(row, doc, &self.cdn_base, guid));
        }

        let xml = write_feed(&channel)?;
        if validate_only {
            info!(items = channel.items.len(), "feed validated, not published");
            return Ok(xml);
        }

        self.blob.put(&paths::feed(guid), xml.as_bytes()).await?;
        production.mark_published(now_epoch(), latest);
        self.catalog.put_production(&production)?;
        info!(items = channel.items.len(), "feed published");
        Ok(xml)
    }

    /// Load the show document and turn it into channel fields.
    async fn load_channel(&self, production: &Production) -> Result<Channel> {
        let path = paths::show_doc(&production.guid);
        let raw = self.blob.get(&path).await?.ok_or_else(|| {
            Error::ValidationFailed(format!(
                "production '{}' has no show document",
                production.guid
            ))
        })?;
        let text = String::from_utf8(raw)
            .map_err(|e| Error::Internal(anyhow::anyhow!("show document {}: {}", path, e)))?;
        match Document::from_yaml(&text)? {
            Document::Show(show) => channel_from_show(&show, production, &self.cdn_base),
            other => Err(Error::ValidationFailed(format!(
                "document at {} is a {}, expected a show",
                path,
                other.kind()
            ))),
        }
    }

    /// Episode rows paired with their documents, temporal gate applied,
    /// newest first. The sort is stable so equal publish dates keep the
    /// catalog's enumeration order.
    async fn visible_episodes(
        &self,
        production: &Production,
    ) -> Result<Vec<(Resource, crate::domain::EpisodeDoc)>> {
        let now = now_epoch();
        let rows = self
            .catalog
            .list_resources(&production.guid, Some(ResourceKind::Episode))?;

        let mut episodes = Vec::with_capacity(rows.len());
        for row in rows {
            if row.published >= now {
                continue;
            }
            let path = paths::resource_doc(&production.guid, ResourceKind::Episode, &row.guid);
            let Some(raw) = self.blob.get(&path).await? else {
                warn!(path, "episode row has no document, skipping");
                continue;
            };
            let text = String::from_utf8(raw)
                .map_err(|e| Error::Internal(anyhow::anyhow!("episode document {}: {}", path, e)))?;
            let Document::Episode(doc) = Document::from_yaml(&text)? else {
                warn!(path, "document is not an episode, skipping");
                continue;
            };
            if doc.is_blocked() {
                continue;
            }
            episodes.push((row, doc));
        }

        episodes.sort_by(|a, b| b.0.published.cmp(&a.0.published));
        Ok(episodes)
    }

    /// A failed gate resets publication state; the stale feed object, if one
    /// was published earlier, stays in the blob store but readers must treat
    /// a zero build date as "no current feed".
    fn invalidate(&self, production: &mut Production) -> Result<()> {
        production.mark_stale();
        self.catalog.put_production(production)
    }
}
