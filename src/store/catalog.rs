//! Resource catalog: the key-value index of productions and resources.
//!
//! Key layout:
//!
//! ```text
//! production/{guid}        -> Production (JSON)
//! prodname/{slug}          -> production GUID
//! show/{prod}              -> show Resource (JSON); at most one per production
//! resource/{guid}          -> episode/asset Resource (JSON)
//! parent/{prod}/{guid}     -> resource GUID (enumeration index)
//! ```
//!
//! The show row lives apart from episode and asset rows: its GUID always
//! equals the production GUID, so one key per production makes the at-most-
//! one-show invariant structural. Listing with kind ALL merges the show row
//! back in.
//!
//! Store absence is a normal outcome at this layer; every lookup returns
//! `Ok(None)` for a missing row.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::domain::{now_epoch, Production, Resource, ResourceKind};
use crate::error::{Error, Result};

use super::kv::KvStore;

mod keys {
    pub fn production(guid: &str) -> String {
        format!("production/{}", guid)
    }

    pub fn production_name(name: &str) -> String {
        format!("prodname/{}", name)
    }

    pub fn show(parent: &str) -> String {
        format!("show/{}", parent)
    }

    pub fn resource(guid: &str) -> String {
        format!("resource/{}", guid)
    }

    pub fn parent_index(parent: &str, guid: &str) -> String {
        format!("parent/{}/{}", parent, guid)
    }

    pub fn parent_prefix(parent: &str) -> String {
        format!("parent/{}/", parent)
    }
}

/// KV-backed catalog of Production and Resource records.
pub struct Catalog {
    kv: Arc<dyn KvStore>,
}

impl Catalog {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.kv.put(key, &serde_json::to_vec(value)?)
    }

    // ------------------------------------------------------------------
    // Productions
    // ------------------------------------------------------------------

    /// Create a production. Idempotent per (name, owner): re-creating with
    /// the same owner returns the existing row; the same name under a
    /// different owner is a conflict.
    pub fn create_production(&self, production: Production) -> Result<Production> {
        if let Some(existing) = self.find_production_by_name(&production.name)? {
            if existing.owner == production.owner {
                return Ok(existing);
            }
            return Err(Error::Conflict(format!(
                "production name '{}' is taken by another owner",
                production.name
            )));
        }

        self.put_json(&keys::production(&production.guid), &production)?;
        self.kv.put(
            &keys::production_name(&production.name),
            production.guid.as_bytes(),
        )?;
        debug!(guid = %production.guid, name = %production.name, "created production");
        Ok(production)
    }

    pub fn get_production(&self, guid: &str) -> Result<Option<Production>> {
        self.get_json(&keys::production(guid))
    }

    pub fn find_production_by_name(&self, name: &str) -> Result<Option<Production>> {
        match self.kv.get(&keys::production_name(name))? {
            Some(bytes) => {
                let guid = String::from_utf8_lossy(&bytes).to_string();
                self.get_production(&guid)
            }
            None => Ok(None),
        }
    }

    /// Write back a modified production row.
    pub fn put_production(&self, production: &Production) -> Result<()> {
        self.put_json(&keys::production(&production.guid), production)
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// Create or update a resource row. The kind of an existing GUID is
    /// immutable; attempting to change it is a conflict.
    pub fn upsert_resource(&self, mut resource: Resource) -> Result<Resource> {
        let now = now_epoch();
        resource.updated = now;

        match resource.kind {
            ResourceKind::Show => {
                // Invariant: the show row's GUID equals the production GUID.
                if resource.guid != resource.parent_guid {
                    return Err(Error::Conflict(format!(
                        "show resource GUID '{}' must equal its production GUID '{}'",
                        resource.guid, resource.parent_guid
                    )));
                }
                if let Some(other) = self.get_json::<Resource>(&keys::resource(&resource.guid))? {
                    return Err(Error::Conflict(format!(
                        "resource '{}' already exists with kind {}",
                        resource.guid, other.kind
                    )));
                }
                if let Some(existing) = self.get_json::<Resource>(&keys::show(&resource.parent_guid))? {
                    resource.created = existing.created;
                } else {
                    resource.created = now;
                }
                self.put_json(&keys::show(&resource.parent_guid), &resource)?;
            }
            ResourceKind::Episode | ResourceKind::Asset => {
                if self.get_json::<Resource>(&keys::show(&resource.guid))?.is_some() {
                    return Err(Error::Conflict(format!(
                        "resource '{}' already exists with kind show",
                        resource.guid
                    )));
                }
                match self.get_json::<Resource>(&keys::resource(&resource.guid))? {
                    Some(existing) if existing.kind != resource.kind => {
                        return Err(Error::Conflict(format!(
                            "resource '{}' already exists with kind {}, cannot change to {}",
                            resource.guid, existing.kind, resource.kind
                        )));
                    }
                    // Re-parenting would leave the old parent/ index entry
                    // live and corrupt both productions' enumerations.
                    Some(existing) if existing.parent_guid != resource.parent_guid => {
                        return Err(Error::Conflict(format!(
                            "resource '{}' belongs to production '{}', cannot move it to '{}'",
                            resource.guid, existing.parent_guid, resource.parent_guid
                        )));
                    }
                    Some(existing) => resource.created = existing.created,
                    None if resource.created > 0 => {}
                    None => resource.created = now,
                }
                self.put_json(&keys::resource(&resource.guid), &resource)?;
                self.kv.put(
                    &keys::parent_index(&resource.parent_guid, &resource.guid),
                    resource.guid.as_bytes(),
                )?;
            }
        }

        debug!(guid = %resource.guid, kind = %resource.kind, "upserted resource");
        Ok(resource)
    }

    /// Look up a resource by its global GUID, regardless of kind.
    pub fn get_resource(&self, guid: &str) -> Result<Option<Resource>> {
        if let Some(row) = self.get_json(&keys::resource(guid))? {
            return Ok(Some(row));
        }
        // A show row's GUID equals its production GUID.
        self.get_json(&keys::show(guid))
    }

    pub fn find_resource_by_name(&self, parent: &str, name: &str) -> Result<Option<Resource>> {
        Ok(self
            .list_resources(parent, None)?
            .into_iter()
            .find(|r| r.name == name))
    }

    /// List a production's resources. `kind = None` (ALL) includes the show
    /// row even though it is stored apart from episode and asset rows.
    /// Enumeration order is deterministic: show first, then index-key order.
    pub fn list_resources(&self, parent: &str, kind: Option<ResourceKind>) -> Result<Vec<Resource>> {
        let mut rows = Vec::new();

        if matches!(kind, None | Some(ResourceKind::Show)) {
            if let Some(show) = self.get_json::<Resource>(&keys::show(parent))? {
                rows.push(show);
            }
            if kind == Some(ResourceKind::Show) {
                return Ok(rows);
            }
        }

        for (index_key, value) in self.kv.scan(&keys::parent_prefix(parent))? {
            let guid = String::from_utf8_lossy(&value).to_string();
            match self.get_json::<Resource>(&keys::resource(&guid))? {
                Some(row) => {
                    if kind.is_none() || kind == Some(row.kind) {
                        rows.push(row);
                    }
                }
                // Dangling index entries can remain after a half-finished
                // delete; skip them rather than failing the enumeration.
                None => debug!(key = %index_key, "skipping dangling parent index entry"),
            }
        }

        Ok(rows)
    }

    /// Remove a resource row and its parent-index entry, returning the
    /// removed row. Backing-blob removal and parent revalidation are the
    /// caller's responsibility.
    pub fn remove_resource(&self, guid: &str) -> Result<Option<Resource>> {
        if let Some(row) = self.get_json::<Resource>(&keys::resource(guid))? {
            self.kv.delete(&keys::resource(guid))?;
            self.kv
                .delete(&keys::parent_index(&row.parent_guid, guid))?;
            return Ok(Some(row));
        }
        if let Some(row) = self.get_json::<Resource>(&keys::show(guid))? {
            self.kv.delete(&keys::show(guid))?;
            return Ok(Some(row));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::SqliteKv;

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(SqliteKv::open_in_memory().unwrap()))
    }

    fn resource(guid: &str, kind: ResourceKind, parent: &str) -> Resource {
        Resource {
            guid: guid.to_string(),
            kind,
            parent_guid: parent.to_string(),
            name: format!("name-{}", guid),
            location: format!("{}/{}-{}.yaml", parent, kind, guid),
            content_type: String::new(),
            size: 0,
            duration: 0,
            index: 0,
            published: 0,
            created: 0,
            updated: 0,
        }
    }

    #[test]
    fn test_create_production_idempotent_per_owner() {
        let cat = catalog();
        let first = cat
            .create_production(Production::new("my-show", "acct-1", "My Show", "s"))
            .unwrap();
        let again = cat
            .create_production(Production::new("my-show", "acct-1", "My Show", "s"))
            .unwrap();
        assert_eq!(first.guid, again.guid);

        let err = cat
            .create_production(Production::new("my-show", "acct-2", "Their Show", "s"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_find_production_by_name() {
        let cat = catalog();
        let p = cat
            .create_production(Production::new("findable", "acct-1", "T", "s"))
            .unwrap();
        let found = cat.find_production_by_name("findable").unwrap().unwrap();
        assert_eq!(found.guid, p.guid);
        assert!(cat.find_production_by_name("absent").unwrap().is_none());
    }

    #[test]
    fn test_kind_is_immutable() {
        let cat = catalog();
        cat.upsert_resource(resource("e1", ResourceKind::Episode, "p1"))
            .unwrap();
        let err = cat
            .upsert_resource(resource("e1", ResourceKind::Asset, "p1"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // same kind upsert is fine and preserves created
        let first = cat.get_resource("e1").unwrap().unwrap();
        let updated = cat
            .upsert_resource(resource("e1", ResourceKind::Episode, "p1"))
            .unwrap();
        assert_eq!(updated.created, first.created);
    }

    #[test]
    fn test_parent_is_immutable() {
        let cat = catalog();
        cat.upsert_resource(resource("e1", ResourceKind::Episode, "p1"))
            .unwrap();
        let err = cat
            .upsert_resource(resource("e1", ResourceKind::Episode, "p2"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // the row stays under its original parent, nothing leaks into p2
        let p1 = cat.list_resources("p1", None).unwrap();
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].parent_guid, "p1");
        assert!(cat.list_resources("p2", None).unwrap().is_empty());
    }

    #[test]
    fn test_show_guid_must_equal_parent() {
        let cat = catalog();
        let err = cat
            .upsert_resource(resource("not-p1", ResourceKind::Show, "p1"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        cat.upsert_resource(resource("p1", ResourceKind::Show, "p1"))
            .unwrap();
    }

    #[test]
    fn test_show_and_episode_guid_collision() {
        let cat = catalog();
        cat.upsert_resource(resource("p1", ResourceKind::Show, "p1"))
            .unwrap();
        let err = cat
            .upsert_resource(resource("p1", ResourceKind::Episode, "p1"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_list_all_includes_show() {
        let cat = catalog();
        cat.upsert_resource(resource("p1", ResourceKind::Show, "p1"))
            .unwrap();
        cat.upsert_resource(resource("e1", ResourceKind::Episode, "p1"))
            .unwrap();
        cat.upsert_resource(resource("a1", ResourceKind::Asset, "p1"))
            .unwrap();

        let all = cat.list_resources("p1", None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].kind, ResourceKind::Show);

        let episodes = cat.list_resources("p1", Some(ResourceKind::Episode)).unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].guid, "e1");

        let shows = cat.list_resources("p1", Some(ResourceKind::Show)).unwrap();
        assert_eq!(shows.len(), 1);
    }

    #[test]
    fn test_get_resource_falls_back_to_show() {
        let cat = catalog();
        cat.upsert_resource(resource("p1", ResourceKind::Show, "p1"))
            .unwrap();
        let row = cat.get_resource("p1").unwrap().unwrap();
        assert_eq!(row.kind, ResourceKind::Show);
    }

    #[test]
    fn test_find_resource_by_name() {
        let cat = catalog();
        cat.upsert_resource(resource("e1", ResourceKind::Episode, "p1"))
            .unwrap();
        let found = cat.find_resource_by_name("p1", "name-e1").unwrap().unwrap();
        assert_eq!(found.guid, "e1");
        assert!(cat.find_resource_by_name("p1", "nope").unwrap().is_none());
    }

    #[test]
    fn test_remove_resource() {
        let cat = catalog();
        cat.upsert_resource(resource("p1", ResourceKind::Show, "p1"))
            .unwrap();
        cat.upsert_resource(resource("e1", ResourceKind::Episode, "p1"))
            .unwrap();

        let removed = cat.remove_resource("e1").unwrap().unwrap();
        assert_eq!(removed.guid, "e1");
        assert!(cat.get_resource("e1").unwrap().is_none());
        assert_eq!(cat.list_resources("p1", None).unwrap().len(), 1);

        let removed = cat.remove_resource("p1").unwrap().unwrap();
        assert_eq!(removed.kind, ResourceKind::Show);
        assert!(cat.remove_resource("gone").unwrap().is_none());
    }
}
