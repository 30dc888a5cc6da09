//! Structural buildability check for productions.
//!
//! Existence-based only: a production is buildable iff it has exactly one
//! show row and at least one episode row. Publish dates and block labels
//! are deliberately not consulted here; temporal visibility is the feed
//! builder's own gate, and callers rely on the existence-only semantics
//! independently of any build attempt.

use crate::domain::ResourceKind;
use crate::error::{Error, Result};
use crate::store::Catalog;

/// Check whether the production is structurally complete enough to build.
///
/// Invoked on every resource delete (reactive invalidation) and at the
/// start of every build (gating).
pub fn validate_production(catalog: &Catalog, guid: &str) -> Result<()> {
    let rows = catalog.list_resources(guid, None)?;
    if rows.is_empty() {
        return Err(Error::NotFound(format!(
            "production '{}' has no resources",
            guid
        )));
    }

    let shows = rows.iter().filter(|r| r.kind == ResourceKind::Show).count();
    let episodes = rows
        .iter()
        .filter(|r| r.kind == ResourceKind::Episode)
        .count();

    if shows != 1 {
        return Err(Error::ValidationFailed(format!(
            "production '{}' must have exactly one show, found {}",
            guid, shows
        )));
    }
    if episodes == 0 {
        return Err(Error::ValidationFailed(format!(
            "production '{}' has no episodes",
            guid
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{now_epoch, Resource};
    use crate::store::SqliteKv;

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(SqliteKv::open_in_memory().unwrap()))
    }

    fn row(guid: &str, kind: ResourceKind, parent: &str) -> Resource {
        let now = now_epoch();
        Resource {
            guid: guid.to_string(),
            kind,
            parent_guid: parent.to_string(),
            name: guid.to_string(),
            location: String::new(),
            content_type: String::new(),
            size: 0,
            duration: 0,
            index: 0,
            published: 0,
            created: now,
            updated: now,
        }
    }

    #[test]
    fn test_empty_production_is_not_found() {
        let cat = catalog();
        let err = validate_production(&cat, "p1").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_show_without_episodes_fails() {
        let cat = catalog();
        cat.upsert_resource(row("p1", ResourceKind::Show, "p1")).unwrap();
        let err = validate_production(&cat, "p1").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("no episodes"));
    }

    #[test]
    fn test_episodes_without_show_fail() {
        let cat = catalog();
        cat.upsert_resource(row("e1", ResourceKind::Episode, "p1")).unwrap();
        let err = validate_production(&cat, "p1").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("exactly one show"));
    }

    #[test]
    fn test_complete_production_validates() {
        let cat = catalog();
        cat.upsert_resource(row("p1", ResourceKind::Show, "p1")).unwrap();
        cat.upsert_resource(row("e1", ResourceKind::Episode, "p1")).unwrap();
        validate_production(&cat, "p1").unwrap();

        // assets do not change the outcome
        cat.upsert_resource(row("a1", ResourceKind::Asset, "p1")).unwrap();
        validate_production(&cat, "p1").unwrap();
    }

    #[test]
    fn test_validation_ignores_publish_dates() {
        let cat = catalog();
        cat.upsert_resource(row("p1", ResourceKind::Show, "p1")).unwrap();
        let mut future = row("e1", ResourceKind::Episode, "p1");
        future.published = now_epoch() + 86_400;
        cat.upsert_resource(future).unwrap();

        // still buildable by the existence-only gate
        validate_production(&cat, "p1").unwrap();
    }
}
