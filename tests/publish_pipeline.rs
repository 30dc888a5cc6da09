//! Publication Pipeline Integration Tests
//!
//! Exercises the full path through the service layer: create a production,
//! apply show and episode documents, build the feed, and check the
//! invalidation behavior of deletes.

use std::sync::Arc;

use async_trait::async_trait;
use castkeep::domain::{label, now_epoch, AssetRef, Document, EpisodeDoc, Labels, Person, ShowDoc};
use castkeep::feed::parse_feed;
use castkeep::http::{FetchResponse, HeadResponse, HttpClient};
use castkeep::queue::{ImportTask, TaskQueue};
use castkeep::store::{paths, BlobStore};
use castkeep::{Caller, Catalog, CatalogService, Error, FsBlobStore, ResourceKind, SqliteKv};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

/// HTTP double whose HEADs always succeed. The publish path never GETs.
struct AlwaysReachable;

#[async_trait]
impl HttpClient for AlwaysReachable {
    async fn head(&self, _url: &str) -> castkeep::Result<HeadResponse> {
        Ok(HeadResponse { status: 200 })
    }

    async fn fetch(&self, url: &str) -> castkeep::Result<FetchResponse> {
        panic!("unexpected fetch of {}", url);
    }
}

/// Queue double that accepts and forgets.
struct DropQueue;

#[async_trait]
impl TaskQueue for DropQueue {
    async fn enqueue(&self, _task: ImportTask) -> castkeep::Result<()> {
        Ok(())
    }
}

struct Env {
    service: CatalogService,
    blob: Arc<FsBlobStore>,
    _temp: TempDir,
}

fn env() -> Env {
    let temp = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new(Arc::new(SqliteKv::open_in_memory().unwrap())));
    let blob = Arc::new(FsBlobStore::open(temp.path()).unwrap());
    let service = CatalogService::new(
        catalog,
        blob.clone(),
        Arc::new(AlwaysReachable),
        Arc::new(DropQueue),
        "https://cdn.example.com",
    );
    Env {
        service,
        blob,
        _temp: temp,
    }
}

fn caller() -> Caller {
    Caller::new("acct-1")
}

fn show_doc() -> Document {
    Document::Show(ShowDoc {
        guid: String::new(),
        title: "My Show".to_string(),
        summary: "About things".to_string(),
        link: "https://example.com".to_string(),
        language: "en".to_string(),
        author: None,
        owner: Person {
            name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
        },
        copyright: String::new(),
        category: None,
        image: None,
        feed_link: None,
        labels: Labels::new(),
    })
}

fn episode_doc(title: &str, published: i64, labels: Labels) -> Document {
    Document::Episode(EpisodeDoc {
        guid: String::new(),
        title: title.to_string(),
        summary: format!("{} summary", title),
        description: String::new(),
        published: Utc.timestamp_opt(published, 0).single().unwrap(),
        index: 0,
        link: String::new(),
        enclosure: AssetRef::external("https://elsewhere.example.com/a.mp3"),
        image: None,
        labels,
    })
}

#[tokio::test]
async fn test_build_without_episodes_writes_nothing() {
    let e = env();
    let p = e
        .service
        .create_production(&caller(), "my show", "My Show", "x")
        .unwrap();
    e.service
        .update_resource(&caller(), &p.guid, show_doc())
        .await
        .unwrap();

    let err = e.service.build_feed(&p.guid, false).await.unwrap_err();
    assert!(err.is_validation());
    assert!(!e.blob.exists(&paths::feed(&p.guid)).await.unwrap());
}

#[tokio::test]
async fn test_minimal_production_publishes_well_formed_feed() {
    let e = env();
    let p = e
        .service
        .create_production(&caller(), "my show", "My Show", "x")
        .unwrap();
    e.service
        .update_resource(&caller(), &p.guid, show_doc())
        .await
        .unwrap();
    e.service
        .update_resource(
            &caller(),
            &p.guid,
            episode_doc("Pilot", now_epoch() - 3600, Labels::new()),
        )
        .await
        .unwrap();

    let xml = e.service.build_feed(&p.guid, false).await.unwrap();
    let parsed = parse_feed(&xml).unwrap();
    assert_eq!(parsed.title, "My Show");
    assert_eq!(parsed.language, "en");
    assert_eq!(parsed.show_type, "Episodic");
    assert_eq!(parsed.item_titles, vec!["Pilot"]);

    // the published object matches what build returned
    let stored = e.blob.get(&paths::feed(&p.guid)).await.unwrap().unwrap();
    assert_eq!(stored, xml.as_bytes());
}

#[tokio::test]
async fn test_future_episode_validates_but_does_not_build() {
    let e = env();
    let p = e
        .service
        .create_production(&caller(), "my show", "My Show", "x")
        .unwrap();
    e.service
        .update_resource(&caller(), &p.guid, show_doc())
        .await
        .unwrap();
    e.service
        .update_resource(
            &caller(),
            &p.guid,
            episode_doc("Future", now_epoch() + 3600, Labels::new()),
        )
        .await
        .unwrap();

    // structural gate passes
    e.service.validate_production(&p.guid).unwrap();

    // temporal gate does not
    let err = e.service.build_feed(&p.guid, false).await.unwrap_err();
    assert!(err.to_string().contains("no visible episodes"));
}

#[tokio::test]
async fn test_blocked_episode_is_excluded() {
    let e = env();
    let p = e
        .service
        .create_production(&caller(), "my show", "My Show", "x")
        .unwrap();
    e.service
        .update_resource(&caller(), &p.guid, show_doc())
        .await
        .unwrap();

    let now = now_epoch();
    e.service
        .update_resource(&caller(), &p.guid, episode_doc("Kept", now - 100, Labels::new()))
        .await
        .unwrap();
    let mut blocked = Labels::new();
    blocked.insert(label::BLOCK.to_string(), "yes".to_string());
    e.service
        .update_resource(&caller(), &p.guid, episode_doc("Hidden", now - 50, blocked))
        .await
        .unwrap();

    let xml = e.service.build_feed(&p.guid, false).await.unwrap();
    let parsed = parse_feed(&xml).unwrap();
    assert_eq!(parsed.item_titles, vec!["Kept"]);
}

#[tokio::test]
async fn test_items_ordered_newest_first() {
    let e = env();
    let p = e
        .service
        .create_production(&caller(), "my show", "My Show", "x")
        .unwrap();
    e.service
        .update_resource(&caller(), &p.guid, show_doc())
        .await
        .unwrap();

    let base = now_epoch() - 1000;
    for (title, offset) in [("A", 100), ("B", 300), ("C", 200)] {
        e.service
            .update_resource(
                &caller(),
                &p.guid,
                episode_doc(title, base + offset, Labels::new()),
            )
            .await
            .unwrap();
    }

    let xml = e.service.build_feed(&p.guid, false).await.unwrap();
    let parsed = parse_feed(&xml).unwrap();
    assert_eq!(parsed.item_titles, vec!["B", "C", "A"]);
}

#[tokio::test]
async fn test_delete_only_show_invalidates_production() {
    let e = env();
    let p = e
        .service
        .create_production(&caller(), "my show", "My Show", "x")
        .unwrap();
    e.service
        .update_resource(&caller(), &p.guid, show_doc())
        .await
        .unwrap();
    e.service
        .update_resource(
            &caller(),
            &p.guid,
            episode_doc("Pilot", now_epoch() - 3600, Labels::new()),
        )
        .await
        .unwrap();
    e.service.build_feed(&p.guid, false).await.unwrap();
    assert!(e.service.get_production(&p.guid).unwrap().published);

    // the show row shares the production GUID
    e.service.delete_resource(&caller(), &p.guid).await.unwrap();

    let after = e.service.get_production(&p.guid).unwrap();
    assert_eq!(after.build_date, 0);
    assert!(!after.published);

    // the show document is gone too
    assert!(!e.blob.exists(&paths::show_doc(&p.guid)).await.unwrap());
    assert!(e
        .service
        .list_resources(&p.guid, Some(ResourceKind::Show))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_duplicate_name_across_owners_conflicts() {
    let e = env();
    e.service
        .create_production(&caller(), "my show", "My Show", "x")
        .unwrap();
    let err = e
        .service
        .create_production(&Caller::new("acct-2"), "my show", "Theirs", "x")
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn test_validate_only_build_leaves_no_trace() {
    let e = env();
    let p = e
        .service
        .create_production(&caller(), "my show", "My Show", "x")
        .unwrap();
    e.service
        .update_resource(&caller(), &p.guid, show_doc())
        .await
        .unwrap();
    e.service
        .update_resource(
            &caller(),
            &p.guid,
            episode_doc("Pilot", now_epoch() - 3600, Labels::new()),
        )
        .await
        .unwrap();

    let xml = e.service.build_feed(&p.guid, true).await.unwrap();
    assert!(xml.contains("<title>Pilot</title>"));
    assert!(!e.blob.exists(&paths::feed(&p.guid)).await.unwrap());
    assert!(!e.service.get_production(&p.guid).unwrap().published);
}
