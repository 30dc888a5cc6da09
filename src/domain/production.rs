//! Production: the top-level podcast entity, owned by one account.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A production row in the catalog.
///
/// The row carries publication bookkeeping only; show content lives in the
/// show document held by the blob store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Production {
    /// Globally unique identifier (primary key)
    pub guid: String,

    /// Owner-unique slug
    pub name: String,

    /// Account identifier of the owner
    pub owner: String,

    /// Display title
    pub title: String,

    /// Short summary
    pub summary: String,

    /// Epoch seconds of the last successful publish.
    /// 0 means the published feed, if any, must be considered stale.
    #[serde(default)]
    pub build_date: i64,

    /// Whether a feed has been published for this production
    #[serde(default)]
    pub published: bool,

    /// Publish epoch of the newest episode in the last built feed
    #[serde(default)]
    pub latest_publish_date: i64,

    /// Creation epoch
    pub created: i64,

    /// Last update epoch
    pub updated: i64,
}

impl Production {
    /// Create a new production with a fresh GUID.
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        let now = now_epoch();
        Self {
            guid: Uuid::new_v4().simple().to_string(),
            name: name.into(),
            owner: owner.into(),
            title: title.into(),
            summary: summary.into(),
            build_date: 0,
            published: false,
            latest_publish_date: 0,
            created: now,
            updated: now,
        }
    }

    /// Reset publication state. The next feed read must treat any published
    /// feed object as stale.
    pub fn mark_stale(&mut self) {
        self.build_date = 0;
        self.published = false;
        self.latest_publish_date = 0;
        self.updated = now_epoch();
    }

    /// Record a successful publish.
    pub fn mark_published(&mut self, build_date: i64, latest_publish_date: i64) {
        self.build_date = build_date;
        self.published = true;
        self.latest_publish_date = latest_publish_date;
        self.updated = now_epoch();
    }

    /// A zero build date marks the production as needing a rebuild.
    pub fn needs_rebuild(&self) -> bool {
        self.build_date == 0
    }
}

/// Current time as epoch seconds.
pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Normalize a production or resource name into a slug: lowercase
/// alphanumerics with single dashes, no leading/trailing dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
