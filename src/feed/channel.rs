//! Channel and item assembly from catalog documents.
//!
//! These transforms are pure: they take the already-loaded documents plus
//! the CDN base and produce the values the XML writer serializes. Asset
//! references are resolved here; nothing downstream sees a Rel mode.

use crate::assets::resolver::resolve_uri;
use crate::domain::{label, EpisodeDoc, Person, Production, Resource, ShowDoc, ShowType};
use crate::error::{Error, Result};

/// Channel-level feed fields.
#[derive(Debug, Clone)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub copyright: String,
    /// itunes:author; falls back to the owner when the show sets none
    pub author: Person,
    pub owner: Person,
    /// 2-tier iTunes category tree: (category, optional subcategory)
    pub category: Option<(String, Option<String>)>,
    /// Resolved cover image URL
    pub image: Option<String>,
    pub explicit: String,
    pub show_type: ShowType,
    pub complete: bool,
    /// Canonical feed URL; presence turns on the atom self-link
    pub self_link: Option<String>,
    /// Publish epoch of the newest item
    pub pub_date: Option<i64>,
    pub items: Vec<Item>,
}

/// A feed item.
#[derive(Debug, Clone)]
pub struct Item {
    pub title: String,
    pub description: String,
    pub link: String,
    /// From the episode's own guid label, never derived from the enclosure URL
    pub guid: String,
    pub pub_date: i64,
    pub enclosure: Option<Enclosure>,
    pub image: Option<String>,
    pub duration: Option<i64>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub explicit: Option<String>,
    pub block: Option<String>,
    pub episode_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Enclosure {
    pub url: String,
    pub media_type: String,
    pub length: i64,
}

/// Transform the show document into channel-level fields.
///
/// The show type label must be exactly "Episodic" or "Serial"; this is the
/// only place the enum is enforced. A missing label defaults to Episodic.
pub fn channel_from_show(show: &ShowDoc, production: &Production, cdn_base: &str) -> Result<Channel> {
    let show_type = match show.label(label::TYPE) {
        Some(value) => value.parse::<ShowType>().map_err(|_| {
            Error::ValidationFailed(format!(
                "production '{}': show type must be \"Episodic\" or \"Serial\", got \"{}\"",
                production.guid,
                show.label(label::TYPE).unwrap_or_default()
            ))
        })?,
        None => ShowType::Episodic,
    };

    let author = show.author.clone().unwrap_or_else(|| show.owner.clone());

    let image = show
        .image
        .as_ref()
        .map(|asset| resolve_uri(asset, cdn_base, &production.guid));

    Ok(Channel {
        title: show.title.clone(),
        link: show.link.clone(),
        description: show.summary.clone(),
        language: show.language.clone(),
        copyright: show.copyright.clone(),
        author,
        owner: show.owner.clone(),
        category: show
            .category
            .as_ref()
            .map(|c| (c.name.clone(), c.subcategory.clone())),
        image,
        explicit: show.label(label::EXPLICIT).unwrap_or("no").to_string(),
        show_type,
        complete: show.label(label::COMPLETE) == Some("yes"),
        self_link: show.feed_link.clone(),
        pub_date: None,
        items: Vec::new(),
    })
}

/// Transform one surviving episode into a feed item.
pub fn item_from_episode(
    row: &Resource,
    episode: &EpisodeDoc,
    cdn_base: &str,
    parent: &str,
) -> Item {
    let enclosure_url = resolve_uri(&episode.enclosure, cdn_base, parent);
    let image = episode
        .image
        .as_ref()
        .map(|asset| resolve_uri(asset, cdn_base, parent));

    let description = if episode.description.is_empty() {
        episode.summary.clone()
    } else {
        episode.description.clone()
    };

    Item {
        title: episode.title.clone(),
        description,
        link: episode.link.clone(),
        guid: episode
            .label(label::GUID)
            .unwrap_or(&episode.guid)
            .to_string(),
        pub_date: row.published,
        enclosure: Some(Enclosure {
            url: enclosure_url,
            media_type: episode.enclosure.media_type.clone(),
            length: episode.enclosure.size,
        }),
        image,
        duration: (row.duration > 0).then_some(row.duration),
        season: episode.label(label::SEASON).map(str::to_string),
        episode: episode.label(label::EPISODE).map(str::to_string),
        explicit: episode.label(label::EXPLICIT).map(str::to_string),
        block: episode.label(label::BLOCK).map(str::to_string),
        episode_type: episode.label(label::TYPE).map(str::to_string),
    }
}
