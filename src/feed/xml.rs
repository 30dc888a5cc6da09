//! RSS 2.0 + iTunes XML serialization.
//!
//! The itunes namespace is always declared; the atom namespace only when a
//! self-link is present. The reader here is deliberately minimal: it exists
//! to verify that a built channel survives a round-trip, not to consume
//! arbitrary feeds.

use chrono::{TimeZone, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

use super::channel::Channel;

pub const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

fn xml_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Internal(anyhow::anyhow!("{}: {}", context, e))
}

/// Epoch seconds to RFC 2822, the date format RSS requires.
fn rfc2822(epoch: i64) -> String {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .map(|dt| dt.to_rfc2822())
        .unwrap_or_default()
}

/// Serialize a channel into a complete RSS document.
pub fn write_feed(channel: &Channel) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let w = &mut writer;

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| xml_err("write xml decl", e))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:itunes", ITUNES_NS));
    if channel.self_link.is_some() {
        rss.push_attribute(("xmlns:atom", ATOM_NS));
    }
    start(w, rss)?;
    start(w, BytesStart::new("channel"))?;

    text_element(w, "title", &channel.title)?;
    text_element(w, "link", &channel.link)?;
    text_element(w, "description", &channel.description)?;
    text_element(w, "language", &channel.language)?;
    if !channel.copyright.is_empty() {
        text_element(w, "copyright", &channel.copyright)?;
    }
    if let Some(pub_date) = channel.pub_date {
        text_element(w, "pubDate", &rfc2822(pub_date))?;
    }
    text_element(w, "generator", "castkeep")?;

    if let Some(self_link) = &channel.self_link {
        let mut atom = BytesStart::new("atom:link");
        atom.push_attribute(("href", self_link.as_str()));
        atom.push_attribute(("rel", "self"));
        atom.push_attribute(("type", "application/rss+xml"));
        empty(w, atom)?;
    }

    text_element(w, "itunes:author", &channel.author.name)?;
    text_element(w, "itunes:summary", &channel.description)?;
    text_element(w, "itunes:explicit", &channel.explicit)?;
    text_element(w, "itunes:type", &channel.show_type.to_string())?;
    if channel.complete {
        text_element(w, "itunes:complete", "yes")?;
    }

    start(w, BytesStart::new("itunes:owner"))?;
    text_element(w, "itunes:name", &channel.owner.name)?;
    text_element(w, "itunes:email", &channel.owner.email)?;
    end(w, "itunes:owner")?;

    if let Some(image) = &channel.image {
        let mut el = BytesStart::new("itunes:image");
        el.push_attribute(("href", image.as_str()));
        empty(w, el)?;
    }

    if let Some((category, subcategory)) = &channel.category {
        let mut el = BytesStart::new("itunes:category");
        el.push_attribute(("text", category.as_str()));
        match subcategory {
            Some(sub) => {
                start(w, el)?;
                let mut inner = BytesStart::new("itunes:category");
                inner.push_attribute(("text", sub.as_str()));
                empty(w, inner)?;
                end(w, "itunes:category")?;
            }
            None => empty(w, el)?,
        }
    }

    for item in &channel.items {
        start(w, BytesStart::new("item"))?;
        text_element(w, "title", &item.title)?;
        text_element(w, "description", &item.description)?;
        if !item.link.is_empty() {
            text_element(w, "link", &item.link)?;
        }

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        start(w, guid)?;
        w.write_event(Event::Text(BytesText::new(&item.guid)))
            .map_err(|e| xml_err("write guid", e))?;
        end(w, "guid")?;

        text_element(w, "pubDate", &rfc2822(item.pub_date))?;

        if let Some(enclosure) = &item.enclosure {
            let mut el = BytesStart::new("enclosure");
            el.push_attribute(("url", enclosure.url.as_str()));
            el.push_attribute(("length", enclosure.length.to_string().as_str()));
            el.push_attribute(("type", enclosure.media_type.as_str()));
            empty(w, el)?;
        }

        if let Some(image) = &item.image {
            let mut el = BytesStart::new("itunes:image");
            el.push_attribute(("href", image.as_str()));
            empty(w, el)?;
        }
        if let Some(duration) = item.duration {
            text_element(w, "itunes:duration", &duration.to_string())?;
        }
        if let Some(season) = &item.season {
            text_element(w, "itunes:season", season)?;
        }
        if let Some(episode) = &item.episode {
            text_element(w, "itunes:episode", episode)?;
        }
        if let Some(explicit) = &item.explicit {
            text_element(w, "itunes:explicit", explicit)?;
        }
        if let Some(block) = &item.block {
            text_element(w, "itunes:block", block)?;
        }
        if let Some(episode_type) = &item.episode_type {
            text_element(w, "itunes:episodeType", episode_type)?;
        }
        end(w, "item")?;
    }

    end(w, "channel")?;
    end(w, "rss")?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| xml_err("feed xml is not valid utf-8", e))
}

fn start(w: &mut Writer<Vec<u8>>, el: BytesStart<'_>) -> Result<()> {
    w.write_event(Event::Start(el))
        .map_err(|e| xml_err("write start tag", e))
}

fn end(w: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| xml_err("write end tag", e))
}

fn empty(w: &mut Writer<Vec<u8>>, el: BytesStart<'_>) -> Result<()> {
    w.write_event(Event::Empty(el))
        .map_err(|e| xml_err("write empty tag", e))
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    start(w, BytesStart::new(name))?;
    w.write_event(Event::Text(BytesText::new(value)))
        .map_err(|e| xml_err("write text", e))?;
    end(w, name)
}

/// The channel fields the round-trip check cares about.
#[derive(Debug, Default, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub language: String,
    pub show_type: String,
    pub item_titles: Vec<String>,
    pub item_guids: Vec<String>,
}

/// Parse a built feed back into its load-bearing fields.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed> {
    let mut reader = Reader::from_str(xml);
    let mut parsed = ParsedFeed::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                path.push(name);
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| xml_err("unescape text", err))?
                    .to_string();
                match path.iter().map(String::as_str).collect::<Vec<_>>()[..] {
                    ["rss", "channel", "title"] => parsed.title = text,
                    ["rss", "channel", "language"] => parsed.language = text,
                    ["rss", "channel", "itunes:type"] => parsed.show_type = text,
                    ["rss", "channel", "item", "title"] => parsed.item_titles.push(text),
                    ["rss", "channel", "item", "guid"] => parsed.item_guids.push(text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_err("parse feed xml", e)),
        }
    }

    Ok(parsed)
}
