//! Feed Parser: turns a raw response body into a normalized value the
//! Fetcher can upsert without caring whether the source was RSS or Atom.
//!
//! Split out from HTTP concerns (unlike the teacher's `rss_fetcher`, which
//! fetched and parsed in one function) so it can be unit-tested directly
//! against XML fixtures.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("feed parsing failed: {0}")]
    Fatal(String),
}

/// Per-channel metadata the Fetcher folds into the `feeds` row.
#[derive(Debug, Clone, Default)]
pub struct ChannelMeta {
    pub title: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
}

/// One syndicated item in source order, before GUID resolution or
/// sanitization — both are the Fetcher's job, not the parser's.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub guid_candidate: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub content_html: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub channel: ChannelMeta,
    pub entries: Vec<RawEntry>,
}

/// Parses raw feed bytes. Tolerant of malformed XML that still yields
/// entries; only a parser-reported fatal error with zero entries recovered
/// is treated as a hard failure.
pub fn parse(body: &[u8]) -> Result<ParsedFeed, ParseError> {
    let feed = match feed_rs::parser::parse(body) {
        Ok(feed) => feed,
        Err(e) => return Err(ParseError::Fatal(e.to_string())),
    };

    let channel = ChannelMeta {
        title: feed.title.as_ref().map(|t| t.content.clone()),
        link: feed.links.first().map(|l| l.href.clone()),
        author: feed.authors.first().map(|a| a.name.clone()),
    };

    let entries = feed
        .entries
        .into_iter()
        .map(|e| RawEntry {
            guid_candidate: Some(e.id).filter(|s| !s.is_empty()),
            link: e.links.first().map(|l| l.href.clone()),
            title: e.title.map(|t| t.content),
            author: e.authors.first().map(|a| a.name.clone()),
            content_html: e
                .content
                .and_then(|c| c.body)
                .or_else(|| e.summary.as_ref().map(|s| s.content.clone())),
            summary: e.summary.map(|s| s.content),
            published: e.published,
            updated: e.updated,
        })
        .collect();

    Ok(ParsedFeed { channel, entries })
}

/// Scans raw channel-level XML for an RSS 2.0 `<ttl>` element, in minutes.
///
/// Planet CF's own scheduling is fixed-interval (see the Scheduler), so this
/// hint is logged for operator visibility and not acted on — kept only for
/// parity with feeds that advertise a poll interval.
pub fn extract_ttl_hint(xml: &str) -> Option<i64> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_channel = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"channel" => {
                in_channel = true;
            }
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"ttl" && in_channel => {
                buf.clear();
                if let Ok(Event::Text(t)) = reader.read_event_into(&mut buf) {
                    if let Ok(ttl_str) = t.unescape() {
                        if let Ok(ttl) = ttl_str.parse::<i64>() {
                            if ttl > 0 {
                                return Some(ttl);
                            }
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"channel" => {
                in_channel = false;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    None
}
