//! Hand-written Atom/RSS/OPML generation. Grounded on the format!-then-write
//! technique in the pack's static-site generators, adapted to build on
//! `quick_xml::Writer` (already a dependency for `feed_parser`'s TTL scan)
//! instead of a separate syndication crate, so entry titles and content
//! can't break the document via unescaped `&`/`<`.

use crate::domain::models::{Entry, Feed};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

fn text_elem(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, value: &str) {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(value))
        .expect("writing to an in-memory buffer cannot fail");
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> String {
    String::from_utf8(writer.into_inner().into_inner())
        .expect("generated XML is always valid UTF-8")
}

/// Atom 1.0 feed of the most recent entries across all active feeds,
/// fully sanitized (sanitization already happened at ingest time).
pub fn render_atom(
    site_title: &str,
    site_url: &str,
    entries: &[(Entry, String)],
    generated_at: DateTime<Utc>,
) -> String {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(quick_xml::events::BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            None,
        )))
        .unwrap();

    let mut feed_start = BytesStart::new("feed");
    feed_start.push_attribute(("xmlns", "http://www.w3.org/2005/Atom"));
    writer.write_event(Event::Start(feed_start)).unwrap();

    text_elem(&mut writer, "title", site_title);
    text_elem(&mut writer, "id", site_url);
    text_elem(&mut writer, "updated", &generated_at.to_rfc3339());

    let mut link = BytesStart::new("link");
    link.push_attribute(("rel", "self"));
    link.push_attribute(("href", site_url));
    writer.write_event(Event::Empty(link)).unwrap();

    for (entry, feed_title) in entries {
        writer
            .write_event(Event::Start(BytesStart::new("entry")))
            .unwrap();
        text_elem(&mut writer, "title", &entry.title);
        text_elem(
            &mut writer,
            "id",
            entry.url.as_deref().unwrap_or(&entry.guid),
        );
        if let Some(url) = &entry.url {
            let mut link = BytesStart::new("link");
            link.push_attribute(("href", url.as_str()));
            writer.write_event(Event::Empty(link)).unwrap();
        }
        if let Some(published) = entry.published_at {
            text_elem(&mut writer, "published", &published.to_rfc3339());
        }
        text_elem(&mut writer, "updated", &entry.updated_at.to_rfc3339());
        text_elem(&mut writer, "author", feed_title);

        let mut content = BytesStart::new("content");
        content.push_attribute(("type", "html"));
        writer.write_event(Event::Start(content)).unwrap();
        writer
            .write_event(Event::CData(BytesCData::new(
                entry.content.as_deref().unwrap_or(""),
            )))
            .unwrap();
        writer
            .write_event(Event::End(BytesEnd::new("content")))
            .unwrap();

        writer
            .write_event(Event::End(BytesEnd::new("entry")))
            .unwrap();
    }

    writer
        .write_event(Event::End(BytesEnd::new("feed")))
        .unwrap();
    into_string(writer)
}

/// RSS 2.0 feed of the most recent entries across all active feeds.
pub fn render_rss(
    site_title: &str,
    site_url: &str,
    entries: &[(Entry, String)],
    generated_at: DateTime<Utc>,
) -> String {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(quick_xml::events::BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            None,
        )))
        .unwrap();

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss)).unwrap();
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .unwrap();

    text_elem(&mut writer, "title", site_title);
    text_elem(&mut writer, "link", site_url);
    text_elem(&mut writer, "description", site_title);
    text_elem(
        &mut writer,
        "lastBuildDate",
        &generated_at.to_rfc2822(),
    );

    for (entry, feed_title) in entries {
        writer
            .write_event(Event::Start(BytesStart::new("item")))
            .unwrap();
        text_elem(&mut writer, "title", &entry.title);
        if let Some(url) = &entry.url {
            text_elem(&mut writer, "link", url);
        }
        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        writer.write_event(Event::Start(guid)).unwrap();
        writer
            .write_event(Event::Text(BytesText::new(&entry.guid)))
            .unwrap();
        writer
            .write_event(Event::End(BytesEnd::new("guid")))
            .unwrap();

        text_elem(&mut writer, "author", feed_title);
        if let Some(published) = entry.published_at {
            text_elem(&mut writer, "pubDate", &published.to_rfc2822());
        }
        text_elem(
            &mut writer,
            "description",
            entry.summary.as_deref().unwrap_or(""),
        );
        writer
            .write_event(Event::End(BytesEnd::new("item")))
            .unwrap();
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .unwrap();
    writer.write_event(Event::End(BytesEnd::new("rss"))).unwrap();
    into_string(writer)
}

/// OPML 2.0 listing of active feeds, for the subscription-export endpoint.
pub fn render_opml(title: &str, feeds: &[Feed]) -> String {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(quick_xml::events::BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            None,
        )))
        .unwrap();

    let mut opml = BytesStart::new("opml");
    opml.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(opml)).unwrap();

    writer
        .write_event(Event::Start(BytesStart::new("head")))
        .unwrap();
    text_elem(&mut writer, "title", title);
    writer
        .write_event(Event::End(BytesEnd::new("head")))
        .unwrap();

    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .unwrap();
    for feed in feeds {
        let mut outline = BytesStart::new("outline");
        outline.push_attribute(("type", "rss"));
        outline.push_attribute(("text", feed.title.as_str()));
        outline.push_attribute(("title", feed.title.as_str()));
        outline.push_attribute(("xmlUrl", feed.url.as_str()));
        if let Some(site_url) = &feed.site_url {
            outline.push_attribute(("htmlUrl", site_url.as_str()));
        }
        writer.write_event(Event::Empty(outline)).unwrap();
    }
    writer
        .write_event(Event::End(BytesEnd::new("body")))
        .unwrap();
    writer.write_event(Event::End(BytesEnd::new("opml"))).unwrap();
    into_string(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry(title: &str) -> Entry {
        Entry {
            id: 1,
            feed_id: 1,
            guid: "guid-1".to_string(),
            url: Some("https://example.com/1".to_string()),
            title: title.to_string(),
            author: None,
            content: Some("<p>hi &amp; bye</p>".to_string()),
            summary: Some("hi".to_string()),
            published_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            first_seen: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn atom_escapes_untrusted_title() {
        let entry = sample_entry("<script>alert(1)</script>");
        let xml = render_atom(
            "Planet",
            "https://planet.example/",
            &[(entry, "Feed".to_string())],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        assert!(!xml.contains("<script>"));
        assert!(xml.contains("&lt;script&gt;"));
    }

    #[test]
    fn rss_contains_channel_and_item() {
        let entry = sample_entry("First post");
        let xml = render_rss(
            "Planet",
            "https://planet.example/",
            &[(entry, "Feed".to_string())],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        assert!(xml.contains("<channel>"));
        assert!(xml.contains("<item>"));
        assert!(xml.contains("First post"));
    }

    #[test]
    fn opml_carries_outline_attributes() {
        let feed = Feed {
            id: 1,
            url: "https://example.com/feed".to_string(),
            title: "Example".to_string(),
            site_url: Some("https://example.com".to_string()),
            author_name: None,
            author_email: None,
            etag: None,
            last_modified: None,
            fetch_error: None,
            fetch_error_count: 0,
            consecutive_failures: 0,
            last_fetch_at: None,
            last_success_at: None,
            last_entry_at: None,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let xml = render_opml("Planet", &[feed]);
        assert!(xml.contains(r#"type="rss""#));
        assert!(xml.contains(r#"xmlUrl="https://example.com/feed""#));
        assert!(xml.contains(r#"htmlUrl="https://example.com""#));
    }

    #[test]
    fn outputs_are_bit_stable_given_identical_inputs() {
        let entry = sample_entry("Stable");
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = render_atom("Planet", "https://planet.example/", &[(entry.clone(), "Feed".to_string())], ts);
        let b = render_atom("Planet", "https://planet.example/", &[(entry, "Feed".to_string())], ts);
        assert_eq!(a, b);
    }
}
