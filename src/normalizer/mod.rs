use chrono::Utc;
use feed_rs::parser;
use html_escape::decode_html_entities;
use scraper::Html;
use url::Url;

use crate::app::{ConfluenceError, Result};
use crate::domain::Article;

/// One source's parse output: the resolved site label plus article drafts.
#[derive(Debug)]
pub struct Normalized {
    pub source_name: String,
    pub drafts: Vec<Draft>,
}

/// An article before image resolution, carrying the feed-native media
/// candidates harvested for tier-1 lookup.
#[derive(Debug, Clone)]
pub struct Draft {
    pub article: Article,
    pub media: Vec<MediaCandidate>,
}

#[derive(Debug, Clone)]
pub struct MediaCandidate {
    pub url: String,
    pub media_type: Option<String>,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Enclosure,
    Content,
    Thumbnail,
}

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, source_url: &str, body: &[u8]) -> Result<Normalized> {
        // Some feeds ship control characters that are invalid XML; strip
        // them rather than failing the source.
        let sanitized = sanitize_xml(body);

        let feed = parser::parse(&sanitized[..])
            .map_err(|e| ConfluenceError::FeedParse(e.to_string()))?;

        let source_name = feed
            .title
            .map(|t| decode_html_entities(t.content.trim()).to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| domain_of(source_url));

        let drafts = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let link = select_entry_link(&entry)?;

                let title = entry
                    .title
                    .as_ref()
                    .map(|t| strip_markup(&t.content))
                    .unwrap_or_default();

                let published_at = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now);

                let raw_summary = entry
                    .summary
                    .as_ref()
                    .map(|s| decode_html_entities(&s.content).to_string())
                    .unwrap_or_default();

                let content_body = entry
                    .content
                    .as_ref()
                    .and_then(|c| c.body.as_deref())
                    .map(|b| decode_html_entities(b).to_string())
                    .filter(|b| !b.trim().is_empty());

                let body_html = match &content_body {
                    Some(body) => body.clone(),
                    None => raw_summary.clone(),
                };

                let summary_source = if raw_summary.trim().is_empty() {
                    content_body.as_deref().unwrap_or("")
                } else {
                    raw_summary.as_str()
                };
                let summary_text = strip_markup(summary_source);

                let media = collect_media(&entry);

                Some(Draft {
                    article: Article {
                        source_name: source_name.clone(),
                        title,
                        link,
                        published_at,
                        summary_text,
                        body_html,
                        image_url: String::new(),
                    },
                    media,
                })
            })
            .collect();

        Ok(Normalized {
            source_name,
            drafts,
        })
    }
}

/// Pick the entry's canonical link: an alternate link when one exists,
/// otherwise the first non-empty href (enclosure links never qualify).
fn select_entry_link(entry: &feed_rs::model::Entry) -> Option<String> {
    for link in &entry.links {
        let href = link.href.trim();
        if href.is_empty() {
            continue;
        }
        let rel = link.rel.as_deref().unwrap_or("");
        if rel.is_empty() || rel.eq_ignore_ascii_case("alternate") {
            return Some(href.to_string());
        }
    }
    entry
        .links
        .iter()
        .map(|l| l.href.trim())
        .find(|href| !href.is_empty())
        .map(String::from)
}

/// Harvest feed-native image candidates in precedence order: enclosure
/// links, media:content, media:thumbnail.
fn collect_media(entry: &feed_rs::model::Entry) -> Vec<MediaCandidate> {
    let mut candidates = Vec::new();

    for link in &entry.links {
        let href = link.href.trim();
        if href.is_empty() {
            continue;
        }
        let rel = link.rel.as_deref().unwrap_or("");
        let media_type = link.media_type.clone();
        let is_image_type = media_type
            .as_deref()
            .map(|t| t.contains("image"))
            .unwrap_or(false);
        if rel.eq_ignore_ascii_case("enclosure") || is_image_type {
            candidates.push(MediaCandidate {
                url: href.to_string(),
                media_type,
                kind: MediaKind::Enclosure,
            });
        }
    }

    for media in &entry.media {
        for content in &media.content {
            let Some(url) = content.url.as_ref().map(|u| u.to_string()) else {
                continue;
            };
            if url.trim().is_empty() {
                continue;
            }
            candidates.push(MediaCandidate {
                url,
                media_type: content.content_type.as_ref().map(|m| m.to_string()),
                kind: MediaKind::Content,
            });
        }
        for thumbnail in &media.thumbnails {
            let uri = thumbnail.image.uri.trim();
            if uri.is_empty() {
                continue;
            }
            candidates.push(MediaCandidate {
                url: uri.to_string(),
                media_type: None,
                kind: MediaKind::Thumbnail,
            });
        }
    }

    candidates
}

/// Entity-unescape, strip all markup and collapse whitespace to single
/// spaces. Used for titles and plain-text summaries.
pub fn strip_markup(input: &str) -> String {
    let decoded = decode_html_entities(input);
    if !decoded.contains('<') {
        return collapse_whitespace(&decoded);
    }
    let fragment = Html::parse_fragment(&decoded);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| url.to_string())
}

fn sanitize_xml(body: &[u8]) -> Vec<u8> {
    body.iter()
        .copied()
        .filter(|&b| b >= 0x20 || b == b'\t' || b == b'\n' || b == b'\r')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Test &amp; Feed</title>
    <item>
      <title>Item &lt;b&gt;One&lt;/b&gt;</title>
      <link>https://example.com/item1</link>
      <guid>item-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <description>&lt;p&gt;Summary   with    markup&lt;/p&gt;</description>
      <content:encoded>&lt;p&gt;Rich &lt;img src="https://img.example.com/1.jpg"&gt; body&lt;/p&gt;</content:encoded>
      <media:thumbnail url="https://img.example.com/thumb1.jpg"/>
    </item>
    <item>
      <title>Item Two</title>
      <link>https://example.com/item2</link>
      <guid>item-2</guid>
      <description>Plain summary</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <summary>This is Atom entry 1</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let normalizer = Normalizer::new();
        let normalized = normalizer
            .normalize("https://example.com/feed.xml", RSS_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(normalized.source_name, "Test & Feed");
        assert_eq!(normalized.drafts.len(), 2);

        let first = &normalized.drafts[0].article;
        assert_eq!(first.title, "Item One");
        assert_eq!(first.link, "https://example.com/item1");
        assert_eq!(first.summary_text, "Summary with markup");
        assert!(first.body_html.contains("<img"));
    }

    #[test]
    fn test_parse_atom() {
        let normalizer = Normalizer::new();
        let normalized = normalizer
            .normalize("https://example.com/feed.atom", ATOM_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(normalized.source_name, "Atom Test Feed");
        assert_eq!(normalized.drafts.len(), 1);
        assert_eq!(normalized.drafts[0].article.link, "https://example.com/atom1");
        // No richer content field: body degrades to the summary
        assert_eq!(normalized.drafts[0].article.body_html, "This is Atom entry 1");
    }

    #[test]
    fn test_published_falls_back_to_updated_then_now() {
        let normalizer = Normalizer::new();
        let normalized = normalizer
            .normalize("https://example.com/feed.atom", ATOM_SAMPLE.as_bytes())
            .unwrap();
        // Atom sample has only <updated>
        assert_eq!(
            normalized.drafts[0].article.published_at.to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );

        let before = Utc::now();
        let normalized = normalizer
            .normalize("https://example.com/feed.xml", RSS_SAMPLE.as_bytes())
            .unwrap();
        // Second RSS item has no date at all: falls back to "now"
        assert!(normalized.drafts[1].article.published_at >= before);
    }

    #[test]
    fn test_media_candidates_harvested() {
        let normalizer = Normalizer::new();
        let normalized = normalizer
            .normalize("https://example.com/feed.xml", RSS_SAMPLE.as_bytes())
            .unwrap();

        let media = &normalized.drafts[0].media;
        assert!(media
            .iter()
            .any(|c| c.kind == MediaKind::Thumbnail
                && c.url == "https://img.example.com/thumb1.jpg"));
    }

    #[test]
    fn test_source_name_falls_back_to_domain() {
        let normalizer = Normalizer::new();
        let body = r#"<?xml version="1.0"?><rss version="2.0"><channel>
            <item><title>T</title><link>https://example.com/x</link></item>
        </channel></rss>"#;
        let normalized = normalizer
            .normalize("https://news.example.org/feed", body.as_bytes())
            .unwrap();
        assert_eq!(normalized.source_name, "news.example.org");
    }

    #[test]
    fn test_entries_without_link_are_skipped() {
        let normalizer = Normalizer::new();
        let body = r#"<?xml version="1.0"?><rss version="2.0"><channel>
            <title>F</title>
            <item><title>No link</title></item>
            <item><title>Has link</title><link>https://example.com/y</link></item>
        </channel></rss>"#;
        let normalized = normalizer.normalize("https://example.com/feed", body.as_bytes()).unwrap();
        assert_eq!(normalized.drafts.len(), 1);
        assert_eq!(normalized.drafts[0].article.link, "https://example.com/y");
    }

    #[test]
    fn test_malformed_feed_is_an_error() {
        let normalizer = Normalizer::new();
        let result = normalizer.normalize("https://example.com/feed", b"this is not xml at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_control_characters_are_tolerated() {
        let normalizer = Normalizer::new();
        let body = RSS_SAMPLE.replace("Item Two", "Item\u{0} Two");
        let normalized = normalizer
            .normalize("https://example.com/feed.xml", body.as_bytes())
            .unwrap();
        assert_eq!(normalized.drafts.len(), 2);
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<p>Hello   <b>world</b></p>"), "Hello world");
        assert_eq!(strip_markup("no markup  here"), "no markup here");
        assert_eq!(strip_markup("a &amp; b"), "a & b");
    }
}
