use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::app::Result;
use crate::config::OutputConfig;
use crate::domain::Article;

const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";

/// Render the merged list as an RSS 2.0 document with dc: and content:
/// extensions, an RFC-2822 `pubDate` plus ISO-8601 `dc:date` per item,
/// and an image `enclosure` where one resolved.
pub fn render(articles: &[Article], config: &OutputConfig) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:dc", DC_NS));
    rss.push_attribute(("xmlns:content", CONTENT_NS));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text(&mut writer, "title", &config.channel_title)?;
    write_text(&mut writer, "link", &config.channel_link)?;
    write_text(&mut writer, "description", &config.channel_description)?;
    write_text(&mut writer, "lastBuildDate", &rfc2822(Utc::now()))?;

    for article in articles {
        writer.write_event(Event::Start(BytesStart::new("item")))?;

        let composed = format!(
            "{}{}{}",
            article.source_name, config.title_separator, article.title
        );
        write_text(&mut writer, "title", &composed)?;
        write_text(&mut writer, "link", &article.link)?;
        write_text(&mut writer, "description", &article.summary_text)?;
        write_text(&mut writer, "source", &article.source_name)?;
        write_text(&mut writer, "dc:date", &article.published_at.to_rfc3339())?;
        write_text(&mut writer, "pubDate", &rfc2822(article.published_at))?;
        write_text(&mut writer, "content:encoded", article.display_body())?;

        if article.has_image() {
            let mut enclosure = BytesStart::new("enclosure");
            enclosure.push_attribute(("url", article.image_url.as_str()));
            // Type is a hint; readers accept image/* generically
            enclosure.push_attribute(("type", "image/jpeg"));
            writer.write_event(Event::Empty(enclosure))?;
        }

        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    Ok(writer.into_inner())
}

fn write_text<W: std::io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(&sanitize(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Drop control characters that are invalid in XML 1.0.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            let code = c as u32;
            code == 0x09 || code == 0x0A || code == 0x0D || code >= 0x20
        })
        .collect()
}

fn rfc2822(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
