//! RSS 2.0 document tree and its XML writer.
//!
//! The mapper fills a [`Channel`] with plain values; this module owns element
//! order, namespace declarations and escaping (through `quick-xml`).

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::FeedError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub title: String,
    pub description: String,
    pub site_url: Option<String>,
    pub feed_url: Option<String>,
    pub language: Option<String>,
    pub pub_date: Option<String>,
    pub last_build_date: Option<String>,
    pub ttl: Option<u32>,
    pub generator: Option<String>,
    pub image: Option<Image>,
    /// `(prefix, uri)` pairs declared on the `<rss>` element.
    pub namespaces: Vec<(String, String)>,
    pub custom_elements: Vec<CustomElement>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub url: String,
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub pub_date: Option<String>,
    pub enclosure: Option<Enclosure>,
    pub author: Option<String>,
    pub custom_elements: Vec<CustomElement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enclosure {
    pub url: String,
    pub length: String,
    pub mime_type: Option<String>,
}

/// Namespaced element such as `itunes:author`, written after the standard ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
}

impl CustomElement {
    pub fn text(name: &str, text: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            text: Some(text.into()),
        }
    }

    pub fn empty(name: &str, attributes: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            text: None,
        }
    }
}

type XmlWriter = Writer<Vec<u8>>;

/// Serializes the channel as an indented RSS 2.0 document.
pub fn write_channel(channel: &Channel) -> Result<String, FeedError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut rss = BytesStart::new("rss");
    for (prefix, uri) in &channel.namespaces {
        rss.push_attribute((format!("xmlns:{prefix}").as_str(), uri.as_str()));
    }
    rss.push_attribute(("version", "2.0"));
    emit(&mut writer, Event::Start(rss))?;
    emit(&mut writer, Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "description", &channel.description)?;
    if let Some(link) = &channel.site_url {
        write_text_element(&mut writer, "link", link)?;
    }
    if let Some(image) = &channel.image {
        emit(&mut writer, Event::Start(BytesStart::new("image")))?;
        write_text_element(&mut writer, "url", &image.url)?;
        write_text_element(&mut writer, "title", &image.title)?;
        write_text_element(&mut writer, "link", &image.link)?;
        emit(&mut writer, Event::End(BytesEnd::new("image")))?;
    }
    if let Some(generator) = &channel.generator {
        write_text_element(&mut writer, "generator", generator)?;
    }
    if let Some(last_build_date) = &channel.last_build_date {
        write_text_element(&mut writer, "lastBuildDate", last_build_date)?;
    }
    if let Some(feed_url) = &channel.feed_url {
        let mut atom_link = BytesStart::new("atom:link");
        atom_link.push_attribute(("href", feed_url.as_str()));
        atom_link.push_attribute(("rel", "self"));
        atom_link.push_attribute(("type", "application/rss+xml"));
        emit(&mut writer, Event::Empty(atom_link))?;
    }
    if let Some(pub_date) = &channel.pub_date {
        write_text_element(&mut writer, "pubDate", pub_date)?;
    }
    if let Some(language) = &channel.language {
        write_text_element(&mut writer, "language", language)?;
    }
    if let Some(ttl) = channel.ttl {
        write_text_element(&mut writer, "ttl", &ttl.to_string())?;
    }
    for element in &channel.custom_elements {
        write_custom_element(&mut writer, element)?;
    }
    for item in &channel.items {
        write_item(&mut writer, item)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("channel")))?;
    emit(&mut writer, Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner()).map_err(|error| FeedError::Xml(error.to_string()))
}

fn write_item(writer: &mut XmlWriter, item: &Item) -> Result<(), FeedError> {
    emit(writer, Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "description", &item.description)?;
    if let Some(link) = &item.link {
        write_text_element(writer, "link", link)?;
    }
    if let Some(guid) = &item.guid {
        let mut start = BytesStart::new("guid");
        start.push_attribute(("isPermaLink", "false"));
        emit(writer, Event::Start(start))?;
        emit(writer, Event::Text(BytesText::new(guid)))?;
        emit(writer, Event::End(BytesEnd::new("guid")))?;
    }
    if let Some(author) = &item.author {
        write_text_element(writer, "dc:creator", author)?;
    }
    if let Some(pub_date) = &item.pub_date {
        write_text_element(writer, "pubDate", pub_date)?;
    }
    if let Some(enclosure) = &item.enclosure {
        let mut start = BytesStart::new("enclosure");
        start.push_attribute(("url", enclosure.url.as_str()));
        start.push_attribute(("length", enclosure.length.as_str()));
        if let Some(mime_type) = &enclosure.mime_type {
            start.push_attribute(("type", mime_type.as_str()));
        }
        emit(writer, Event::Empty(start))?;
    }
    for element in &item.custom_elements {
        write_custom_element(writer, element)?;
    }
    emit(writer, Event::End(BytesEnd::new("item")))
}

fn write_custom_element(writer: &mut XmlWriter, element: &CustomElement) -> Result<(), FeedError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    match &element.text {
        Some(text) => {
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Text(BytesText::new(text)))?;
            emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
        }
        None => emit(writer, Event::Empty(start)),
    }
}

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), FeedError> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    // An empty text event keeps the closing tag on the same line.
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), FeedError> {
    writer
        .write_event(event)
        .map_err(|error| FeedError::Xml(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_channel() -> Channel {
        Channel {
            title: "Rust & Friends".to_string(),
            description: "Talk <about> Rust".to_string(),
            site_url: Some("https://example.com/show".to_string()),
            feed_url: Some("https://example.com/show".to_string()),
            language: Some("en-us".to_string()),
            ttl: Some(60),
            namespaces: vec![
                ("itunes".to_string(), "http://www.itunes.com/dtds/podcast-1.0.dtd".to_string()),
                ("atom".to_string(), "http://www.w3.org/2005/Atom".to_string()),
                ("dc".to_string(), "http://purl.org/dc/elements/1.1/".to_string()),
            ],
            custom_elements: vec![
                CustomElement::text("itunes:author", "Ferris"),
                CustomElement::empty("itunes:image", &[("href", "https://example.com/cover.jpg")]),
            ],
            items: vec![Item {
                title: "Episode 1".to_string(),
                guid: Some("e1".to_string()),
                enclosure: Some(Enclosure {
                    url: "https://example.com/e1.mp3".to_string(),
                    length: "42".to_string(),
                    mime_type: Some("audio/mpeg".to_string()),
                }),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn writes_escaped_pretty_document() {
        let xml = write_channel(&sample_channel()).expect("channel must serialize");

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("\n  <channel>"));
        assert!(xml.contains("<title>Rust &amp; Friends</title>"));
        assert!(xml.contains("<description>Talk &lt;about&gt; Rust</description>"));
        assert!(xml.contains("<itunes:image href=\"https://example.com/cover.jpg\"/>"));

        let doc = roxmltree::Document::parse(&xml).expect("output must be well-formed");
        let root = doc.root_element();
        assert_eq!(root.attribute("version"), Some("2.0"));
        let title = doc
            .descendants()
            .find(|node| node.has_tag_name("title"))
            .and_then(|node| node.text());
        assert_eq!(title, Some("Rust & Friends"));
    }

    #[test]
    fn writes_item_enclosure_and_guid() {
        let xml = write_channel(&sample_channel()).expect("channel must serialize");
        let doc = roxmltree::Document::parse(&xml).expect("output must be well-formed");

        let item = doc
            .descendants()
            .find(|node| node.has_tag_name("item"))
            .expect("item must exist");
        let enclosure = item
            .children()
            .find(|node| node.has_tag_name("enclosure"))
            .expect("enclosure must exist");
        assert_eq!(enclosure.attribute("url"), Some("https://example.com/e1.mp3"));
        assert_eq!(enclosure.attribute("length"), Some("42"));
        assert_eq!(enclosure.attribute("type"), Some("audio/mpeg"));

        let guid = item
            .children()
            .find(|node| node.has_tag_name("guid"))
            .expect("guid must exist");
        assert_eq!(guid.attribute("isPermaLink"), Some("false"));
        assert_eq!(guid.text(), Some("e1"));
        assert!(xml.contains("<description></description>"));
    }

    #[test]
    fn output_is_readable_as_rss() {
        let xml = write_channel(&sample_channel()).expect("channel must serialize");
        let feed = feed_rs::parser::parse(xml.as_bytes()).expect("feed-rs must accept output");

        assert_eq!(feed.entries.len(), 1);
        assert_eq!(
            feed.title.map(|text| text.content),
            Some("Rust & Friends".to_string())
        );
    }
}
