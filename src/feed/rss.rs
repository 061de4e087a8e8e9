//! iTunes-flavoured RSS 2.0 serialization of an assembled [`FeedDocument`].
//!
//! Output is deterministic: the same document and settings always produce
//! the same bytes, so regenerating an unchanged podcast leaves its feed file
//! byte-identical.

use std::io::Cursor;

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::assemble::FeedDocument;
use crate::storage::{Episode, Season};
use crate::util::join_url;

pub const EXPLICIT: &str = "NO";
pub const EPISODE_TYPE: &str = "full";
pub const ENCLOSURE_MIME: &str = "audio/mpeg";
pub const CATEGORY: &str = "Religion & Spirituality";
pub const SUBCATEGORY: &str = "Christianity";

/// RFC 1123 with a numeric zone, e.g. `Mon, 01 May 2023 10:00:00 +0000`.
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const NAMESPACES: [(&str, &str); 5] = [
    ("xmlns:atom", "http://www.w3.org/2005/Atom"),
    ("xmlns:content", "http://purl.org/rss/1.0/modules/content/"),
    ("xmlns:itunes", "http://www.itunes.com/dtds/podcast-1.0.dtd"),
    (
        "xmlns:googleplay",
        "http://www.google.com/schemas/play-podcasts/1.0",
    ),
    ("xmlns:media", "http://www.rssboard.org/media-rss"),
];

/// Values the serializer needs beyond the catalog itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    /// Base URL that stored relative locations are joined onto.
    pub static_content_url: String,
    pub explicit: String,
    pub episode_type: String,
    pub enclosure_mime: String,
    pub category: String,
    pub subcategory: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            static_content_url: "http://127.0.0.1:8000".to_string(),
            explicit: EXPLICIT.to_string(),
            episode_type: EPISODE_TYPE.to_string(),
            enclosure_mime: ENCLOSURE_MIME.to_string(),
            category: CATEGORY.to_string(),
            subcategory: SUBCATEGORY.to_string(),
        }
    }
}

impl FeedSettings {
    pub fn with_static_content_url(static_content_url: impl Into<String>) -> Self {
        Self {
            static_content_url: static_content_url.into(),
            ..Self::default()
        }
    }

    fn url_for(&self, location: &str) -> Option<String> {
        join_url(&self.static_content_url, location)
    }
}

/// Thin wrapper that keeps the element plumbing out of the layout code.
struct RssWriter {
    inner: Writer<Cursor<Vec<u8>>>,
}

impl RssWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn start(&mut self, element: BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        self.inner
            .write_event(Event::Start(element))
            .with_context(|| format!("Failed to write <{name}>"))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.inner
            .write_event(Event::End(BytesEnd::new(name)))
            .with_context(|| format!("Failed to write </{name}>"))
    }

    fn empty(&mut self, element: BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        self.inner
            .write_event(Event::Empty(element))
            .with_context(|| format!("Failed to write <{name}/>"))
    }

    /// `<name>text</name>`, text escaped.
    fn text(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(BytesStart::new(name))?;
        self.inner
            .write_event(Event::Text(BytesText::new(text)))
            .with_context(|| format!("Failed to write {name} text"))?;
        self.end(name)
    }

    /// Like [`text`](Self::text) but skipped entirely for an empty value.
    fn text_if_set(&mut self, name: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.text(name, text)
    }

    fn finish(self) -> Vec<u8> {
        self.inner.into_inner().into_inner()
    }
}

/// Renders the document as a complete XML feed.
pub fn render(doc: &FeedDocument, settings: &FeedSettings) -> Result<Vec<u8>> {
    let mut w = RssWriter::new();

    w.inner
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    for (key, value) in NAMESPACES {
        rss.push_attribute((key, value));
    }
    rss.push_attribute(("version", "2.0"));
    w.start(rss)?;
    w.start(BytesStart::new("channel"))?;

    write_channel_header(&mut w, doc, settings)?;
    for (season, episode) in doc.items() {
        write_item(&mut w, season, episode, settings)?;
    }

    w.end("channel")?;
    w.end("rss")?;
    Ok(w.finish())
}

fn write_channel_header(w: &mut RssWriter, doc: &FeedDocument, settings: &FeedSettings) -> Result<()> {
    let podcast = &doc.podcast;
    let owner = &doc.owner;

    w.text("title", &podcast.title)?;
    w.text("link", &podcast.link)?;
    w.text("language", &podcast.language)?;

    let mut self_link = BytesStart::new("atom:link");
    self_link.push_attribute(("href", podcast.feed_link.as_str()));
    self_link.push_attribute(("rel", "self"));
    self_link.push_attribute(("type", "application/rss+xml"));
    w.empty(self_link)?;

    w.text("copyright", &owner.copyright)?;
    w.text_if_set("itunes:subtitle", &podcast.subtitle)?;
    w.text("itunes:author", &owner.name)?;
    w.text("itunes:summary", &podcast.description)?;
    w.text("itunes:keywords", &podcast.keywords.join(","))?;
    w.text("description", &podcast.description)?;

    w.start(BytesStart::new("itunes:owner"))?;
    w.text("itunes:name", &owner.name)?;
    w.text("itunes:email", &owner.email)?;
    w.end("itunes:owner")?;

    if let Some(image_url) = settings.url_for(&podcast.image_location) {
        w.start(BytesStart::new("image"))?;
        w.text("url", &image_url)?;
        w.text("title", &podcast.title)?;
        w.text("link", &podcast.link)?;
        w.end("image")?;

        let mut itunes_image = BytesStart::new("itunes:image");
        itunes_image.push_attribute(("href", image_url.as_str()));
        w.empty(itunes_image)?;
    }

    let mut category = BytesStart::new("itunes:category");
    category.push_attribute(("text", settings.category.as_str()));
    w.start(category)?;
    let mut subcategory = BytesStart::new("itunes:category");
    subcategory.push_attribute(("text", settings.subcategory.as_str()));
    w.empty(subcategory)?;
    w.end("itunes:category")
}

/// `"Title - Subtitle"` when a subtitle is present, otherwise the bare title.
pub fn display_title(episode: &Episode) -> String {
    if episode.subtitle.is_empty() {
        episode.title.clone()
    } else {
        format!("{} - {}", episode.title, episode.subtitle)
    }
}

fn write_item(
    w: &mut RssWriter,
    season: &Season,
    episode: &Episode,
    settings: &FeedSettings,
) -> Result<()> {
    w.start(BytesStart::new("item"))?;

    w.text("title", &display_title(episode))?;
    w.text("itunes:title", &episode.title)?;
    w.text_if_set("itunes:author", &episode.author)?;
    w.text_if_set("itunes:subtitle", &episode.subtitle)?;
    w.text_if_set("itunes:summary", &episode.description)?;
    w.text_if_set("link", &episode.video_url)?;

    if let Some(image_url) = settings.url_for(&episode.image_location) {
        let mut image = BytesStart::new("itunes:image");
        image.push_attribute(("href", image_url.as_str()));
        w.empty(image)?;
    }

    let audio_url = settings.url_for(&episode.audio_location);
    let duration = episode.audio_duration.to_string();
    if let Some(ref audio_url) = audio_url {
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", audio_url.as_str()));
        // Byte length is not tracked; the duration stands in for it
        enclosure.push_attribute(("length", duration.as_str()));
        enclosure.push_attribute(("type", settings.enclosure_mime.as_str()));
        w.empty(enclosure)?;
    }

    w.text("itunes:duration", &duration)?;
    w.text("itunes:season", &season.num.to_string())?;
    w.text("itunes:episode", &episode.num.to_string())?;
    w.text("itunes:episodeType", &settings.episode_type)?;

    if let Some(ref audio_url) = audio_url {
        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        w.start(guid)?;
        w.inner
            .write_event(Event::Text(BytesText::new(audio_url)))
            .context("Failed to write guid text")?;
        w.end("guid")?;
    }

    w.text(
        "pubDate",
        &episode.published_at.format(PUB_DATE_FORMAT).to_string(),
    )?;
    w.text("itunes:explicit", &settings.explicit)?;

    w.end("item")
}
