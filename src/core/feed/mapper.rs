use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::rss::{write_channel, Channel, CustomElement, Enclosure, Image, Item};
use super::types::{EnrichmentMap, Episode, Podcast, PodcastDocument};
use super::FeedError;

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

const FEED_LANGUAGE: &str = "en-us";
const FEED_TTL_MINUTES: u32 = 60;
const GENERATOR: &str = concat!("podcast-rss-bridge ", env!("CARGO_PKG_VERSION"));

/// Builds the RSS feed for a podcast document, stamped with the current time.
pub fn build_feed(
    document: &PodcastDocument,
    enrichment: Option<&EnrichmentMap>,
) -> Result<String, FeedError> {
    let channel = build_channel(document, enrichment, Utc::now())?;
    write_channel(&channel)
}

pub fn build_channel(
    document: &PodcastDocument,
    enrichment: Option<&EnrichmentMap>,
    now: DateTime<Utc>,
) -> Result<Channel, FeedError> {
    let podcast = document.podcast.as_ref().ok_or(FeedError::InvalidStructure)?;

    let title = podcast.title.clone().unwrap_or_default();
    let description = podcast.description.clone().unwrap_or_default();
    let site_url = podcast.url.clone().unwrap_or_default();
    let podcast_image = non_empty(podcast.image.as_deref());
    let build_time = format_rfc822(now);

    // Absent values render as empty strings; the element set never changes.
    let custom_elements = vec![
        CustomElement::text("itunes:author", podcast.author.clone().unwrap_or_default()),
        CustomElement::text("itunes:summary", description.clone()),
        CustomElement::text("itunes:type", podcast.show_type.clone().unwrap_or_default()),
        CustomElement::text("itunes:explicit", "false"),
        CustomElement::text(
            "content:encoded",
            podcast.description_html.clone().unwrap_or_default(),
        ),
        CustomElement::empty(
            "itunes:category",
            &[("text", podcast.category.as_deref().unwrap_or_default())],
        ),
        CustomElement::empty("itunes:image", &[("href", podcast_image.unwrap_or_default())]),
    ];

    let episodes = select_episodes(&podcast.episodes);
    tracing::debug!(
        "Selected {} of {} episodes for feed {}",
        episodes.len(),
        podcast.episodes.len(),
        site_url
    );
    let items = episodes
        .iter()
        .map(|episode| build_item(episode, podcast, enrichment))
        .collect();

    Ok(Channel {
        image: podcast_image.map(|url| Image {
            url: url.to_string(),
            title: title.clone(),
            link: site_url.clone(),
        }),
        title,
        description,
        feed_url: Some(site_url.clone()),
        site_url: Some(site_url),
        language: Some(FEED_LANGUAGE.to_string()),
        pub_date: Some(build_time.clone()),
        last_build_date: Some(build_time),
        ttl: Some(FEED_TTL_MINUTES),
        generator: Some(GENERATOR.to_string()),
        namespaces: [
            ("itunes", ITUNES_NS),
            ("content", CONTENT_NS),
            ("media", MEDIA_NS),
            ("dc", DC_NS),
            ("atom", ATOM_NS),
        ]
        .iter()
        .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
        .collect(),
        custom_elements,
        items,
    })
}

/// Episodes at indices `[len - 10, len - 8)`, both bounds saturating at zero.
///
/// Catalogs of ten or more episodes yield two items, nine yield the first
/// episode only, and anything shorter yields nothing.
pub fn select_episodes(episodes: &[Episode]) -> &[Episode] {
    let len = episodes.len();
    &episodes[len.saturating_sub(10)..len.saturating_sub(8)]
}

/// Enrichment image, then podcast image, then the empty string.
pub fn resolve_episode_image<'a>(
    episode: &Episode,
    podcast: &'a Podcast,
    enrichment: Option<&'a EnrichmentMap>,
) -> &'a str {
    let enriched = enrichment
        .zip(episode.uuid.as_deref())
        .and_then(|(map, uuid)| map.get(uuid))
        .and_then(|latest| non_empty(latest.image.as_deref()));
    enriched
        .or_else(|| non_empty(podcast.image.as_deref()))
        .unwrap_or_default()
}

fn build_item(episode: &Episode, podcast: &Podcast, enrichment: Option<&EnrichmentMap>) -> Item {
    let image = resolve_episode_image(episode, podcast, enrichment);

    let duration = episode
        .duration
        .filter(|value| value.is_finite())
        .map(|value| (value.trunc() as i64).to_string())
        .unwrap_or_default();
    let mut custom_elements = vec![
        CustomElement::text("itunes:duration", duration),
        CustomElement::text(
            "itunes:episodeType",
            episode.episode_type.clone().unwrap_or_default(),
        ),
    ];
    // Season and episode numbers are optional iTunes tags, written only when known.
    if let Some(season) = &episode.season {
        custom_elements.push(CustomElement::text("itunes:season", season.to_string()));
    }
    if let Some(number) = &episode.number {
        custom_elements.push(CustomElement::text("itunes:episode", number.to_string()));
    }
    custom_elements.push(CustomElement::empty("itunes:image", &[("href", image)]));
    custom_elements.push(CustomElement::empty(
        "media:content",
        &[("url", image), ("medium", "image"), ("type", "image/jpeg")],
    ));

    let pub_date = episode.published.as_deref().and_then(|published| {
        let parsed = parse_published(published);
        if parsed.is_none() {
            tracing::warn!(
                "Dropping unparseable pubDate {:?} for episode {:?}",
                published,
                episode.uuid
            );
        }
        parsed.map(format_rfc822)
    });

    let url = episode.url.clone().unwrap_or_default();
    Item {
        title: episode.title.clone().unwrap_or_default(),
        description: String::new(),
        link: Some(url.clone()),
        guid: Some(episode.uuid.clone().unwrap_or_default()),
        pub_date,
        // RSS requires a numeric length, so an unknown size is written as 0.
        enclosure: Some(Enclosure {
            url,
            length: episode
                .file_size
                .as_ref()
                .map_or_else(|| "0".to_string(), ToString::to_string),
            mime_type: Some(episode.file_type.clone().unwrap_or_default()),
        }),
        author: podcast.author.clone(),
        custom_elements,
    }
}

fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn format_rfc822(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
