use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::FeedError;

// Upstream documents are loosely typed. Only `podcast`, `episodes` and the
// enrichment join keys are read strictly; a mistyped value anywhere else
// reads as absent instead of failing the whole document.

/// Root of the primary podcast document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PodcastDocument {
    #[serde(deserialize_with = "lenient")]
    pub episode_frequency: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub estimated_next_episode_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub has_seasons: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub season_count: Option<NumberOrText>,
    #[serde(deserialize_with = "lenient")]
    pub episode_count: Option<NumberOrText>,
    #[serde(deserialize_with = "lenient")]
    pub has_more_episodes: Option<bool>,
    pub podcast: Option<Podcast>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Podcast {
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub author: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub description_html: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub show_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub guid: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub image: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Episode {
    #[serde(deserialize_with = "lenient")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub file_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub file_size: Option<NumberOrText>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub published: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub episode_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub season: Option<NumberOrText>,
    #[serde(deserialize_with = "lenient")]
    pub number: Option<NumberOrText>,
    #[serde(deserialize_with = "lenient")]
    pub image: Option<String>,
}

/// Entry of the secondary "latest episodes" document.
///
/// Only `uuid` and `image` take part in the join.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LatestEpisode {
    pub uuid: Option<String>,
    pub image: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub published: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub show_notes: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub hash: Option<String>,
    pub modified: Option<serde_json::Value>,
    pub transcripts: Option<serde_json::Value>,
}

/// A numeric field that upstream may send either as a number or as a string.
///
/// Serializes back in the form it was read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

impl From<u64> for NumberOrText {
    fn from(value: u64) -> Self {
        NumberOrText::Number(value.into())
    }
}

impl fmt::Display for NumberOrText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberOrText::Number(number) => write!(f, "{number}"),
            NumberOrText::Text(text) => f.write_str(text),
        }
    }
}

/// Latest episodes keyed by episode uuid.
pub type EnrichmentMap = HashMap<String, LatestEpisode>;

/// Root-level scalars surfaced through the `X-Podcast-Metadata` header.
///
/// Field order is part of the header contract.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PodcastMetadata {
    pub episode_frequency: Option<String>,
    pub estimated_next_episode_at: Option<String>,
    pub has_seasons: Option<bool>,
    pub season_count: Option<NumberOrText>,
    pub episode_count: Option<NumberOrText>,
    pub has_more_episodes: Option<bool>,
}

impl PodcastDocument {
    /// Validates that the root carries a `podcast` object before deserializing.
    pub fn from_json(value: serde_json::Value) -> Result<Self, FeedError> {
        if !value.get("podcast").is_some_and(serde_json::Value::is_object) {
            return Err(FeedError::InvalidStructure);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn metadata(&self) -> PodcastMetadata {
        PodcastMetadata {
            episode_frequency: self.episode_frequency.clone(),
            estimated_next_episode_at: self.estimated_next_episode_at.clone(),
            has_seasons: self.has_seasons,
            season_count: self.season_count.clone(),
            episode_count: self.episode_count.clone(),
            has_more_episodes: self.has_more_episodes,
        }
    }
}

impl PodcastMetadata {
    /// Compact JSON with non-ASCII characters written as `\uXXXX` escapes,
    /// so the result is always a valid header value.
    pub fn to_header_value(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(escape_non_ascii(&json))
    }
}

fn escape_non_ascii(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() && !ch.is_ascii_control() {
            escaped.push(ch);
            continue;
        }
        let mut units = [0_u16; 2];
        for unit in ch.encode_utf16(&mut units) {
            escaped.push_str(&format!("\\u{unit:04x}"));
        }
    }
    escaped
}

/// Reads any JSON value and keeps it only if it has the expected type.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
