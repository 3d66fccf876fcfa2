use super::types::{EnrichmentMap, LatestEpisode};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned unexpected status code: {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("response from {url} is not valid JSON: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub async fn fetch_json(client: &reqwest::Client, url: &str) -> Result<serde_json::Value, FetchError> {
    tracing::debug!("Fetching JSON from: {}", url);
    let request_error = |source| FetchError::Request {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(request_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(request_error)?;
    serde_json::from_slice(&body).map_err(|source| FetchError::Json {
        url: url.to_string(),
        source,
    })
}

/// Fetches the latest-episodes document, returning `None` on any failure.
pub async fn fetch_enrichment(client: &reqwest::Client, url: &str) -> Option<EnrichmentMap> {
    let value = match fetch_json(client, url).await {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!("Skipping episode enrichment: {}", error);
            return None;
        }
    };

    let map = build_enrichment_map(&value);
    if map.is_none() {
        tracing::warn!(
            "Skipping episode enrichment: {} has no podcast.episodes list",
            url
        );
    }
    map
}

/// Indexes `podcast.episodes[]` by uuid; later duplicates replace earlier ones.
pub fn build_enrichment_map(value: &serde_json::Value) -> Option<EnrichmentMap> {
    let episodes = value.pointer("/podcast/episodes")?.as_array()?;

    let mut map = EnrichmentMap::with_capacity(episodes.len());
    for raw in episodes {
        let episode = match serde_json::from_value::<LatestEpisode>(raw.clone()) {
            Ok(episode) => episode,
            Err(error) => {
                tracing::debug!("Ignoring malformed latest episode entry: {}", error);
                continue;
            }
        };
        let Some(uuid) = episode.uuid.clone().filter(|uuid| !uuid.is_empty()) else {
            continue;
        };
        map.insert(uuid, episode);
    }

    Some(map)
}
