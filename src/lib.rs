mod core;
mod server;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::core::feed::fetcher::{fetch_enrichment, fetch_json};
use crate::core::feed::mapper::build_feed;
use crate::core::feed::types::PodcastDocument;

pub use crate::core::config::{AppConfig, ConfigError};
pub use crate::core::feed::fetcher::FetchError;
pub use crate::core::feed::FeedError;
pub use server::{shutdown_signal, Server, ServerError, ServerHandle};

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const METADATA_HEADER: HeaderName = HeaderName::from_static("x-podcast-metadata");

#[derive(Clone)]
struct SharedState {
    client: reqwest::Client,
}

#[derive(Debug, Clone, Deserialize)]
struct ConvertRequest {
    url: Option<String>,
    #[serde(rename = "latestPodcastsUrl")]
    latest_podcasts_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Not Found")]
    NotFound,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Fetch(_) | ApiError::Feed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Conversion failed: {}", self);
        }
        (status, [(CONTENT_TYPE, TEXT_CONTENT_TYPE)], self.to_string()).into_response()
    }
}

/// `GET /convert` is the only route; every other path or method is a 404.
pub fn create_router(client: reqwest::Client) -> Router {
    Router::new()
        .route("/convert", get(convert).fallback(not_found))
        .fallback(not_found)
        .with_state(SharedState { client })
}

async fn convert(
    State(state): State<SharedState>,
    Query(request): Query<ConvertRequest>,
) -> Result<Response, ApiError> {
    let url = non_blank(request.url).ok_or_else(|| {
        ApiError::BadRequest("Missing required query parameter: url".to_string())
    })?;
    tracing::info!("Converting podcast document from {}", url);

    let value = fetch_json(&state.client, &url).await?;
    let document = PodcastDocument::from_json(value)?;

    let enrichment = match non_blank(request.latest_podcasts_url) {
        Some(latest_url) => fetch_enrichment(&state.client, &latest_url).await,
        None => None,
    };

    let xml = build_feed(&document, enrichment.as_ref())?;

    let mut response = (StatusCode::OK, [(CONTENT_TYPE, RSS_CONTENT_TYPE)], xml).into_response();
    match metadata_header(&document) {
        Some(value) => {
            response.headers_mut().insert(METADATA_HEADER, value);
        }
        None => tracing::warn!("Omitting {} header for {}", METADATA_HEADER, url),
    }
    Ok(response)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn metadata_header(document: &PodcastDocument) -> Option<HeaderValue> {
    let raw = document.metadata().to_header_value().ok()?;
    HeaderValue::from_str(&raw).ok()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
