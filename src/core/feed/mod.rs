pub mod fetcher;
pub mod mapper;
pub mod rss;
pub mod types;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid podcast JSON structure")]
    InvalidStructure,
    #[error("invalid podcast JSON document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
    #[error("rss serialization failed: {0}")]
    Xml(String),
}
