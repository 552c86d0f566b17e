use thiserror::Error;

/// Hard failures of the source registry's backing document.
///
/// A missing or malformed document is not an error: the registry reads it as
/// empty. Only I/O faults unrelated to the document's format end up here.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a single source produced no entries.
///
/// Never escapes [`crate::fetcher::EntrySource::fetch`]; it exists so the
/// failure branch can be logged with a precise reason.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Feed parsing error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

/// Errors surfaced by theme queries and trend extraction.
#[derive(Error, Debug)]
pub enum NewsError {
    #[error("limit must be between {min} and {max}, got {got}")]
    InvalidLimit { got: String, min: usize, max: usize },

    #[error("query must not be empty")]
    EmptyQuery,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Failures of the article summarization call, kept apart so the HTTP layer
/// can tell a slow upstream from a broken one.
#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Summarization API key is not configured")]
    MissingApiKey,

    #[error("Summarization request timed out after {0}s")]
    Timeout(u64),

    #[error("Summarization request failed: {0}")]
    Upstream(String),

    #[error("Could not parse summarization response: {0}")]
    Malformed(String),
}
