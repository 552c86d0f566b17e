use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::FetchError;

pub const NO_TITLE: &str = "No Title";
pub const NO_SUMMARY: &str = "No Summary";

/// One feed item, flattened into the fields the rest of the crate works with.
///
/// `title` and `summary` are never empty: absent values are replaced by
/// [`NO_TITLE`] and [`NO_SUMMARY`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEntry {
    pub title: String,
    pub summary: String,
    pub link: String,
    /// Human readable publication date, empty when unknown
    pub published: String,
    #[serde(skip)]
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
    pub source_url: String,
}

/// Anything that can turn a source URL into entries.
///
/// Implementations must not fail: a source that cannot be fetched or parsed
/// yields an empty list so that one bad feed never aborts an aggregation.
#[async_trait]
pub trait EntrySource: Send + Sync {
    async fn fetch(&self, source_url: &str, timeout: Duration) -> Vec<NormalizedEntry>;
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Fetch and parse one source, reporting why it failed.
    pub async fn try_fetch(
        &self,
        source_url: &str,
        timeout: Duration,
    ) -> Result<Vec<NormalizedEntry>, FetchError> {
        match tokio::time::timeout(timeout, self.download_and_parse(source_url, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout.as_secs())),
        }
    }

    async fn download_and_parse(
        &self,
        source_url: &str,
        timeout: Duration,
    ) -> Result<Vec<NormalizedEntry>, FetchError> {
        debug!("Fetching feed: {}", source_url);

        let response = self
            .client
            .get(source_url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await.map_err(|e| classify(e, timeout))?;
        let entries = Self::parse_entries(&bytes, source_url)?;

        info!("Parsed {} entries from {}", entries.len(), source_url);
        Ok(entries)
    }

    /// Parse an RSS/Atom document into normalized entries.
    ///
    /// The source name is the feed title, or `source_url` when the feed has none.
    pub fn parse_entries(
        bytes: &[u8],
        source_url: &str,
    ) -> Result<Vec<NormalizedEntry>, FetchError> {
        let parsed = parser::parse(bytes)?;

        let source = parsed
            .title
            .map(|t| t.content)
            .and_then(non_blank)
            .unwrap_or_else(|| source_url.to_string());

        let entries = parsed
            .entries
            .into_iter()
            .map(|entry| {
                let title = entry
                    .title
                    .map(|t| t.content)
                    .and_then(non_blank)
                    .unwrap_or_else(|| NO_TITLE.to_string());

                // RSS <description> lands in `summary`; full content is the fallback.
                let summary = entry
                    .summary
                    .map(|s| s.content)
                    .and_then(non_blank)
                    .or_else(|| entry.content.and_then(|c| c.body).and_then(non_blank))
                    .unwrap_or_else(|| NO_SUMMARY.to_string());

                let link = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default();

                let published_at: Option<DateTime<Utc>> = entry.published.or(entry.updated);
                let published = published_at
                    .map(|dt| dt.to_rfc2822())
                    .unwrap_or_default();

                NormalizedEntry {
                    title,
                    summary,
                    link,
                    published,
                    published_at,
                    source: source.clone(),
                    source_url: source_url.to_string(),
                }
            })
            .collect();

        Ok(entries)
    }
}

#[async_trait]
impl EntrySource for Fetcher {
    async fn fetch(&self, source_url: &str, timeout: Duration) -> Vec<NormalizedEntry> {
        match self.try_fetch(source_url, timeout).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping feed {}: {}", source_url, e);
                Vec::new()
            }
        }
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout.as_secs())
    } else {
        FetchError::Http(err)
    }
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
