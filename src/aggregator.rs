use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::FetchConfig;
use crate::error::NewsError;
use crate::fetcher::{EntrySource, NormalizedEntry};
use crate::keywords::ThemeQuery;
use crate::registry::SourceRegistry;

pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 50;

const TREND_ENTRIES_PER_SOURCE: usize = 5;
const TREND_TOP_N: usize = 10;
const STOP_WORDS: &[&str] = &["news", "says", "will", "new", "first", "more", "after", "with"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendWord {
    pub word: String,
    pub count: usize,
}

/// Fans out over every registered source, then filters and ranks the merged entries.
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    source: Arc<dyn EntrySource>,
    timeout: Duration,
    max_concurrent: usize,
}

impl Aggregator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        source: Arc<dyn EntrySource>,
        config: &FetchConfig,
    ) -> Self {
        Self {
            registry,
            source,
            timeout: Duration::from_secs(config.timeout_secs),
            max_concurrent: config.max_concurrent.max(1),
        }
    }

    /// Newest entries matching `theme`, at most `limit` of them.
    pub async fn fetch_by_theme(
        &self,
        theme: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedEntry>, NewsError> {
        validate_limit(limit)?;
        info!("Fetching news for theme: {}", theme);

        let query = ThemeQuery::new(theme);
        let entries = self.fetch_all(None).await?;
        let total = entries.len();

        let mut matched: Vec<NormalizedEntry> =
            entries.into_iter().filter(|e| query.matches(e)).collect();
        rank_by_recency(&mut matched);
        matched.truncate(limit);

        info!(
            "Found {} articles for theme '{}' ({} fetched)",
            matched.len(),
            query.theme(),
            total
        );
        Ok(matched)
    }

    /// Like [`Aggregator::fetch_by_theme`], but a blank keyword is rejected.
    pub async fn search(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedEntry>, NewsError> {
        if keyword.trim().is_empty() {
            return Err(NewsError::EmptyQuery);
        }
        self.fetch_by_theme(keyword, limit).await
    }

    /// The most frequent significant words in the freshest headlines.
    pub async fn trending_topics(&self) -> Result<Vec<String>, NewsError> {
        info!("Analyzing trending topics");

        let entries = self.fetch_all(Some(TREND_ENTRIES_PER_SOURCE)).await?;
        let trends = trending_words(entries.iter().map(|e| e.title.as_str()), TREND_TOP_N);

        info!("Found {} trending topics", trends.len());
        Ok(trends.into_iter().map(|t| t.word).collect())
    }

    /// Fetch every registered source concurrently, at most `max_concurrent` at
    /// a time. Entries come back grouped in registry order regardless of which
    /// source finished first.
    async fn fetch_all(
        &self,
        per_source_cap: Option<usize>,
    ) -> Result<Vec<NormalizedEntry>, NewsError> {
        let feeds = self.registry.feeds().await?;
        if feeds.is_empty() {
            warn!("No feeds registered");
            return Ok(Vec::new());
        }

        let mut slots: Vec<Vec<NormalizedEntry>> = vec![Vec::new(); feeds.len()];
        let mut join_set: JoinSet<(usize, Vec<NormalizedEntry>)> = JoinSet::new();
        let mut pending = feeds.into_iter().enumerate();

        fn spawn_fetch(
            join_set: &mut JoinSet<(usize, Vec<NormalizedEntry>)>,
            source: Arc<dyn EntrySource>,
            timeout: Duration,
            (index, url): (usize, String),
        ) {
            join_set.spawn(async move {
                let entries = match tokio::time::timeout(timeout, source.fetch(&url, timeout)).await
                {
                    Ok(entries) => entries,
                    Err(_) => {
                        warn!("Feed {} did not finish within {:?}, skipping", url, timeout);
                        Vec::new()
                    }
                };
                (index, entries)
            });
        }

        for next in pending.by_ref().take(self.max_concurrent) {
            spawn_fetch(&mut join_set, Arc::clone(&self.source), self.timeout, next);
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, mut entries)) => {
                    if let Some(cap) = per_source_cap {
                        entries.truncate(cap);
                    }
                    slots[index] = entries;
                }
                Err(e) => error!("Feed fetch task failed: {}", e),
            }

            if let Some(next) = pending.next() {
                spawn_fetch(&mut join_set, Arc::clone(&self.source), self.timeout, next);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

pub fn validate_limit(limit: usize) -> Result<(), NewsError> {
    if (MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(NewsError::InvalidLimit {
            got: limit.to_string(),
            min: MIN_LIMIT,
            max: MAX_LIMIT,
        })
    }
}

/// Newest first. Entries without a timestamp sink to the end; the sort is
/// stable so equal timestamps keep their merged order.
pub fn rank_by_recency(entries: &mut [NormalizedEntry]) {
    entries.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w{4,}\b").expect("word pattern is valid"))
}

/// Count lowercase words of four or more characters across `titles`.
///
/// Ties keep first-seen order.
pub fn trending_words<'a, I>(titles: I, top_n: usize) -> Vec<TrendWord>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<TrendWord> = Vec::new();

    for title in titles {
        let lowered = title.to_lowercase();
        for m in word_pattern().find_iter(&lowered) {
            let word = m.as_str();
            if STOP_WORDS.contains(&word) {
                continue;
            }
            match positions.get(word) {
                Some(&i) => counts[i].count += 1,
                None => {
                    positions.insert(word.to_string(), counts.len());
                    counts.push(TrendWord {
                        word: word.to_string(),
                        count: 1,
                    });
                }
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(top_n);
    counts
}
