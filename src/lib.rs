//! Newsdesk - themed news from syndicated feeds
//!
//! Fetches every registered RSS/Atom source on demand, filters entries by an
//! expandable topic, ranks them by recency, and derives trending words from
//! the freshest headlines.

pub mod aggregator;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod keywords;
pub mod registry;
pub mod routes;
pub mod summarize;
