//! Theme expansion and matching.
//!
//! A theme is expanded into a set of match terms using a fixed, ordered list of
//! topic clusters. The first cluster whose trigger appears in the lowercased
//! theme contributes its synonyms; later clusters are not consulted.

use std::collections::HashSet;

use crate::fetcher::NormalizedEntry;

struct TopicCluster {
    triggers: &'static [&'static str],
    expansions: &'static [&'static str],
}

const CLUSTERS: &[TopicCluster] = &[
    // AI / ML
    TopicCluster {
        triggers: &["ai", "artificial intelligence", "machine learning", "ml"],
        expansions: &[
            "artificial intelligence",
            "machine learning",
            "AI",
            "ML",
            "neural network",
            "deep learning",
            "chatgpt",
            "openai",
            "llm",
            "automation",
        ],
    },
    // Automotive / EV
    TopicCluster {
        triggers: &["tesla", "electric vehicle", "ev"],
        expansions: &[
            "Tesla",
            "electric vehicle",
            "EV",
            "Elon Musk",
            "battery",
            "charging",
            "electric car",
            "automotive",
        ],
    },
    // Crypto
    TopicCluster {
        triggers: &["crypto", "bitcoin", "blockchain"],
        expansions: &[
            "cryptocurrency",
            "bitcoin",
            "blockchain",
            "crypto",
            "BTC",
            "ethereum",
            "digital currency",
            "trading",
        ],
    },
    // General tech
    TopicCluster {
        triggers: &["tech", "technology", "startup"],
        expansions: &[
            "technology",
            "tech",
            "startup",
            "innovation",
            "software",
            "hardware",
        ],
    },
    // Health
    TopicCluster {
        triggers: &["health", "medical", "medicine"],
        expansions: &[
            "health",
            "medical",
            "medicine",
            "healthcare",
            "treatment",
            "research",
        ],
    },
];

/// Expand `theme` into its match terms.
///
/// The literal theme is always included. Terms are deduplicated
/// case-insensitively; the first spelling seen is kept.
pub fn expand(theme: &str) -> Vec<String> {
    let lowered = theme.to_lowercase();
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    let mut push = |term: &str| {
        if seen.insert(term.to_lowercase()) {
            terms.push(term.to_string());
        }
    };

    push(theme);

    if let Some(cluster) = CLUSTERS
        .iter()
        .find(|c| c.triggers.iter().any(|t| lowered.contains(t)))
    {
        for &term in cluster.expansions {
            push(term);
        }
    }

    terms
}

/// A theme together with its expanded, lowercased match terms.
#[derive(Debug, Clone)]
pub struct ThemeQuery {
    theme: String,
    terms: Vec<String>,
}

impl ThemeQuery {
    /// A blank theme yields no terms. Otherwise the theme is expanded as given,
    /// surrounding whitespace included.
    pub fn new(theme: &str) -> Self {
        let terms = if theme.trim().is_empty() {
            Vec::new()
        } else {
            expand(theme).iter().map(|t| t.to_lowercase()).collect()
        };

        Self {
            theme: theme.to_string(),
            terms,
        }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// True when any term occurs in the entry's title or summary, ignoring case.
    /// An empty theme matches every entry.
    pub fn matches(&self, entry: &NormalizedEntry) -> bool {
        if self.terms.is_empty() {
            return true;
        }

        let haystack = format!("{} {}", entry.title, entry.summary).to_lowercase();
        self.terms.iter().any(|term| haystack.contains(term.as_str()))
    }
}
