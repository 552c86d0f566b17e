//! Drafts a title, summary and category for raw article text via an
//! OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::SummarizeConfig;
use crate::error::SummarizeError;

const UNCATEGORIZED: &str = "Uncategorized";
const MAX_TOKENS: u32 = 512;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleSummary {
    pub title: String,
    pub summary: String,
    pub category: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

/// The JSON object the model is asked to answer with. Missing keys fall back
/// to empty strings, or [`UNCATEGORIZED`] for the category.
#[derive(Deserialize)]
struct DraftFields {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    category: Option<String>,
}

pub struct Summarizer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(config: &SummarizeConfig) -> Result<Self, SummarizeError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SummarizeError::Upstream(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub async fn summarize(&self, article_text: &str) -> Result<ArticleSummary, SummarizeError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            error!("Summarization requested but no API key is configured");
            SummarizeError::MissingApiKey
        })?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt(article_text),
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        info!("Requesting article summary from {}", self.api_url);
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Summarization API returned {}: {}", status, body);
            return Err(SummarizeError::Upstream(format!("{}: {}", status, body)));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let summary = parse_reply(&body)?;

        info!("Summarized article as '{}'", summary.title);
        Ok(summary)
    }

    fn classify(&self, err: reqwest::Error) -> SummarizeError {
        if err.is_timeout() {
            error!("Summarization request timed out");
            SummarizeError::Timeout(self.timeout.as_secs())
        } else {
            error!("Summarization request failed: {}", err);
            SummarizeError::Upstream(err.to_string())
        }
    }
}

fn prompt(article_text: &str) -> String {
    format!(
        "You are an expert news assistant. Given the following article, generate a concise, \
         engaging title, a 2-3 sentence summary, and suggest a category (e.g., politics, \
         technology, health, etc.). Return the result as a JSON object with keys: title, \
         summary, category.\n\nArticle:\n{}",
        article_text
    )
}

/// Pull the model's answer out of a chat-completions body and decode it.
fn parse_reply(body: &[u8]) -> Result<ArticleSummary, SummarizeError> {
    let response: ChatResponse = serde_json::from_slice(body)
        .map_err(|e| SummarizeError::Malformed(format!("unexpected response shape: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| SummarizeError::Malformed("response has no choices".to_string()))?;

    let fields: DraftFields = serde_json::from_str(content.trim()).map_err(|e| {
        error!("Model reply is not the expected JSON object: {}", content);
        SummarizeError::Malformed(e.to_string())
    })?;

    Ok(ArticleSummary {
        title: fields.title,
        summary: fields.summary,
        category: fields
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
    })
}
