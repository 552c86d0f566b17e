use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::aggregator::{Aggregator, MAX_LIMIT, MIN_LIMIT};
use crate::db::{Article, Database, FeedbackKind, NewArticle};
use crate::error::{NewsError, RegistryError, StoreError, SummarizeError};
use crate::fetcher::NormalizedEntry;
use crate::registry::{SourceList, SourceRegistry};
use crate::summarize::{ArticleSummary, Summarizer};

const DEFAULT_LIMIT: usize = 10;

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub registry: Arc<SourceRegistry>,
    pub db: Arc<Database>,
    pub summarizer: Arc<Summarizer>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/", get(api_status))
        .route("/news", get(trending))
        .route("/news/:theme", get(news_by_theme))
        .route("/news/search/:keyword", get(search_news))
        .route("/feeds", get(get_feeds).put(update_feeds))
        .route("/feeds/add", post(add_feed))
        .route("/feeds/remove", delete(remove_feed))
        .route("/store", post(store_article))
        .route("/articles", get(list_articles))
        .route("/articles/:id", get(get_article))
        .route("/feedback", post(post_feedback))
        .route("/summarize", post(summarize_article))
        .with_state(state)
}

/// Browser access for the configured front-end origins. Origins that are not
/// valid header values are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub enum AppError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            AppError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            AppError::BadGateway(detail) => (StatusCode::BAD_GATEWAY, detail),
            AppError::GatewayTimeout(detail) => (StatusCode::GATEWAY_TIMEOUT, detail),
            AppError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

impl From<NewsError> for AppError {
    fn from(err: NewsError) -> Self {
        match err {
            NewsError::Registry(e) => e.into(),
            invalid_input => AppError::BadRequest(invalid_input.to_string()),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        error!("Feed registry failure: {}", err);
        AppError::Internal(format!("Failed to access feeds configuration: {}", err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!("Article store failure: {}", err);
        AppError::Internal(format!("Storage error: {}", err))
    }
}

impl From<SummarizeError> for AppError {
    fn from(err: SummarizeError) -> Self {
        let detail = err.to_string();
        match err {
            SummarizeError::Timeout(_) => AppError::GatewayTimeout(detail),
            SummarizeError::Upstream(_) => AppError::BadGateway(detail),
            SummarizeError::MissingApiKey | SummarizeError::Malformed(_) => {
                AppError::Internal(detail)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// `?limit=` as sent by the client. Kept as text so that negative or
/// non-numeric values get the same error as out-of-range ones.
#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<String>,
}

impl LimitQuery {
    pub fn resolve(&self) -> Result<usize, NewsError> {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(DEFAULT_LIMIT),
            Some(raw) => raw.parse().map_err(|_| NewsError::InvalidLimit {
                got: raw.to_string(),
                min: MIN_LIMIT,
                max: MAX_LIMIT,
            }),
        }
    }
}

#[derive(Serialize)]
pub struct NewsResponse {
    pub theme: String,
    pub articles: Vec<NormalizedEntry>,
    pub total_found: usize,
}

impl NewsResponse {
    fn new(theme: String, articles: Vec<NormalizedEntry>) -> Self {
        Self {
            total_found: articles.len(),
            theme,
            articles,
        }
    }
}

#[derive(Serialize)]
pub struct TrendingResponse {
    pub topics: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateFeedsRequest {
    pub feeds: Vec<String>,
    #[serde(default)]
    pub websites: Vec<String>,
}

#[derive(Deserialize)]
pub struct FeedUrlRequest {
    pub feed_url: String,
}

#[derive(Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
}

#[derive(Serialize)]
pub struct StoreArticleResponse {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub article_id: i64,
    pub feedback: FeedbackKind,
}

#[derive(Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Deserialize)]
pub struct SummarizeRequest {
    pub article_text: String,
}

// Route handlers
pub async fn health() -> impl IntoResponse {
    "OK"
}

pub async fn api_status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Newsdesk API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "summarize": "/summarize",
            "store": "/store",
            "articles": "/articles",
            "feedback": "/feedback",
            "feeds": "/feeds",
            "news": "/news/{theme}",
        }
    }))
}

pub async fn trending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrendingResponse>, AppError> {
    let topics = state.aggregator.trending_topics().await?;
    Ok(Json(TrendingResponse { topics }))
}

pub async fn news_by_theme(
    State(state): State<Arc<AppState>>,
    Path(theme): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<NewsResponse>, AppError> {
    let articles = state
        .aggregator
        .fetch_by_theme(&theme, query.resolve()?)
        .await?;
    Ok(Json(NewsResponse::new(theme, articles)))
}

pub async fn search_news(
    State(state): State<Arc<AppState>>,
    Path(keyword): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<NewsResponse>, AppError> {
    let articles = state.aggregator.search(&keyword, query.resolve()?).await?;
    Ok(Json(NewsResponse::new(keyword, articles)))
}

pub async fn get_feeds(State(state): State<Arc<AppState>>) -> Result<Json<SourceList>, AppError> {
    Ok(Json(state.registry.list().await?))
}

pub async fn update_feeds(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateFeedsRequest>, JsonRejection>,
) -> Result<Json<SourceList>, AppError> {
    let Json(request) = payload?;
    state
        .registry
        .replace(request.feeds, request.websites)
        .await?;
    Ok(Json(state.registry.list().await?))
}

pub async fn add_feed(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeedUrlRequest>, JsonRejection>,
) -> Result<Json<StatusMessage>, AppError> {
    let Json(request) = payload?;
    let message = if state.registry.add(&request.feed_url).await? {
        StatusMessage {
            status: "success",
            message: format!("Feed added: {}", request.feed_url),
        }
    } else {
        StatusMessage {
            status: "warning",
            message: format!("Feed already exists: {}", request.feed_url),
        }
    };
    Ok(Json(message))
}

pub async fn remove_feed(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeedUrlRequest>, JsonRejection>,
) -> Result<Json<StatusMessage>, AppError> {
    let Json(request) = payload?;
    let message = if state.registry.remove(&request.feed_url).await? {
        StatusMessage {
            status: "success",
            message: format!("Feed removed: {}", request.feed_url),
        }
    } else {
        StatusMessage {
            status: "warning",
            message: format!("Feed not found: {}", request.feed_url),
        }
    };
    Ok(Json(message))
}

pub async fn store_article(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewArticle>, JsonRejection>,
) -> Result<Json<StoreArticleResponse>, AppError> {
    let Json(article) = payload?;
    let (id, timestamp) = state.db.store_article(&article).await?;
    info!("Stored article {} with id {}", article.title, id);
    Ok(Json(StoreArticleResponse { id, timestamp }))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Article>>, AppError> {
    Ok(Json(state.db.list_articles().await?))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ArticleDetail>, AppError> {
    let Path(id) = id?;
    let article = state
        .db
        .get_article(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;
    let (likes, dislikes) = state.db.feedback_counts(id).await?;

    Ok(Json(ArticleDetail {
        article,
        likes,
        dislikes,
    }))
}

pub async fn post_feedback(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(request) = payload?;
    state
        .db
        .add_feedback(request.article_id, request.feedback)
        .await?;
    info!(
        "Recorded {} for article {}",
        request.feedback.as_str(),
        request.article_id
    );
    Ok(Json(serde_json::json!({ "status": "success" })))
}

pub async fn summarize_article(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<ArticleSummary>, AppError> {
    let Json(request) = payload?;
    if request.article_text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "article_text must not be empty".to_string(),
        ));
    }

    info!("Received article summarization request");
    let summary = state.summarizer.summarize(&request.article_text).await?;
    Ok(Json(summary))
}
