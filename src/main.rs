use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsdesk::aggregator::Aggregator;
use newsdesk::config::Config;
use newsdesk::db::Database;
use newsdesk::fetcher::Fetcher;
use newsdesk::registry::SourceRegistry;
use newsdesk::routes::{self, AppState};
use newsdesk::summarize::Summarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsdesk=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load_or_default("newsdesk.toml")?.apply_env();
    info!("CORS origins: {:?}", config.cors_origins);

    // Initialize database
    let db = Database::new(&config.database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    let registry = Arc::new(SourceRegistry::new(config.feeds_file.clone()));
    info!("Using feed registry at {}", registry.path().display());
    let fetcher = Arc::new(Fetcher::new(&config.fetch.user_agent)?);
    let aggregator = Arc::new(Aggregator::new(registry.clone(), fetcher, &config.fetch));

    if config.summarize.api_key.is_none() {
        warn!("No summarization API key configured; /summarize will fail");
    }
    let summarizer = Arc::new(Summarizer::new(&config.summarize)?);

    let state = Arc::new(AppState {
        aggregator,
        registry,
        db: Arc::new(db),
        summarizer,
    });

    let app = routes::router(state)
        .layer(routes::cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
