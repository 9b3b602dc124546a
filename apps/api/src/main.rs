mod analysis;
mod config;
mod errors;
mod llm_client;
mod routes;
mod scraping;
mod state;
mod tasks;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::analyzer::LlmResumeAnalyzer;
use crate::config::Config;
use crate::llm_client::ollama::OllamaBackend;
use crate::llm_client::CompletionClient;
use crate::routes::build_router;
use crate::scraping::fetcher::HtmlFetcher;
use crate::scraping::headings::HeadingKeywords;
use crate::scraping::JobScraper;
use crate::state::AppState;
use crate::tasks::store::{MemoryTaskStore, RedisTaskStore, TaskStore};
use crate::tasks::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparseable env values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume optimizer v{}", env!("CARGO_PKG_VERSION"));

    // Job description scraping
    let keywords = match &config.heading_keywords_file {
        Some(path) => HeadingKeywords::from_file(path)?,
        None => HeadingKeywords::default(),
    };
    let fetcher = HtmlFetcher::new().context("Failed to build HTML fetcher")?;
    let scraper = Arc::new(JobScraper::new(Arc::new(fetcher), keywords));

    // Completion backend
    let backend = OllamaBackend::new(&config.ollama_url, &config.ollama_model, config.ollama_stream)
        .context("Failed to build completion backend")?;
    match backend.ping().await {
        Ok(version) => info!(
            "Completion service reachable at {} (version {}, model {})",
            config.ollama_url,
            version,
            backend.model()
        ),
        Err(e) => warn!(
            "Completion service not reachable at {}: {} (analyses will fail until it is)",
            config.ollama_url, e
        ),
    }
    let completions = CompletionClient::new(Arc::new(backend))
        .with_retry(config.completion_retry())
        .with_default_timeout(config.completion_timeout_secs);
    let analyzer = Arc::new(LlmResumeAnalyzer::new(completions));

    // Task store: Redis when configured, otherwise in-process
    let store: Arc<dyn TaskStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisTaskStore::connect(url, config.task_retention())
                .await
                .context("Failed to connect to Redis task store")?,
        ),
        None => {
            info!("REDIS_URL not set, keeping task records in memory");
            Arc::new(MemoryTaskStore::new(config.task_retention()))
        }
    };

    let settings = config.orchestrator_settings();
    info!(
        "Orchestrator: {} worker slot(s), {}s budget, {} retries",
        settings.worker_slots,
        settings.max_runtime.as_secs(),
        settings.max_retries
    );
    let orchestrator = Orchestrator::new(store, analyzer, settings);

    // Build app state
    let state = AppState {
        scraper,
        orchestrator,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins once the front-end host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
