use std::sync::Arc;

use crate::config::Config;
use crate::scraping::JobScraper;
use crate::tasks::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<JobScraper>,
    pub orchestrator: Orchestrator,
    pub config: Config,
}
