// Job description scraping: fetch a posting and pull out the description text.
// Fetching and extraction are separate so extraction can run on fixtures.

pub mod cleanup;
pub mod extractor;
pub mod fetcher;
pub mod handlers;
pub mod headings;
pub mod sites;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::scraping::extractor::{ExtractionResult, Extractor};
use crate::scraping::fetcher::{parse_job_url, PageSource};
use crate::scraping::headings::HeadingKeywords;
use crate::scraping::sites::SiteTable;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Request timed out. Please check your internet connection.")]
    FetchTimeout,

    #[error("Access denied. This job posting might require authentication.")]
    AccessDenied,

    #[error("Job posting not found. The link might be expired or invalid.")]
    NotFound,

    #[error("Failed to fetch job posting: {0}")]
    FetchFailed(String),

    #[error("Failed to extract a sufficient job description from the page ({length} characters found).")]
    InsufficientContent { length: usize },
}

/// Fetch + extract, the one entry point the HTTP layer uses.
pub struct JobScraper {
    pages: Arc<dyn PageSource>,
    extractor: Extractor,
}

impl JobScraper {
    pub fn new(pages: Arc<dyn PageSource>, keywords: HeadingKeywords) -> Self {
        let extractor = Extractor::new(SiteTable::known_job_boards(), keywords, pages.clone());
        Self { pages, extractor }
    }

    pub async fn scrape(&self, url: &str) -> Result<ExtractionResult, ScrapeError> {
        let url = parse_job_url(url)?;
        let html = self.pages.fetch(url.as_str()).await?;
        let result = self.extractor.extract(&html, &url).await?;
        info!(
            "Scraped {} ({} chars, {:?})",
            url, result.length, result.source_strategy
        );
        Ok(result)
    }
}
