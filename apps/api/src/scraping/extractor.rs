//! Section extractor — layered strategy for locating the job description in an
//! arbitrary page.
//!
//! Order (first success wins, no scoring across candidates):
//! 1. known-site rule for the host, if one is registered
//! 2. otherwise the generic coarse selectors
//! 3. heading harvest, as the fallback or to rescue a too-short result
//!
//! Every candidate is cleaned before it is measured against
//! [`MIN_DESCRIPTION_LENGTH`].

use std::collections::HashSet;
use std::sync::Arc;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::scraping::cleanup::{char_len, clean_description, element_text};
use crate::scraping::fetcher::PageSource;
use crate::scraping::headings::{harvest_text, HeadingKeywords};
use crate::scraping::sites::{
    JobApiStep, SiteRule, SiteStep, SiteTable, GENERIC_SELECTORS, SCAN_CONTAINERS,
    SCAN_NODES, SCAN_NODE_MIN_LENGTH,
};
use crate::scraping::ScrapeError;

/// Descriptions shorter than this are treated as a failed extraction.
pub const MIN_DESCRIPTION_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStrategy {
    KnownSite,
    GenericSelector,
    HeadingHarvest,
}

/// A successful extraction. `length` is always the character count of `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub description: String,
    pub source_strategy: SourceStrategy,
    pub length: usize,
}

impl ExtractionResult {
    fn new(description: String, source_strategy: SourceStrategy) -> Self {
        let length = char_len(&description);
        Self {
            description,
            source_strategy,
            length,
        }
    }
}

pub struct Extractor {
    sites: SiteTable,
    keywords: HeadingKeywords,
    /// Used by site rules that fall back to a JSON job API.
    pages: Arc<dyn PageSource>,
}

impl Extractor {
    pub fn new(sites: SiteTable, keywords: HeadingKeywords, pages: Arc<dyn PageSource>) -> Self {
        Self {
            sites,
            keywords,
            pages,
        }
    }

    pub async fn extract(&self, html: &str, url: &Url) -> Result<ExtractionResult, ScrapeError> {
        let host = url.host_str().unwrap_or_default();

        let primary = match self.sites.rule_for(host) {
            Some(rule) => {
                debug!("Using known-site rule '{}' for {}", rule.name, host);
                self.apply_rule(rule, html, url)
                    .await
                    .map(|text| ExtractionResult::new(text, SourceStrategy::KnownSite))
            }
            None => first_selector_match(html, GENERIC_SELECTORS)
                .map(|text| ExtractionResult::new(text, SourceStrategy::GenericSelector)),
        };

        if let Some(result) = primary {
            info!(
                "Extracted {} chars from {} via {:?}",
                result.length, host, result.source_strategy
            );
            return Ok(result);
        }

        let harvested = harvest_text(html, &self.keywords);
        let harvested_length = char_len(&harvested);
        if harvested_length >= MIN_DESCRIPTION_LENGTH {
            info!("Extracted {} chars from {} via heading harvest", harvested_length, host);
            return Ok(ExtractionResult::new(harvested, SourceStrategy::HeadingHarvest));
        }

        warn!(
            "No strategy produced a sufficient description for {} (best: {} chars)",
            url, harvested_length
        );
        Err(ScrapeError::InsufficientContent {
            length: harvested_length,
        })
    }

    async fn apply_rule(&self, rule: &SiteRule, html: &str, url: &Url) -> Option<String> {
        for step in &rule.steps {
            let found = match step {
                SiteStep::Selectors(selectors) => first_selector_match(html, selectors),
                SiteStep::JobApi(api) => self.lookup_job_api(api, url).await,
                SiteStep::ParagraphScan => paragraph_scan(html),
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    async fn lookup_job_api(&self, api: &JobApiStep, url: &Url) -> Option<String> {
        let endpoint = api.endpoint_for(url.host_str()?, url.path())?;
        debug!("Trying job API {}", endpoint);

        let body = match self.pages.fetch(&endpoint).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Job API lookup failed for {}: {}", endpoint, e);
                return None;
            }
        };

        let description_html = description_from_api(&body)?;
        let fragment = Html::parse_fragment(&description_html);
        let text = element_text(fragment.root_element(), "\n");
        sufficient(clean_description(&text))
    }
}

fn sufficient(text: String) -> Option<String> {
    (char_len(&text) >= MIN_DESCRIPTION_LENGTH).then_some(text)
}

/// First selector whose first matching element yields enough cleaned text.
/// A match that is too short does not stop the search.
pub fn first_selector_match(html: &str, selectors: &[&str]) -> Option<String> {
    let document = Html::parse_document(html);

    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Skipping invalid selector {}: {:?}", selector_str, e);
                continue;
            }
        };

        if let Some(element) = document.select(&selector).next() {
            let text = clean_description(&element_text(element, "\n"));
            if let Some(text) = sufficient(text) {
                return Some(text);
            }
            debug!("Selector {} matched but yielded too little text", selector_str);
        }
    }

    None
}

/// Collects long `<p>`/`<li>` nodes from content containers, deduplicated in document order.
pub fn paragraph_scan(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let (Ok(containers), Ok(nodes)) = (Selector::parse(SCAN_CONTAINERS), Selector::parse(SCAN_NODES))
    else {
        return None;
    };

    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for container in document.select(&containers) {
        for node in container.select(&nodes) {
            let text = element_text(node, " ");
            if char_len(&text) > SCAN_NODE_MIN_LENGTH && seen.insert(text.clone()) {
                lines.push(text);
            }
        }
    }

    sufficient(clean_description(&lines.join("\n")))
}

/// Pulls the HTML description out of a job API payload: `description` at the
/// root, or under `data` or `job`.
fn description_from_api(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let found = [
        value.get("description"),
        value.get("data").and_then(|d| d.get("description")),
        value.get("job").and_then(|j| j.get("description")),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| v.as_str().map(str::to_string));
    found
}
