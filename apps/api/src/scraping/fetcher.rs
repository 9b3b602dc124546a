//! HTML fetcher — a single GET with browser-like headers. No retries here;
//! callers decide whether a failed fetch is worth repeating.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use tracing::{info, warn};
use url::Url;

use crate::scraping::ScrapeError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.5";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Anything that can turn a URL into a response body.
///
/// The extractor also goes through this seam for site-specific job APIs, so
/// tests can serve fixtures without a network.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Parses and validates a job URL: it must carry both a scheme and a host.
pub fn parse_job_url(raw: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw.trim()).map_err(|_| ScrapeError::InvalidUrl(raw.to_string()))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ScrapeError::InvalidUrl(raw.to_string())),
    }
}

/// Maps a non-success HTTP status onto the fetch error taxonomy.
pub fn classify_status(status: StatusCode) -> Result<(), ScrapeError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::FORBIDDEN => Err(ScrapeError::AccessDenied),
        StatusCode::NOT_FOUND => Err(ScrapeError::NotFound),
        s => Err(ScrapeError::FetchFailed(format!("HTTP {s}"))),
    }
}

#[derive(Clone)]
pub struct HtmlFetcher {
    client: Client,
}

impl HtmlFetcher {
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::FetchFailed(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HtmlFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let url = parse_job_url(url)?;
        info!("Fetching page: {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!("Fetch of {} failed: {}", url, e);
            if e.is_timeout() {
                ScrapeError::FetchTimeout
            } else {
                ScrapeError::FetchFailed(e.to_string())
            }
        })?;

        classify_status(response.status())?;

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::FetchTimeout
            } else {
                ScrapeError::FetchFailed(format!("Failed to read response body: {e}"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fixture_router() -> Router {
        Router::new()
            .route("/job", get(|| async { "<html><body>hello</body></html>" }))
            .route("/private", get(|| async { AxumStatus::FORBIDDEN }))
            .route("/gone", get(|| async { AxumStatus::NOT_FOUND }))
            .route("/broken", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
    }

    #[test]
    fn test_parse_job_url_requires_scheme_and_host() {
        assert!(parse_job_url("https://www.indeed.com/viewjob?jk=1").is_ok());
        assert!(matches!(
            parse_job_url("www.indeed.com/viewjob"),
            Err(ScrapeError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_job_url("mailto:jobs@example.com"),
            Err(ScrapeError::InvalidUrl(_))
        ));
        assert!(matches!(parse_job_url(""), Err(ScrapeError::InvalidUrl(_))));
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::OK).is_ok());
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            Err(ScrapeError::AccessDenied)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            Err(ScrapeError::NotFound)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            Err(ScrapeError::FetchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_maps_http_outcomes() {
        let base = serve(fixture_router()).await;
        let fetcher = HtmlFetcher::new().unwrap();

        let body = fetcher.fetch(&format!("{base}/job")).await.unwrap();
        assert!(body.contains("hello"));

        assert!(matches!(
            fetcher.fetch(&format!("{base}/private")).await,
            Err(ScrapeError::AccessDenied)
        ));
        assert!(matches!(
            fetcher.fetch(&format!("{base}/gone")).await,
            Err(ScrapeError::NotFound)
        ));
        assert!(matches!(
            fetcher.fetch(&format!("{base}/broken")).await,
            Err(ScrapeError::FetchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let base = serve(fixture_router()).await;
        let fetcher = HtmlFetcher::with_timeout(Duration::from_millis(200)).unwrap();
        assert!(matches!(
            fetcher.fetch(&format!("{base}/slow")).await,
            Err(ScrapeError::FetchTimeout)
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url_before_network() {
        let fetcher = HtmlFetcher::new().unwrap();
        assert!(matches!(
            fetcher.fetch("not a url").await,
            Err(ScrapeError::InvalidUrl(_))
        ));
    }
}
