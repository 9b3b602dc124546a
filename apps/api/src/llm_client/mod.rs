/// Completion client — the single point of entry for every text-generation call.
///
/// ARCHITECTURAL RULE: no other module talks to the completion service directly.
/// Backends stream text fragments; this module owns the timeout guard, the
/// retry loop, fragment accumulation and JSON recovery.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

pub mod json_extract;
pub mod ollama;
pub mod prompts;

use json_extract::{extract_json_object, JsonObject};

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Completion timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Completion service returned an empty response")]
    Empty,

    #[error("Completion output was malformed: {0}")]
    Malformed(String),

    #[error("Completion service error: {0}")]
    Backend(String),
}

/// Text fragments as the backend produces them.
pub type FragmentStream = BoxStream<'static, Result<String, CompletionError>>;

/// A text-generation service. Implementations only move bytes; they never retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn stream(&self, prompt: &str) -> Result<FragmentStream, CompletionError>;
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub timeout_seconds: u64,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub raw_text: String,
    pub parsed_json: Option<JsonObject>,
    /// Why `parsed_json` is empty, kept from the single parse in `from_text`.
    parse_error: Option<CompletionError>,
}

impl CompletionResponse {
    fn from_text(raw_text: String) -> Self {
        let (parsed_json, parse_error) = match extract_json_object(&raw_text) {
            Ok(json) => (Some(json), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            raw_text,
            parsed_json,
            parse_error,
        }
    }

    fn into_json(self) -> Result<JsonObject, CompletionError> {
        match (self.parsed_json, self.parse_error) {
            (Some(json), _) => Ok(json),
            (None, Some(e)) => Err(e),
            (None, None) => Err(CompletionError::Malformed("no JSON object in output".into())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `base_delay × n`.
    pub base_delay: Duration,
    /// When false only malformed output is retried; timeouts, empty output
    /// and backend errors are returned after the first call.
    pub retry_transport_errors: bool,
}

impl RetryPolicy {
    fn should_retry(&self, error: &CompletionError) -> bool {
        matches!(error, CompletionError::Malformed(_)) || self.retry_transport_errors
    }

    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_transport_errors: true,
        }
    }
}

/// Join handle that aborts its task when dropped. A caller that stops
/// waiting (timeout, cancelled parent task) never leaves the call running.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    retry: RetryPolicy,
    default_timeout_secs: u64,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    /// Leaves transport failures to the caller's own retry loop.
    pub fn without_transport_retries(mut self) -> Self {
        self.retry.retry_transport_errors = false;
        self
    }

    pub fn request(&self, prompt: impl Into<String>) -> CompletionRequest {
        CompletionRequest::new(prompt).with_timeout(self.default_timeout_secs)
    }

    /// Runs the request and returns the recovered JSON object.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<JsonObject, CompletionError> {
        self.complete_as(request, Ok).await
    }

    /// Like [`complete`](Self::complete), with `validate` applied inside each attempt
    /// so that shape violations are retried together with the call.
    /// After the last attempt the last error is returned.
    pub async fn complete_as<T, F>(
        &self,
        request: &CompletionRequest,
        validate: F,
    ) -> Result<T, CompletionError>
    where
        F: Fn(JsonObject) -> Result<T, CompletionError>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = CompletionError::Empty;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.retry.delay_before(attempt);
                warn!(
                    "Completion attempt {} failed ({}), retrying after {}ms...",
                    attempt - 1,
                    last_error,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self
                .attempt(request)
                .await
                .and_then(CompletionResponse::into_json)
                .and_then(&validate)
            {
                Ok(value) => {
                    debug!("Completion succeeded on attempt {}", attempt);
                    return Ok(value);
                }
                Err(e) if !self.retry.should_retry(&e) => {
                    debug!("Completion attempt {} failed, not retrying: {}", attempt, e);
                    return Err(e);
                }
                Err(e) => last_error = e,
            }
        }

        warn!(
            "Completion failed after {} attempts: {}",
            max_attempts, last_error
        );
        Err(last_error)
    }

    /// One guarded call: the backend runs on its own task and is abandoned
    /// once the wall-clock budget is spent.
    async fn attempt(&self, request: &CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        let backend = self.backend.clone();
        let prompt = request.prompt.clone();
        let budget = Duration::from_secs(request.timeout_seconds);

        info!(
            "Sending prompt to completion service ({} chars, timeout {}s)",
            prompt.len(),
            request.timeout_seconds
        );

        let mut worker = AbortOnDrop(tokio::spawn(async move {
            let fragments = backend.stream(&prompt).await?;
            collect_fragments(fragments).await
        }));

        let text = match tokio::time::timeout(budget, &mut worker).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(CompletionError::Backend(format!(
                    "completion worker stopped: {join_error}"
                )))
            }
            Err(_) => {
                return Err(CompletionError::Timeout {
                    secs: request.timeout_seconds,
                });
            }
        };

        Ok(CompletionResponse::from_text(text))
    }
}

/// Concatenates fragments. A blank concatenation is [`CompletionError::Empty`].
pub async fn collect_fragments(mut fragments: FragmentStream) -> Result<String, CompletionError> {
    let mut text = String::new();
    while let Some(fragment) = fragments.next().await {
        text.push_str(&fragment?);
    }

    if text.trim().is_empty() {
        return Err(CompletionError::Empty);
    }
    Ok(text)
}
