//! Ollama chat backend.
//!
//! Talks to `POST {base_url}/api/chat`. In streaming mode the response body is
//! newline-delimited JSON, one object per generated fragment, ending with an
//! object whose `done` is true.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{CompletionBackend, CompletionError, FragmentStream};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "mistral";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// One NDJSON line, or the whole body in non-streaming mode.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    stream: bool,
}

impl OllamaBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        stream: bool,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| CompletionError::Backend(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            stream,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Asks the server for its version. Used as a liveness check at startup.
    pub async fn ping(&self) -> Result<String, CompletionError> {
        let response = self
            .client
            .get(format!("{}/api/version", self.base_url))
            .send()
            .await
            .map_err(|e| CompletionError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CompletionError::Backend(format!(
                "version check returned HTTP {}",
                response.status()
            )));
        }

        let body: VersionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Backend(format!("unexpected version payload: {e}")))?;
        Ok(body.version)
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    async fn stream(&self, prompt: &str) -> Result<FragmentStream, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: JSON_ONLY_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: self.stream,
        };

        debug!("POST {}/api/chat (model {}, stream {})", self.base_url, self.model, self.stream);

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Backend(format!("HTTP {status}: {body}")));
        }

        if self.stream {
            return Ok(ChatChunkStream::new(response.bytes_stream()).boxed());
        }

        let chunk: ChatChunk = response
            .json()
            .await
            .map_err(|e| CompletionError::Backend(format!("unexpected chat payload: {e}")))?;
        let text = chunk_text(chunk)?;
        info!("Received {} chars from {}", text.len(), self.model);
        Ok(futures::stream::once(async move { Ok(text) }).boxed())
    }
}

fn chunk_text(chunk: ChatChunk) -> Result<String, CompletionError> {
    if let Some(error) = chunk.error {
        return Err(CompletionError::Backend(error));
    }
    Ok(chunk.message.map(|m| m.content).unwrap_or_default())
}

/// Turns the NDJSON byte stream into text fragments.
///
/// Bytes are buffered until a full line is available, so multi-byte characters
/// split across network chunks decode correctly.
pub struct ChatChunkStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl ChatChunkStream {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Decodes the next non-blank line, if a full one is buffered.
    fn next_line(&mut self, flush: bool) -> Option<Result<String, CompletionError>> {
        loop {
            let line: Vec<u8> = match self.buffer.iter().position(|b| *b == b'\n') {
                Some(pos) => self.buffer.drain(..=pos).collect(),
                None if flush && !self.buffer.is_empty() => std::mem::take(&mut self.buffer),
                None => return None,
            };

            let line = match std::str::from_utf8(&line) {
                Ok(line) => line.trim(),
                Err(e) => {
                    return Some(Err(CompletionError::Backend(format!(
                        "Invalid UTF-8 in stream: {e}"
                    ))))
                }
            };
            if line.is_empty() {
                continue;
            }

            return Some(match serde_json::from_str::<ChatChunk>(line) {
                Ok(chunk) => {
                    if chunk.done {
                        self.finished = true;
                    }
                    chunk_text(chunk)
                }
                Err(e) => Err(CompletionError::Backend(format!(
                    "Failed to parse stream chunk: {} (data: {})",
                    e,
                    line.chars().take(200).collect::<String>()
                ))),
            });
        }
    }
}

impl Stream for ChatChunkStream {
    type Item = Result<String, CompletionError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            if let Some(item) = this.next_line(false) {
                return Poll::Ready(Some(item));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(CompletionError::Backend(e.to_string()))));
                }
                Poll::Ready(None) => {
                    let tail = this.next_line(true);
                    this.finished = true;
                    return Poll::Ready(tail);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::collect_fragments;
    use axum::{routing::get, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn byte_chunks(chunks: &[&[u8]]) -> Vec<Result<Bytes, reqwest::Error>> {
        chunks.iter().map(|c| Ok(Bytes::copy_from_slice(c))).collect()
    }

    #[tokio::test]
    async fn test_decodes_fragments_until_done() {
        let body = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"{\\\"a\\\"\"},\"done\":false}\n",
            "\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\": 1}\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"ignored\"},\"done\":false}\n",
        );
        let stream = ChatChunkStream::new(futures::stream::iter(byte_chunks(&[body.as_bytes()])));
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments, vec!["{\"a\"", ": 1}", ""]);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let line = "{\"message\":{\"content\":\"caf\u{e9}\"},\"done\":false}\n".as_bytes();
        // split inside the two-byte é
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let stream = ChatChunkStream::new(futures::stream::iter(byte_chunks(&[
            &line[..split],
            &line[split..],
        ])));
        let text = collect_fragments(stream.boxed()).await.unwrap();
        assert_eq!(text, "caf\u{e9}");
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let stream = ChatChunkStream::new(futures::stream::iter(byte_chunks(&[
            b"{\"message\":{\"content\":\"tail\"},\"done\":true}",
        ])));
        let fragments: Vec<_> = stream.collect().await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_ref().unwrap(), "tail");
    }

    #[tokio::test]
    async fn test_error_line_surfaces_as_backend_error() {
        let mut stream = ChatChunkStream::new(futures::stream::iter(byte_chunks(&[
            b"{\"error\":\"model 'mistral' not found\"}\n",
        ])));
        assert!(matches!(
            stream.next().await,
            Some(Err(CompletionError::Backend(msg))) if msg.contains("not found")
        ));
    }

    #[tokio::test]
    async fn test_garbage_line_is_error() {
        let mut stream =
            ChatChunkStream::new(futures::stream::iter(byte_chunks(&[b"not json\n"])));
        assert!(matches!(stream.next().await, Some(Err(CompletionError::Backend(_)))));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn fake_chat(Json(body): Json<Value>) -> String {
        assert_eq!(body["messages"][0]["role"], "system");
        let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
        if body["stream"] == true {
            format!(
                "{}\n{}\n",
                json!({"message": {"content": format!("echo: {prompt}")}, "done": false}),
                json!({"message": {"content": ""}, "done": true}),
            )
        } else {
            json!({"message": {"content": format!("whole: {prompt}")}, "done": true}).to_string()
        }
    }

    fn fake_ollama() -> Router {
        Router::new()
            .route("/api/chat", post(fake_chat))
            .route("/api/version", get(|| async { Json(json!({"version": "0.1.32"})) }))
    }

    #[tokio::test]
    async fn test_streaming_request_against_local_server() {
        let base = serve(fake_ollama()).await;
        let backend = OllamaBackend::new(format!("{base}/"), "mistral", true).unwrap();
        let text = collect_fragments(backend.stream("hi").await.unwrap()).await.unwrap();
        assert_eq!(text, "echo: hi");
    }

    #[tokio::test]
    async fn test_non_streaming_request_against_local_server() {
        let base = serve(fake_ollama()).await;
        let backend = OllamaBackend::new(base, "mistral", false).unwrap();
        let text = collect_fragments(backend.stream("hi").await.unwrap()).await.unwrap();
        assert_eq!(text, "whole: hi");
    }

    #[tokio::test]
    async fn test_ping_reads_version() {
        let base = serve(fake_ollama()).await;
        let backend = OllamaBackend::new(base, "mistral", true).unwrap();
        assert_eq!(backend.ping().await.unwrap(), "0.1.32");
    }

    #[tokio::test]
    async fn test_http_error_is_backend_error() {
        let base = serve(Router::new()).await;
        let backend = OllamaBackend::new(base, "mistral", true).unwrap();
        assert!(matches!(
            backend.stream("hi").await,
            Err(CompletionError::Backend(msg)) if msg.contains("404")
        ));
    }
}
