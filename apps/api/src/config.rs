use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::ollama::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
use crate::llm_client::RetryPolicy;
use crate::tasks::OrchestratorSettings;

/// Application configuration loaded from environment variables.
/// Every variable is optional; startup fails only on values that do not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_stream: bool,
    pub completion_timeout_secs: u64,
    pub completion_max_attempts: u32,
    pub completion_retry_base_ms: u64,
    pub task_max_runtime_secs: u64,
    pub task_max_retries: u32,
    pub task_retry_base_ms: u64,
    pub task_retention_secs: u64,
    pub worker_slots: usize,
    /// Unset means tasks are kept in process memory.
    pub redis_url: Option<String>,
    pub rewrite_resume: bool,
    pub heading_keywords_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            ollama_url: std::env::var("OLLAMA_URL")
                .unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: std::env::var("OLLAMA_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            ollama_stream: env_or("OLLAMA_STREAM", true)?,
            completion_timeout_secs: env_or("COMPLETION_TIMEOUT_SECS", 300)?,
            completion_max_attempts: env_or("COMPLETION_MAX_ATTEMPTS", 3)?,
            completion_retry_base_ms: env_or("COMPLETION_RETRY_BASE_MS", 1000)?,
            task_max_runtime_secs: env_or("TASK_MAX_RUNTIME_SECS", 600)?,
            task_max_retries: env_or("TASK_MAX_RETRIES", 2)?,
            task_retry_base_ms: env_or("TASK_RETRY_BASE_MS", 1000)?,
            task_retention_secs: env_or("TASK_RETENTION_SECS", 3600)?,
            worker_slots: env_or("WORKER_SLOTS", 2)?,
            redis_url: optional_env("REDIS_URL"),
            rewrite_resume: env_or("REWRITE_RESUME", true)?,
            heading_keywords_file: optional_env("HEADING_KEYWORDS_FILE").map(PathBuf::from),
        })
    }

    pub fn completion_retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.completion_max_attempts,
            base_delay: Duration::from_millis(self.completion_retry_base_ms),
            retry_transport_errors: true,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_runtime: Duration::from_secs(self.task_max_runtime_secs),
            max_retries: self.task_max_retries,
            retry_base_delay: Duration::from_millis(self.task_retry_base_ms),
            worker_slots: self.worker_slots,
            rewrite_resume: self.rewrite_resume,
        }
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.task_retention_secs)
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'"))
}
