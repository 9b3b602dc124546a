//! Task record storage, keyed by task id with a bounded retention window.
//!
//! Each write replaces the whole record and refreshes its retention.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;

use crate::tasks::record::TaskRecord;

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);
const REDIS_KEY_PREFIX: &str = "analysis_task:";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt task record: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn put(&self, task_id: &str, record: &TaskRecord) -> Result<(), StoreError>;

    /// `None` when the task is unknown or its retention has elapsed.
    async fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError>;
}

/// In-process store. Expired entries are dropped lazily.
pub struct MemoryTaskStore {
    retention: Duration,
    records: RwLock<HashMap<String, (TaskRecord, Instant)>>,
}

impl MemoryTaskStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn put(&self, task_id: &str, record: &TaskRecord) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut records = self.records.write().await;
        records.retain(|_, (_, expires_at)| *expires_at > now);
        records.insert(task_id.to_string(), (record.clone(), now + self.retention));
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .get(task_id)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(record, _)| record.clone()))
    }
}

/// Redis-backed store: `SET analysis_task:<id> <json> EX <retention>`.
#[derive(Clone)]
pub struct RedisTaskStore {
    conn: MultiplexedConnection,
    retention: Duration,
}

impl RedisTaskStore {
    pub async fn connect(redis_url: &str, retention: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis task store connected");
        Ok(Self { conn, retention })
    }

    fn key(task_id: &str) -> String {
        format!("{REDIS_KEY_PREFIX}{task_id}")
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn put(&self, task_id: &str, record: &TaskRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(task_id))
            .arg(payload)
            .arg("EX")
            .arg(self.retention.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(Self::key(task_id))
            .query_async(&mut conn)
            .await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
