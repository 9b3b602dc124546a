//! Analysis task orchestrator.
//!
//! `submit` validates the request, stores a record and hands the work to a
//! background worker; `poll` reads the latest record. Worker slots are bounded
//! by a semaphore, each task runs under a wall-clock watchdog, and unclassified
//! failures are retried with exponential backoff.

pub mod handlers;
pub mod record;
pub mod store;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analysis::analyzer::ResumeAnalyzer;
use crate::analysis::rewrite::rewrite_or_original;
use crate::llm_client::CompletionError;
use crate::tasks::record::{
    AnalysisOutcome, TaskError, TaskErrorKind, TaskRecord, TaskStatus, PROGRESS_TOTAL,
};
use crate::tasks::store::{StoreError, TaskStore};
use crate::tasks::validation::validate_analysis_input;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Watchdog budget, measured from the moment a worker picks the task up.
    pub max_runtime: Duration,
    /// Retries of the whole analysis step after the first attempt.
    pub max_retries: u32,
    /// Delay before retry `n` is `retry_base_delay × 2^(n-1)`.
    pub retry_base_delay: Duration,
    pub worker_slots: usize,
    pub rewrite_resume: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_runtime: Duration::from_secs(600),
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
            worker_slots: 2,
            rewrite_resume: true,
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn TaskStore>,
    analyzer: Arc<dyn ResumeAnalyzer>,
    slots: Arc<Semaphore>,
    settings: Arc<OrchestratorSettings>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        analyzer: Arc<dyn ResumeAnalyzer>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            analyzer,
            slots: Arc::new(Semaphore::new(settings.worker_slots.max(1))),
            settings: Arc::new(settings),
        }
    }

    /// Accepts a request and returns its task id without waiting for the analysis.
    ///
    /// Invalid input is recorded as `Failure(Validation)` before this returns.
    pub async fn submit(&self, resume_text: &str, job_description: &str) -> Result<String, StoreError> {
        let task_id = Uuid::new_v4().to_string();

        let validation = validate_analysis_input(resume_text, job_description);
        if !validation.passed {
            info!(
                "Task {} rejected: {} validation violation(s)",
                task_id,
                validation.violations.len()
            );
            let record = TaskRecord::Failure {
                error: TaskError::new(TaskErrorKind::Validation, validation.message()),
            };
            self.store.put(&task_id, &record).await?;
            return Ok(task_id);
        }

        self.store.put(&task_id, &TaskRecord::Pending).await?;
        info!("Task {} accepted", task_id);

        let this = self.clone();
        let id = task_id.clone();
        let resume_text = resume_text.to_string();
        let job_description = job_description.to_string();
        tokio::spawn(async move {
            this.run_task(id, resume_text, job_description).await;
        });

        Ok(task_id)
    }

    /// Latest snapshot, or `None` for unknown or expired tasks.
    pub async fn poll(&self, task_id: &str) -> Result<Option<TaskStatus>, StoreError> {
        Ok(self
            .store
            .get(task_id)
            .await?
            .map(|record| TaskStatus::from_record(task_id, record)))
    }

    async fn run_task(self, task_id: String, resume_text: String, job_description: String) {
        let _permit = match self.slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!("Task {} dropped: worker pool closed", task_id);
                return;
            }
        };

        let writer = TaskWriter::new(self.store.clone(), task_id.clone(), TaskRecord::Pending);
        writer.progress(0).await;

        let max_runtime = self.settings.max_runtime;
        let step_writer = writer.clone();
        let mut worker = tokio::spawn(async move {
            self.run_with_retries(&step_writer, &resume_text, &job_description)
                .await
        });

        let terminal = match tokio::time::timeout(max_runtime, &mut worker).await {
            Ok(Ok(Ok(outcome))) => TaskRecord::Success { outcome },
            Ok(Ok(Err(error))) => TaskRecord::Failure { error },
            Ok(Err(join_error)) => {
                error!("Task {} worker crashed: {}", task_id, join_error);
                TaskRecord::Failure {
                    error: TaskError::new(TaskErrorKind::Unknown, "The analysis worker stopped unexpectedly"),
                }
            }
            Err(_) => {
                worker.abort();
                warn!(
                    "Task {} exceeded its {}s budget and was terminated",
                    task_id,
                    max_runtime.as_secs()
                );
                TaskRecord::Failure {
                    error: TaskError::new(
                        TaskErrorKind::Timeout,
                        format!(
                            "The analysis took longer than {} seconds and was stopped",
                            max_runtime.as_secs()
                        ),
                    ),
                }
            }
        };

        match &terminal {
            TaskRecord::Success { outcome } if outcome.result.is_placeholder() => {
                warn!("Task {} succeeded with a placeholder analysis", task_id)
            }
            TaskRecord::Success { .. } => info!("Task {} succeeded", task_id),
            TaskRecord::Failure { error } => warn!("Task {} failed: {}", task_id, error),
            _ => {}
        }
        writer.advance(terminal).await;
    }

    async fn run_with_retries(
        &self,
        writer: &TaskWriter,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisOutcome, TaskError> {
        let attempts = self.settings.max_retries + 1;
        let mut attempt = 1;

        loop {
            match self.run_step(writer, resume_text, job_description).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = retry_delay(self.settings.retry_base_delay, attempt);
                    warn!(
                        "Task {} attempt {}/{} failed ({}), retrying in {}ms",
                        writer.task_id,
                        attempt,
                        attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_step(
        &self,
        writer: &TaskWriter,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisOutcome, TaskError> {
        let result = self
            .analyzer
            .analyze(resume_text, job_description)
            .await
            .map_err(classify_completion_error)?;
        writer.progress(50).await;

        result.check_complete().map_err(|problems| {
            TaskError::new(
                TaskErrorKind::AnalysisFormat,
                format!("The analysis was incomplete: {}", problems.join("; ")),
            )
        })?;
        writer.progress(90).await;

        let rewritten_resume = self
            .settings
            .rewrite_resume
            .then(|| rewrite_or_original(resume_text, &result));

        Ok(AnalysisOutcome {
            result,
            original_resume: resume_text.to_string(),
            rewritten_resume,
        })
    }
}

/// Delay before retry `n`: `base × 2^(n-1)`, saturating instead of overflowing.
fn retry_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
}

fn classify_completion_error(e: CompletionError) -> TaskError {
    let kind = match e {
        CompletionError::Timeout { .. } => TaskErrorKind::Timeout,
        CompletionError::Malformed(_) => TaskErrorKind::AnalysisFormat,
        CompletionError::Empty | CompletionError::Backend(_) => TaskErrorKind::Unknown,
    };
    TaskError::new(kind, e.to_string())
}

/// Sole writer of one task's record. Writes that would move the record
/// backwards are dropped, so pollers never see progress regress.
#[derive(Clone)]
struct TaskWriter {
    store: Arc<dyn TaskStore>,
    task_id: String,
    current: Arc<Mutex<TaskRecord>>,
}

impl TaskWriter {
    fn new(store: Arc<dyn TaskStore>, task_id: String, initial: TaskRecord) -> Self {
        Self {
            store,
            task_id,
            current: Arc::new(Mutex::new(initial)),
        }
    }

    async fn progress(&self, current: u8) {
        let started_at = match &*self.current.lock().await {
            TaskRecord::Progress { started_at, .. } => *started_at,
            _ => Utc::now(),
        };
        self.advance(TaskRecord::Progress {
            current,
            total: PROGRESS_TOTAL,
            started_at,
        })
        .await;
    }

    async fn advance(&self, next: TaskRecord) -> bool {
        let mut current = self.current.lock().await;
        if !current.can_transition_to(&next) {
            if current.is_terminal() {
                debug!(
                    "Task {} is already {:?}, dropping late {:?} write",
                    self.task_id,
                    current.state(),
                    next.state()
                );
            }
            return false;
        }
        if let Err(e) = self.store.put(&self.task_id, &next).await {
            error!("Failed to store task {} state: {}", self.task_id, e);
            return false;
        }
        *current = next;
        true
    }
}
