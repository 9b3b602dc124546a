use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::models::AnalysisResult;

pub const PROGRESS_TOTAL: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Progress,
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    Validation,
    Timeout,
    AnalysisFormat,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Only unclassified failures are worth repeating.
    pub fn is_retryable(&self) -> bool {
        self.kind == TaskErrorKind::Unknown
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Success payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub original_resume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_resume: Option<String>,
}

/// Everything the store knows about one task. Replaced whole on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskRecord {
    Pending,
    Progress {
        current: u8,
        total: u8,
        started_at: DateTime<Utc>,
    },
    Success {
        outcome: AnalysisOutcome,
    },
    Failure {
        error: TaskError,
    },
}

impl TaskRecord {
    pub fn state(&self) -> TaskState {
        match self {
            TaskRecord::Pending => TaskState::Pending,
            TaskRecord::Progress { .. } => TaskState::Progress,
            TaskRecord::Success { .. } => TaskState::Success,
            TaskRecord::Failure { .. } => TaskState::Failure,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskRecord::Success { .. } | TaskRecord::Failure { .. })
    }

    /// Pending → Progress → Success, with Failure reachable from any
    /// non-terminal state. Progress only moves forward.
    pub fn can_transition_to(&self, next: &TaskRecord) -> bool {
        match (self, next) {
            (TaskRecord::Success { .. } | TaskRecord::Failure { .. }, _) => false,
            (TaskRecord::Pending, TaskRecord::Pending) => false,
            (TaskRecord::Pending, _) => true,
            (TaskRecord::Progress { current, .. }, TaskRecord::Progress { current: next, .. }) => {
                next > current
            }
            (TaskRecord::Progress { .. }, TaskRecord::Pending) => false,
            (TaskRecord::Progress { .. }, _) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressView {
    pub current: u8,
    pub total: u8,
}

/// What a poller sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_resume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_resume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskStatus {
    pub fn from_record(task_id: &str, record: TaskRecord) -> Self {
        let mut status = Self {
            task_id: task_id.to_string(),
            state: record.state(),
            progress: None,
            result: None,
            original_resume: None,
            rewritten_resume: None,
            error: None,
        };

        match record {
            TaskRecord::Pending => {}
            TaskRecord::Progress { current, total, .. } => {
                status.progress = Some(ProgressView { current, total });
            }
            TaskRecord::Success { outcome } => {
                status.progress = Some(ProgressView {
                    current: PROGRESS_TOTAL,
                    total: PROGRESS_TOTAL,
                });
                status.result = Some(outcome.result);
                status.original_resume = Some(outcome.original_resume);
                status.rewritten_resume = outcome.rewritten_resume;
            }
            TaskRecord::Failure { error } => status.error = Some(error),
        }
        status
    }
}
