use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::analysis::formatter::{format_suggestions_html, suggestion_lines};
use crate::errors::AppError;
use crate::state::AppState;
use crate::tasks::record::{TaskState, TaskStatus};

#[derive(Deserialize)]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Serialize)]
pub struct AnalysisAccepted {
    pub task_id: String,
    pub state: TaskState,
}

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub task_id: String,
    pub html: String,
    pub suggestions: Vec<String>,
}

/// POST /api/v1/analyses
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<(StatusCode, Json<AnalysisAccepted>), AppError> {
    let task_id = state
        .orchestrator
        .submit(&req.resume_text, &req.job_description)
        .await?;

    let status = poll_existing(&state, &task_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisAccepted {
            task_id,
            state: status.state,
        }),
    ))
}

/// GET /api/v1/analyses/:task_id
pub async fn handle_poll(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatus>, AppError> {
    Ok(Json(poll_existing(&state, &task_id).await?))
}

/// GET /api/v1/analyses/:task_id/suggestions
pub async fn handle_suggestions(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let status = poll_existing(&state, &task_id).await?;
    let result = match (status.state, status.result) {
        (TaskState::Success, Some(result)) => result,
        (other, _) => {
            return Err(AppError::UnprocessableEntity(format!(
                "Task {task_id} has no result (state {other:?})"
            )))
        }
    };

    Ok(Json(SuggestionsResponse {
        task_id,
        html: format_suggestions_html(&result),
        suggestions: suggestion_lines(&result),
    }))
}

async fn poll_existing(state: &AppState, task_id: &str) -> Result<TaskStatus, AppError> {
    state
        .orchestrator
        .poll(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))
}
