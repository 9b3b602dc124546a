pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::scraping::handlers as scraping;
use crate::state::AppState;
use crate::tasks::handlers as tasks;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job description extraction
        .route("/api/v1/jobs/extract", post(scraping::handle_extract))
        // Resume/job analysis tasks
        .route("/api/v1/analyses", post(tasks::handle_submit))
        .route("/api/v1/analyses/:task_id", get(tasks::handle_poll))
        .route(
            "/api/v1/analyses/:task_id/suggestions",
            get(tasks::handle_suggestions),
        )
        .with_state(state)
}
