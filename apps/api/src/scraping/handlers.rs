use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::scraping::extractor::ExtractionResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExtractionRequest {
    pub url: String,
}

/// POST /api/v1/jobs/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractionRequest>,
) -> Result<Json<ExtractionResult>, AppError> {
    let result = state.scraper.scrape(&req.url).await?;
    Ok(Json(result))
}
