use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::RagError;
use crate::rag::DEFAULT_N_RESULTS;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub book_id: Option<String>,
    pub n_results: Option<usize>,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<impl IntoResponse, RagError> {
    if payload.question.trim().is_empty() {
        return Err(RagError::InvalidInput("question must not be empty".to_string()));
    }

    let outcome = state
        .engine
        .query(
            &payload.question,
            payload.book_id.as_deref(),
            payload.n_results.unwrap_or(DEFAULT_N_RESULTS),
        )
        .await?;

    Ok(Json(outcome))
}
