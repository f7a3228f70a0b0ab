//! Free-form questions about a position.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, JsonBody};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub fen: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub previous_moves: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// POST /api/chat_analysis
///
/// # Errors
/// * 400 Bad Request - `fen` or `question` is empty
/// * 500 Internal Server Error - commentary unavailable or failed
pub async fn chat_analysis(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let fen = request.fen.trim();
    let question = request.question.trim();
    if fen.is_empty() || question.is_empty() {
        return Err(ApiError::MissingField("FEN position and question required"));
    }

    let response = state
        .commentator
        .answer(fen, question, &request.previous_moves)
        .await?;
    Ok(Json(ChatResponse { response }))
}
