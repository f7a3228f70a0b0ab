//! Whole-game analysis endpoint.

use axum::{extract::State, Json};
use chess_analysis::{GameReplayer, GameReport, PgnError, ReplayError};
use serde::Deserialize;

use crate::error::{ApiError, JsonBody};
use crate::AppState;

/// Request body for game analysis.
#[derive(Debug, Deserialize)]
pub struct PgnRequest {
    /// The game in PGN notation.
    #[serde(default)]
    pub pgn: String,
}

/// POST /api/analyze_pgn
///
/// Replays the game, evaluating every position and commenting on a sample.
///
/// # Errors
/// * 400 Bad Request - the record does not parse or has no moves
/// * 500 Internal Server Error - anything else
pub async fn analyze_pgn(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PgnRequest>,
) -> Result<Json<GameReport>, ApiError> {
    let replayer = GameReplayer::new(&state.evaluator, &state.commentator, state.replay);

    match replayer.replay(&request.pgn).await {
        Ok(report) => Ok(Json(report)),
        Err(ReplayError::InvalidRecord(PgnError::Io(e))) => Err(ApiError::Upstream(format!(
            "Error in analyze_pgn: {}",
            e
        ))),
        Err(ReplayError::InvalidRecord(e)) => {
            tracing::info!(error = %e, "Rejected PGN");
            Err(ApiError::InvalidRecord)
        }
    }
}
