//! Commentary generator connectivity check.

use axum::{extract::State, http::StatusCode, Json};
use chess_analysis::Commentator;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize, PartialEq)]
pub struct ProbeResponse {
    /// `"success"` or `"error"`.
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// GET /api/test_gemini
///
/// Sends a trivial prompt to the commentary generator and reports whether
/// it answered.
pub async fn test_gemini(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    let (status, body) = probe(&state.commentator).await;
    (status, Json(body))
}

/// Runs the probe, also used at startup.
pub async fn probe(commentator: &Commentator) -> (StatusCode, ProbeResponse) {
    if let Commentator::Unavailable { reason } = commentator {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            ProbeResponse {
                status: "error",
                message: format!("Commentary generator not initialized: {}", reason),
                response: None,
            },
        );
    }

    match commentator.probe().await {
        Ok(text) => (
            StatusCode::OK,
            ProbeResponse {
                status: "success",
                message: "Commentary API connection successful".to_string(),
                response: Some(text),
            },
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ProbeResponse {
                status: "error",
                message: format!("Failed to connect to commentary API: {}", e),
                response: None,
            },
        ),
    }
}
