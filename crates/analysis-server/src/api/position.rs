//! Single-position endpoints.

use axum::{extract::State, Json};
use chess_analysis::EngineReport;
use serde::{Deserialize, Serialize};

use super::require_fen;
use crate::error::{ApiError, JsonBody};
use crate::AppState;

/// Request body carrying just a position.
#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    #[serde(default)]
    pub fen: String,
}

/// Engine report and commentary for one position.
#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub fen: String,
    pub stockfish: EngineReport,
    pub gemini: String,
}

/// POST /api/analyze_position
///
/// # Errors
/// * 400 Bad Request - `fen` is empty or invalid
/// * 500 Internal Server Error - commentary unavailable or failed
pub async fn analyze_position(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PositionRequest>,
) -> Result<Json<PositionResponse>, ApiError> {
    let fen = require_fen(&request.fen)?;

    let stockfish = state.evaluator.report(&fen).await;
    let gemini = state.commentator.comment(&fen, "").await?;

    Ok(Json(PositionResponse {
        fen,
        stockfish,
        gemini,
    }))
}

#[derive(Debug, Serialize)]
pub struct BestMoveResponse {
    /// `null` when the side to move has no legal move.
    pub best_move: Option<String>,
}

/// POST /api/get_stockfish_move
///
/// Unlike the analysis endpoints this never answers with the fallback move.
///
/// # Errors
/// * 400 Bad Request - `fen` is empty or invalid
/// * 500 Internal Server Error - evaluator unavailable or failed
pub async fn get_stockfish_move(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PositionRequest>,
) -> Result<Json<BestMoveResponse>, ApiError> {
    let fen = require_fen(&request.fen)?;
    let analysis = state.evaluator.evaluate(&fen).await?;
    Ok(Json(BestMoveResponse {
        best_move: analysis.best_move,
    }))
}

/// Request body for a single move of a game being browsed.
#[derive(Debug, Deserialize)]
pub struct MoveAnalysisRequest {
    #[serde(default)]
    pub fen: String,
    #[serde(default)]
    pub move_number: u32,
    #[serde(default)]
    pub move_color: String,
    #[serde(default)]
    pub previous_moves: String,
}

#[derive(Debug, Serialize)]
pub struct MoveAnalysisResponse {
    pub move_number: u32,
    pub move_color: String,
    pub fen: String,
    pub stockfish: EngineReport,
    pub gemini: String,
    pub previous_moves: String,
}

/// POST /api/get_move_analysis
///
/// # Errors
/// * 400 Bad Request - `fen` is empty or invalid
/// * 500 Internal Server Error - commentary unavailable or failed
pub async fn get_move_analysis(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<MoveAnalysisRequest>,
) -> Result<Json<MoveAnalysisResponse>, ApiError> {
    let fen = require_fen(&request.fen)?;

    let stockfish = state.evaluator.report(&fen).await;
    let context = move_context(request.move_number, &request.move_color, &request.previous_moves);
    let gemini = state.commentator.comment(&fen, &context).await?;

    Ok(Json(MoveAnalysisResponse {
        move_number: request.move_number,
        move_color: request.move_color,
        fen,
        stockfish,
        gemini,
        previous_moves: request.previous_moves,
    }))
}

fn move_context(move_number: u32, move_color: &str, previous_moves: &str) -> String {
    let mut context = format!("Move {} ({})", move_number, move_color);
    if !previous_moves.is_empty() {
        context.push_str(&format!("\nPrevious moves: {}", previous_moves));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{post_json, unavailable_router, FakeGenerator, TestApp, START_FEN};
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_move_context() {
        assert_eq!(move_context(3, "Black", ""), "Move 3 (Black)");
        assert_eq!(
            move_context(3, "Black", "e2e4 e7e5"),
            "Move 3 (Black)\nPrevious moves: e2e4 e7e5"
        );
    }

    #[tokio::test]
    async fn test_analyze_position() {
        let app = TestApp::new();
        let (status, body) =
            post_json(&app.router, "/api/analyze_position", json!({ "fen": START_FEN })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fen"], START_FEN);
        assert_eq!(body["stockfish"]["best_move"], "g1f3");
        assert_eq!(body["stockfish"]["evaluation"], json!({ "type": "cp", "value": 31 }));
        assert!(body["stockfish"].get("error").is_none());
        assert_eq!(body["gemini"], "White is pressing.");
    }

    #[tokio::test]
    async fn test_empty_fen_calls_nothing() {
        let app = TestApp::new();
        let (status, body) =
            post_json(&app.router, "/api/analyze_position", json!({ "fen": "" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "FEN position required" }));
        assert_eq!(app.evaluator_calls(), 0);
        assert!(app.generator_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_fen_is_rejected() {
        let app = TestApp::new();
        let (status, body) =
            post_json(&app.router, "/api/analyze_position", json!({ "fen": "garbage" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid FEN"));
        assert_eq!(app.evaluator_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_json_body_is_bad_request() {
        let app = TestApp::new();
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/analyze_position")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let response = tower::ServiceExt::oneshot(app.router.clone(), request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_commentary_failure_is_server_error() {
        let app = TestApp::with_generator(FakeGenerator {
            fail: true,
            ..FakeGenerator::default()
        });
        let (status, body) =
            post_json(&app.router, "/api/analyze_position", json!({ "fen": START_FEN })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_analyze_position_without_commentator() {
        let router = unavailable_router();
        let (status, body) =
            post_json(&router, "/api/analyze_position", json!({ "fen": START_FEN })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Commentary API key not configured");
    }

    #[tokio::test]
    async fn test_get_stockfish_move() {
        let app = TestApp::new();
        let (status, body) =
            post_json(&app.router, "/api/get_stockfish_move", json!({ "fen": START_FEN })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "best_move": "g1f3" }));
        assert!(app.generator_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_get_stockfish_move_without_evaluator() {
        let router = unavailable_router();
        let (status, body) =
            post_json(&router, "/api/get_stockfish_move", json!({ "fen": START_FEN })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Stockfish not available");
    }

    #[tokio::test]
    async fn test_get_move_analysis() {
        let app = TestApp::new();
        let (status, body) = post_json(
            &app.router,
            "/api/get_move_analysis",
            json!({
                "fen": START_FEN,
                "move_number": 4,
                "move_color": "White",
                "previous_moves": "g1f3 d7d5",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["move_number"], 4);
        assert_eq!(body["move_color"], "White");
        assert_eq!(body["previous_moves"], "g1f3 d7d5");
        assert_eq!(body["gemini"], "White is pressing.");

        let prompts = app.generator_prompts();
        assert!(prompts[0].contains("Move 4 (White)\nPrevious moves: g1f3 d7d5"));
    }
}
