//! Analysis Server Library
//!
//! HTTP relay that accepts a chess game (PGN) or position (FEN), forwards
//! positions to a UCI engine and a language-model commentator, and returns
//! the combined output as JSON.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chess_analysis::{Commentator, EvaluatorHandle, ReplayConfig};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The deterministic evaluator, or why it is missing.
    pub evaluator: Arc<EvaluatorHandle>,
    /// The commentary generator, or why it is missing.
    pub commentator: Arc<Commentator>,
    /// Sampling settings for whole-game analysis.
    pub replay: ReplayConfig,
}

/// Health check endpoint.
///
/// Returns "ok" to indicate the server is running.
async fn health() -> &'static str {
    "ok"
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    // CORS layer for cross-origin requests
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/health", get(health))
        .route("/api/analyze_pgn", post(api::game::analyze_pgn))
        .route("/api/analyze_position", post(api::position::analyze_position))
        .route("/api/get_stockfish_move", post(api::position::get_stockfish_move))
        .route("/api/get_move_analysis", post(api::position::get_move_analysis))
        .route("/api/chat_analysis", post(api::chat::chat_analysis))
        .route("/api/test_gemini", get(api::probe::test_gemini))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn(middleware::timing_layer))
        .layer(cors)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(details = %details, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
