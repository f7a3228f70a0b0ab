//! In-process collaborators for handler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chess_analysis::{
    Commentator, CommentaryError, CommentaryGenerator, EngineError, Evaluation, Evaluator,
    EvaluatorHandle, PositionAnalysis, ReplayConfig,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::{router, AppState};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Default)]
pub struct FakeEvaluator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Evaluator for FakeEvaluator {
    async fn evaluate(&self, _fen: &str) -> Result<PositionAnalysis, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PositionAnalysis {
            best_move: Some("g1f3".to_string()),
            evaluation: Evaluation::Centipawns(31),
            depth: 15,
            nodes: 42_000,
            pv: vec!["g1f3".to_string(), "d7d5".to_string()],
        })
    }
}

#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl CommentaryGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, CommentaryError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(CommentaryError::Api {
                status: 503,
                body: "overloaded".to_string(),
            });
        }
        Ok("White is pressing.".to_string())
    }
}

/// A router wired to fakes, plus handles to inspect them.
pub struct TestApp {
    pub router: Router,
    pub evaluator: Arc<FakeEvaluator>,
    pub generator: Arc<FakeGenerator>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_generator(FakeGenerator::default())
    }

    pub fn with_generator(generator: FakeGenerator) -> Self {
        let evaluator = Arc::new(FakeEvaluator::default());
        let generator = Arc::new(generator);
        let state = AppState {
            evaluator: Arc::new(EvaluatorHandle::ready(evaluator.clone())),
            commentator: Arc::new(Commentator::ready(generator.clone())),
            replay: ReplayConfig::default(),
        };
        Self {
            router: router(state),
            evaluator,
            generator,
        }
    }

    pub fn evaluator_calls(&self) -> usize {
        self.evaluator.calls.load(Ordering::SeqCst)
    }

    pub fn generator_prompts(&self) -> Vec<String> {
        self.generator.prompts.lock().unwrap().clone()
    }
}

/// A router whose collaborators are both unavailable.
pub fn unavailable_router() -> Router {
    router(AppState {
        evaluator: Arc::new(EvaluatorHandle::Unavailable {
            reason: "Stockfish not available".to_string(),
        }),
        commentator: Arc::new(Commentator::Unavailable {
            reason: "Commentary API key not configured".to_string(),
        }),
        replay: ReplayConfig::default(),
    })
}

pub async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
