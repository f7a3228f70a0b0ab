//! The deterministic evaluator capability and its degraded-mode handling.
//!
//! [`Evaluator`] is the seam the replayer and the HTTP handlers talk to.
//! [`StockfishEvaluator`] implements it over a small pool of [`UciEngine`]
//! sessions. [`EvaluatorHandle`] makes "no evaluator" an explicit state, and
//! [`EngineReport`] is the wire shape every caller gets back, real or
//! sentinel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::engine::{EngineError, PositionAnalysis, UciEngine};
use crate::Evaluation;

/// Best move reported alongside the sentinel evaluation.
pub const FALLBACK_BEST_MOVE: &str = "e2e4";

/// Configuration for the UCI evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Path to (or name of) the UCI engine executable.
    #[serde(default = "default_engine_path")]
    pub path: String,
    /// Fixed search depth for every evaluation.
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Maximum number of engine processes searching at once.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Upper bound on a single search. Unset means no limit.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_engine_path() -> String {
    if cfg!(windows) {
        "stockfish\\stockfish.exe".to_string()
    } else {
        "stockfish".to_string()
    }
}

fn default_depth() -> u32 {
    15
}

fn default_pool_size() -> usize {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            depth: default_depth(),
            pool_size: default_pool_size(),
            timeout_secs: None,
        }
    }
}

/// Request/response access to a deterministic evaluator.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluates the position given as FEN.
    async fn evaluate(&self, fen: &str) -> Result<PositionAnalysis, EngineError>;
}

/// [`Evaluator`] backed by a pool of UCI engine processes.
///
/// Each call checks a session out of the pool (spawning one if none is
/// idle) and owns it until the search finishes. A session goes back to the
/// pool only after a complete answer. Failed, timed-out and cancelled calls
/// drop their session, which kills the process, so a half-finished search
/// can never leak into a later call.
pub struct StockfishEvaluator {
    config: EngineConfig,
    permits: Semaphore,
    idle: Mutex<Vec<UciEngine>>,
}

impl StockfishEvaluator {
    /// Spawns the first engine session and completes the UCI handshake.
    pub async fn start(config: EngineConfig) -> Result<Self, EngineError> {
        let engine = UciEngine::spawn(&config.path).await?;
        let pool_size = config.pool_size.clamp(1, Semaphore::MAX_PERMITS);
        tracing::info!(
            engine = engine.name(),
            depth = config.depth,
            pool_size,
            "Evaluator engine ready"
        );
        Ok(Self {
            config,
            permits: Semaphore::new(pool_size),
            idle: Mutex::new(vec![engine]),
        })
    }

    fn checkout(&self) -> Option<UciEngine> {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    fn checkin(&self, engine: UciEngine) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(engine);
    }

    #[cfg(test)]
    fn idle_sessions(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Evaluator for StockfishEvaluator {
    async fn evaluate(&self, fen: &str) -> Result<PositionAnalysis, EngineError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EngineError::InvalidResponse("Evaluator pool closed".to_string()))?;

        let mut engine = match self.checkout() {
            Some(engine) => engine,
            None => {
                tracing::debug!(path = %self.config.path, "Spawning evaluator engine");
                UciEngine::spawn(&self.config.path).await?
            }
        };

        let search = engine.analyze_fen(fen, self.config.depth);
        let analysis = match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), search)
                .await
                .map_err(|_| EngineError::Timeout(secs))?,
            None => search.await,
        }?;

        tracing::debug!(
            fen,
            depth = analysis.depth,
            nodes = analysis.nodes,
            pv = %analysis.pv.join(" "),
            "Position evaluated"
        );
        self.checkin(engine);
        Ok(analysis)
    }
}

/// The evaluator as the rest of the system sees it: either ready, or
/// unavailable with the reason it could not be started.
#[derive(Clone)]
pub enum EvaluatorHandle {
    /// A working evaluator.
    Ready(Arc<dyn Evaluator>),
    /// No evaluator; every report degrades to the sentinel.
    Unavailable {
        /// Why the evaluator is missing.
        reason: String,
    },
}

impl EvaluatorHandle {
    /// Starts a [`StockfishEvaluator`], falling back to `Unavailable` when
    /// the engine cannot be launched.
    pub async fn connect(config: EngineConfig) -> Self {
        let path = config.path.clone();
        match StockfishEvaluator::start(config).await {
            Ok(evaluator) => EvaluatorHandle::Ready(Arc::new(evaluator)),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Evaluator unavailable, using fallback evaluations");
                EvaluatorHandle::Unavailable {
                    reason: format!("Stockfish not available: {}", e),
                }
            }
        }
    }

    /// Wraps an already-built evaluator.
    pub fn ready(evaluator: Arc<dyn Evaluator>) -> Self {
        EvaluatorHandle::Ready(evaluator)
    }

    /// Returns true when an evaluator is configured.
    pub fn is_available(&self) -> bool {
        matches!(self, EvaluatorHandle::Ready(_))
    }

    /// Evaluates the position, surfacing any failure to the caller.
    pub async fn evaluate(&self, fen: &str) -> Result<PositionAnalysis, EvaluatorFailure> {
        match self {
            EvaluatorHandle::Ready(evaluator) => evaluator
                .evaluate(fen)
                .await
                .map_err(EvaluatorFailure::Engine),
            EvaluatorHandle::Unavailable { reason } => {
                Err(EvaluatorFailure::Unavailable(reason.clone()))
            }
        }
    }

    /// Evaluates the position and folds any failure into the sentinel
    /// report. Never fails.
    pub async fn report(&self, fen: &str) -> EngineReport {
        match self.evaluate(fen).await {
            Ok(analysis) => EngineReport::from(analysis),
            Err(failure) => {
                if let EvaluatorFailure::Engine(e) = &failure {
                    tracing::warn!(fen, error = %e, "Evaluator call failed, using fallback");
                }
                EngineReport::fallback(failure.to_string())
            }
        }
    }
}

/// Why an evaluation could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorFailure {
    /// The evaluator was never started.
    #[error("{0}")]
    Unavailable(String),
    /// The engine failed during this call.
    #[error(transparent)]
    Engine(EngineError),
}

/// Engine output for one position, as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineReport {
    /// Evaluation from White's point of view.
    pub evaluation: Evaluation,
    /// Best move in UCI notation; `null` when there is no legal move.
    pub best_move: Option<String>,
    /// Present only on sentinel reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EngineReport {
    /// The sentinel report: even score, a fixed opening move, and a note.
    pub fn fallback(note: impl Into<String>) -> Self {
        Self {
            evaluation: Evaluation::even(),
            best_move: Some(FALLBACK_BEST_MOVE.to_string()),
            error: Some(note.into()),
        }
    }

    /// Returns true if this report is the sentinel rather than engine output.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

impl From<PositionAnalysis> for EngineReport {
    fn from(analysis: PositionAnalysis) -> Self {
        Self {
            evaluation: analysis.evaluation,
            best_move: analysis.best_move,
            error: None,
        }
    }
}
