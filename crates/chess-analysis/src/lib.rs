//! Chess game replay and position annotation.
//!
//! This crate turns a PGN record or a single FEN into analyzed positions,
//! combining a UCI engine's evaluation with prose from a language model.
//!
//! # Overview
//!
//! - [`Evaluation`] - Position evaluation (centipawn or mate score)
//! - [`UciEngine`] - Async driver for UCI engines like Stockfish
//! - [`EvaluatorHandle`] - The evaluator capability, or why it is missing
//! - [`Commentator`] - The commentary capability, or why it is missing
//! - [`GameReplayer`] - Replays a game and annotates a sample of positions
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{Commentator, CommentaryConfig, EngineConfig, EvaluatorHandle};
//! use chess_analysis::{GameReplayer, ReplayConfig};
//!
//! let evaluator = EvaluatorHandle::connect(EngineConfig::default()).await;
//! let commentator = Commentator::from_config(&CommentaryConfig::default());
//! let replayer = GameReplayer::new(&evaluator, &commentator, ReplayConfig::default());
//! let report = replayer.replay("1. e4 e5 2. Nf3 Nc6").await?;
//! println!("{} positions", report.summary.total_positions);
//! ```

pub mod board;
pub mod commentary;
pub mod engine;
pub mod evaluation;
pub mod evaluator;
pub mod pgn;
pub mod prompt;
pub mod replay;

pub use board::{PositionFlags, ReplayBoard};
pub use commentary::{
    ChatCompletionsClient, Commentator, CommentaryConfig, CommentaryError, CommentaryGenerator,
};
pub use engine::{EngineError, PositionAnalysis, UciEngine};
pub use evaluation::Evaluation;
pub use evaluator::{
    EngineConfig, EngineReport, Evaluator, EvaluatorFailure, EvaluatorHandle, StockfishEvaluator,
    FALLBACK_BEST_MOVE,
};
pub use pgn::{parse_game, GameHeaders, ParsedGame, PgnError};
pub use replay::{
    GameReplayer, GameReport, GameSummary, PositionRecord, ReplayConfig, ReplayError, Side,
    INITIAL_POSITION,
};
