//! Game replay with selective annotation.
//!
//! [`GameReplayer`] walks a PGN record move by move and produces one
//! [`PositionRecord`] per position (the start plus every ply). Every record
//! carries an evaluator report. Only a sample of records also get
//! commentary, because generator calls are slow and costly:
//!
//! - the initial position,
//! - every ply whose 0-based index is a multiple of the commentary interval,
//! - the final ply.
//!
//! Collaborator failures never abort a replay. A failed evaluation becomes
//! the sentinel report, and a failed commentary becomes an empty string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{PositionFlags, ReplayBoard};
use crate::commentary::Commentator;
use crate::evaluator::{EngineReport, EvaluatorHandle};
use crate::pgn::{self, GameHeaders, PgnError};

/// `move` value of the synthetic initial record.
pub const INITIAL_POSITION: &str = "Initial position";

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Invalid PGN format: {0}")]
    InvalidRecord(#[from] PgnError),
}

/// Sampling and context settings for a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReplayConfig {
    /// Comment on every n-th ply. Zero is treated as one.
    #[serde(default = "default_five")]
    pub commentary_interval: usize,
    /// How many preceding moves a record lists.
    #[serde(default = "default_five")]
    pub context_window: usize,
}

fn default_five() -> usize {
    5
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            commentary_interval: 5,
            context_window: 5,
        }
    }
}

impl ReplayConfig {
    /// Whether the ply at 0-based `index` of `total` gets commentary.
    pub fn samples(&self, index: usize, total: usize) -> bool {
        let interval = self.commentary_interval.max(1);
        index % interval == 0 || index + 1 == total
    }
}

/// Who made the move that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
    /// The initial record, before any move.
    Start,
}

impl Side {
    fn of_ply(index: usize) -> Self {
        if index % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
            Side::Start => "Start",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analyzed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub move_number: usize,
    #[serde(rename = "move_color")]
    pub side: Side,
    /// UCI notation of the move just played, or [`INITIAL_POSITION`].
    #[serde(rename = "move")]
    pub uci: String,
    /// The move as written in the record; empty for the initial position.
    pub san: String,
    pub fen: String,
    #[serde(rename = "stockfish")]
    pub engine: EngineReport,
    #[serde(rename = "gemini")]
    pub commentary: String,
    pub previous_moves: String,
    #[serde(flatten)]
    pub flags: PositionFlags,
    #[serde(rename = "position_number")]
    pub sequence_index: usize,
}

/// Header fields and counts for a replayed game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub event: String,
    pub date: String,
    pub white: String,
    pub black: String,
    pub result: String,
    /// Number of plies.
    pub total_moves: usize,
    /// Number of records, always `total_moves + 1`.
    pub total_positions: usize,
}

impl GameSummary {
    fn new(headers: GameHeaders, total_moves: usize) -> Self {
        // Only a missing tag falls back; an explicit empty value is kept.
        fn or(value: Option<String>, default: &str) -> String {
            value.unwrap_or_else(|| default.to_string())
        }

        Self {
            event: or(headers.event, "Unknown Event"),
            date: or(headers.date, "Unknown Date"),
            white: or(headers.white, "Unknown White"),
            black: or(headers.black, "Unknown Black"),
            result: or(headers.result, "*"),
            total_moves,
            total_positions: total_moves + 1,
        }
    }
}

/// The full result of one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    #[serde(rename = "game_info")]
    pub summary: GameSummary,
    #[serde(rename = "analysis")]
    pub positions: Vec<PositionRecord>,
}

/// Replays games against an evaluator and a commentator.
pub struct GameReplayer<'a> {
    evaluator: &'a EvaluatorHandle,
    commentator: &'a Commentator,
    config: ReplayConfig,
}

impl<'a> GameReplayer<'a> {
    pub fn new(
        evaluator: &'a EvaluatorHandle,
        commentator: &'a Commentator,
        config: ReplayConfig,
    ) -> Self {
        Self {
            evaluator,
            commentator,
            config,
        }
    }

    /// Replays the first game in `pgn`.
    ///
    /// Fails only if the record cannot be parsed; the whole record is
    /// validated before any collaborator is called.
    pub async fn replay(&self, pgn: &str) -> Result<GameReport, ReplayError> {
        let game = pgn::parse_game(pgn)?;
        let total = game.moves.len();
        let mut board = ReplayBoard::new(game.start);
        let mut positions = Vec::with_capacity(total + 1);

        let fen = board.fen();
        positions.push(PositionRecord {
            move_number: 0,
            side: Side::Start,
            uci: INITIAL_POSITION.to_string(),
            san: String::new(),
            engine: self.evaluator.report(&fen).await,
            commentary: self.annotate(&fen, INITIAL_POSITION).await,
            fen,
            previous_moves: String::new(),
            flags: board.flags(),
            sequence_index: 0,
        });

        for (index, played) in game.moves.into_iter().enumerate() {
            let uci = board.play(played.mv);
            let move_number = index / 2 + 1;
            let side = Side::of_ply(index);
            let fen = board.fen();
            let previous_moves = board.recent_moves(self.config.context_window);

            let engine = self.evaluator.report(&fen).await;
            let commentary = if self.config.samples(index, total) {
                let context = format!("Move {} ({}): {}", move_number, side, previous_moves);
                self.annotate(&fen, &context).await
            } else {
                String::new()
            };

            tracing::debug!(
                ply = index + 1,
                san = %played.san,
                uci = %uci,
                commented = !commentary.is_empty(),
                "Analyzed position"
            );

            positions.push(PositionRecord {
                move_number,
                side,
                uci,
                san: played.san,
                fen,
                engine,
                commentary,
                previous_moves,
                flags: board.flags(),
                sequence_index: index + 1,
            });
        }

        let summary = GameSummary::new(game.headers, total);
        tracing::info!(
            white = %summary.white,
            black = %summary.black,
            plies = total,
            commented = positions.iter().filter(|p| !p.commentary.is_empty()).count(),
            "Game replay complete"
        );

        Ok(GameReport { summary, positions })
    }

    async fn annotate(&self, fen: &str, context: &str) -> String {
        match self.commentator.comment(fen, context).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(fen, error = %e, "Commentary failed, leaving position unannotated");
                String::new()
            }
        }
    }
}
