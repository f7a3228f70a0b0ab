//! The board a replay runs on: current position, position history for
//! repetition detection, and the UCI notation of every move played so far.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::zobrist::Zobrist64;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position};

/// Halfmove clock value at which the seventy-five-move rule ends the game.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Number of occurrences at which a repeated position ends the game.
const FIVEFOLD: usize = 5;

/// Game-state flags for one position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionFlags {
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_insufficient_material: bool,
    pub is_game_over: bool,
}

/// A position plus everything needed to report on it after each move.
#[derive(Debug, Clone)]
pub struct ReplayBoard {
    position: Chess,
    history: Vec<Zobrist64>,
    moves: Vec<String>,
}

impl ReplayBoard {
    pub fn new(start: Chess) -> Self {
        let hash = start.zobrist_hash::<Zobrist64>(EnPassantMode::Legal);
        Self {
            position: start,
            history: vec![hash],
            moves: Vec::new(),
        }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// Plays a move already known to be legal and returns its UCI notation.
    pub fn play(&mut self, mv: Move) -> String {
        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        self.position.play_unchecked(mv);
        self.history
            .push(self.position.zobrist_hash::<Zobrist64>(EnPassantMode::Legal));
        self.moves.push(uci.clone());
        uci
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    /// Space-joined UCI notation of the last `window` moves, oldest first.
    pub fn recent_moves(&self, window: usize) -> String {
        let from = self.moves.len().saturating_sub(window);
        self.moves[from..].join(" ")
    }

    pub fn flags(&self) -> PositionFlags {
        let pos = &self.position;
        let is_checkmate = pos.is_checkmate();
        let is_stalemate = pos.is_stalemate();
        let is_insufficient_material = pos.is_insufficient_material();

        // Mate on the move that reaches the limit still counts as mate.
        let seventy_five_moves =
            pos.halfmoves() >= SEVENTY_FIVE_MOVE_PLIES && !pos.legal_moves().is_empty();

        PositionFlags {
            is_check: pos.is_check(),
            is_checkmate,
            is_stalemate,
            is_insufficient_material,
            is_game_over: is_checkmate
                || is_stalemate
                || is_insufficient_material
                || seventy_five_moves
                || self.is_fivefold_repetition(),
        }
    }

    fn is_fivefold_repetition(&self) -> bool {
        let Some(current) = self.history.last() else {
            return false;
        };
        self.history.iter().filter(|h| *h == current).count() >= FIVEFOLD
    }
}

impl Default for ReplayBoard {
    fn default() -> Self {
        Self::new(Chess::default())
    }
}
