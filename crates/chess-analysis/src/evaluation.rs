//! Chess position evaluation types.

use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Represents a chess position evaluation.
///
/// Evaluations can be either centipawn scores (for normal positions)
/// or mate scores (when a forced mate is found). Serialized as
/// `{"type": "cp", "value": 35}` or `{"type": "mate", "value": -2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Evaluation {
    /// Centipawn evaluation (positive = white advantage)
    #[serde(rename = "cp")]
    Centipawns(i32),
    /// Mate in N moves (positive = white wins, negative = black wins)
    #[serde(rename = "mate")]
    Mate(i32),
}

impl Evaluation {
    /// Builds an evaluation from the `score cp` / `score mate` fields of a
    /// UCI info line. A mate score wins over a centipawn score.
    pub fn from_uci_score(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (cp, mate) {
            (_, Some(m)) => Some(Evaluation::Mate(m)),
            (Some(c), None) => Some(Evaluation::Centipawns(c)),
            (None, None) => None,
        }
    }

    /// Negates the score, switching the point of view to the other side.
    pub fn flip(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(-cp),
            Evaluation::Mate(m) => Evaluation::Mate(-m),
        }
    }

    /// Converts a side-to-move relative score (as UCI engines report it)
    /// into one from White's point of view.
    pub fn for_white(self, side_to_move: Color) -> Self {
        match side_to_move {
            Color::White => self,
            Color::Black => self.flip(),
        }
    }

    /// The neutral evaluation used when no engine answer is available.
    pub fn even() -> Self {
        Evaluation::Centipawns(0)
    }
}
