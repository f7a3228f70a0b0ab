//! API handlers for the analysis server.

pub mod chat;
pub mod game;
pub mod position;
pub mod probe;

#[cfg(test)]
pub(crate) mod testing;

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};

use crate::error::ApiError;

/// Checks that `fen` is present and describes a legal position, returning
/// it trimmed.
pub(crate) fn require_fen(fen: &str) -> Result<String, ApiError> {
    let fen = fen.trim();
    if fen.is_empty() {
        return Err(ApiError::MissingField("FEN position required"));
    }
    let parsed: Fen = fen
        .parse()
        .map_err(|e| ApiError::InvalidPosition(format!("{}", e)))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| ApiError::InvalidPosition(format!("{}", e)))?;
    Ok(fen.to_string())
}
