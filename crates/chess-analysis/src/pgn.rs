//! PGN parsing: headers plus the legal mainline of the first game.

use std::io;
use std::ops::ControlFlow;

use pgn_reader::{Nag, Outcome, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Move, Position};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgnError {
    #[error("Failed to read PGN: {0}")]
    Io(#[from] io::Error),
    #[error("No game found")]
    NoGame,
    #[error("Game has no moves")]
    NoMoves,
    #[error("Illegal move at ply {ply}: {san}")]
    IllegalMove { ply: usize, san: String },
    #[error("Invalid FEN setup: {0}")]
    InvalidSetup(String),
}

/// The seven-tag-roster fields the replayer reports, plus the setup FEN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameHeaders {
    pub event: Option<String>,
    pub date: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub fen: Option<String>,
}

impl GameHeaders {
    fn set(&mut self, key: &[u8], value: String) {
        let slot = match key {
            b"Event" => &mut self.event,
            b"Date" => &mut self.date,
            b"White" => &mut self.white,
            b"Black" => &mut self.black,
            b"Result" => &mut self.result,
            b"FEN" => &mut self.fen,
            _ => return,
        };
        // First occurrence wins.
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}

/// One mainline move as written and as resolved on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    pub san: String,
    pub mv: Move,
}

/// A parsed game whose moves are known to be legal from `start`.
#[derive(Debug, Clone)]
pub struct ParsedGame {
    pub headers: GameHeaders,
    pub start: Chess,
    pub moves: Vec<PlayedMove>,
}

/// Parses the first game in `text`.
///
/// Variations, comments and NAGs are skipped. Every mainline move is
/// resolved against the running position, so an illegal or ambiguous move
/// fails the whole record.
pub fn parse_game(text: &str) -> Result<ParsedGame, PgnError> {
    if text.trim().is_empty() {
        return Err(PgnError::NoGame);
    }

    let mut reader = Reader::new(io::Cursor::new(text.as_bytes()));
    let mut visitor = GameVisitor;

    match reader.read_game(&mut visitor)? {
        Some(result) => result,
        None => Err(PgnError::NoGame),
    }
}

struct GameVisitor;

struct MovetextState {
    headers: GameHeaders,
    start: Chess,
    position: Chess,
    moves: Vec<PlayedMove>,
}

impl Visitor for GameVisitor {
    type Tags = GameHeaders;
    type Movetext = MovetextState;
    type Output = Result<ParsedGame, PgnError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(GameHeaders::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let value = String::from_utf8_lossy(value.as_bytes()).trim().to_string();
        tags.set(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let start = match tags.fen.as_deref() {
            Some(fen) => match setup_position(fen) {
                Ok(pos) => pos,
                Err(e) => return ControlFlow::Break(Err(e)),
            },
            None => Chess::default(),
        };

        ControlFlow::Continue(MovetextState {
            headers: tags,
            position: start.clone(),
            start,
            moves: Vec::new(),
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        let ply = movetext.moves.len() + 1;
        match san_plus.san.to_move(&movetext.position) {
            Ok(mv) => {
                movetext.position.play_unchecked(mv.clone());
                movetext.moves.push(PlayedMove {
                    san: san_plus.to_string(),
                    mv,
                });
                ControlFlow::Continue(())
            }
            Err(_) => ControlFlow::Break(Err(PgnError::IllegalMove {
                ply,
                san: san_plus.to_string(),
            })),
        }
    }

    fn nag(&mut self, _: &mut Self::Movetext, _: Nag) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn comment(&mut self, _: &mut Self::Movetext, _: RawComment<'_>) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        _: &mut Self::Movetext,
        _: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn outcome(&mut self, movetext: &mut Self::Movetext, outcome: Outcome) -> ControlFlow<Self::Output> {
        if movetext.headers.result.is_none() {
            movetext.headers.result = Some(outcome.to_string());
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        if movetext.moves.is_empty() {
            return Err(PgnError::NoMoves);
        }
        Ok(ParsedGame {
            headers: movetext.headers,
            start: movetext.start,
            moves: movetext.moves,
        })
    }
}

fn setup_position(fen: &str) -> Result<Chess, PgnError> {
    let fen: Fen = fen
        .parse()
        .map_err(|e| PgnError::InvalidSetup(format!("{}", e)))?;
    fen.into_position(CastlingMode::Standard)
        .map_err(|e| PgnError::InvalidSetup(format!("{}", e)))
}
