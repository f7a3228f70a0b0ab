//! UCI engine driver for position analysis.

use crate::Evaluation;
use shakmaty::Color;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 1000;

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[from] std::io::Error),
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed")]
    InitFailed,
    /// Engine returned an invalid or unexpected response.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
    /// The engine did not finish its search within the configured time.
    #[error("Engine did not answer within {0}s")]
    Timeout(u64),
}

/// Result of analyzing a chess position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionAnalysis {
    /// The best move in UCI notation, `None` when the side to move has no
    /// legal move (engine answered `bestmove (none)`).
    pub best_move: Option<String>,
    /// The position evaluation from White's point of view.
    pub evaluation: Evaluation,
    /// The search depth reached.
    pub depth: u32,
    /// The number of nodes searched.
    pub nodes: u64,
    /// The principal variation (sequence of best moves).
    pub pv: Vec<String>,
}

/// One parsed `info` line of a running search.
#[derive(Debug, Clone, PartialEq)]
struct SearchInfo {
    depth: u32,
    evaluation: Evaluation,
    nodes: u64,
    pv: Vec<String>,
}

/// A live UCI session with an engine process such as Stockfish.
pub struct UciEngine {
    /// The engine process handle, killed when the session is dropped.
    process: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// The engine's name (reported via UCI id).
    name: String,
}

impl UciEngine {
    /// Spawns the engine and performs the UCI handshake.
    ///
    /// `engine_path` may be a bare program name looked up in `PATH`
    /// (`"stockfish"`) or a path to the executable.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the executable does not exist
    /// - `EngineError::SpawnError` if the engine process fails to start
    /// - `EngineError::InitFailed` if UCI initialization fails
    pub async fn spawn(engine_path: &str) -> Result<Self, EngineError> {
        let looks_like_path = engine_path.contains('/') || engine_path.contains('\\');
        if looks_like_path && !Path::new(engine_path).exists() {
            return Err(EngineError::NotFound(engine_path.to_string()));
        }

        let mut process = Command::new(engine_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::NotFound(engine_path.to_string()),
                _ => EngineError::SpawnError(e),
            })?;

        let stdin = process.stdin.take().ok_or(EngineError::InitFailed)?;
        let stdout = process.stdout.take().ok_or(EngineError::InitFailed)?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            name: String::new(),
        };
        engine.init_uci().await?;

        Ok(engine)
    }

    async fn init_uci(&mut self) -> Result<(), EngineError> {
        self.send_command("uci").await?;

        let mut name = String::new();
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed);
            }
            lines_read += 1;
            let line = self.read_line().await?;
            if let Some(id) = line.strip_prefix("id name ") {
                name = id.to_string();
            } else if line == "uciok" {
                break;
            }
        }

        self.name = if name.is_empty() {
            "Unknown Engine".to_string()
        } else {
            name
        };

        self.sync_ready().await
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Analyzes a position given in FEN notation to a fixed depth.
    ///
    /// The engine reports scores relative to the side to move; the returned
    /// evaluation is normalized to White's point of view.
    pub async fn analyze_fen(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> Result<PositionAnalysis, EngineError> {
        self.send_command(&format!("position fen {}", fen)).await?;
        self.sync_ready().await?;
        self.send_command(&format!("go depth {}", depth)).await?;

        let mut last_info: Option<SearchInfo> = None;
        let mut lines_read = 0;
        let best_move = loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InvalidResponse(
                    "Too many lines without bestmove".to_string(),
                ));
            }
            lines_read += 1;
            let line = self.read_line().await?;

            if line.starts_with("info ") {
                if let Some(info) = Self::parse_info_line(&line) {
                    last_info = Some(info);
                }
            } else if line.starts_with("bestmove") {
                break Self::parse_bestmove(&line)?;
            }
        };

        let info = last_info.ok_or_else(|| {
            EngineError::InvalidResponse("No score received before bestmove".to_string())
        })?;

        Ok(PositionAnalysis {
            best_move,
            evaluation: info.evaluation.for_white(side_to_move(fen)),
            depth: info.depth,
            nodes: info.nodes,
            pv: info.pv,
        })
    }

    /// Asks the engine to exit and waits for the process.
    pub async fn quit(mut self) -> Result<(), EngineError> {
        self.send_command("quit").await?;
        self.process.wait().await?;
        Ok(())
    }

    /// Parses `bestmove e2e4 ponder e7e5`. `(none)` means no legal move.
    fn parse_bestmove(line: &str) -> Result<Option<String>, EngineError> {
        match line.split_whitespace().nth(1) {
            Some("(none)") => Ok(None),
            Some(mv) => Ok(Some(mv.to_string())),
            None => Err(EngineError::InvalidResponse(format!(
                "Malformed bestmove line: {}",
                line
            ))),
        }
    }

    /// Parses a UCI info line carrying an exact score.
    ///
    /// Format: "info depth X ... score cp Y ... nodes Z ... pv move1 move2 ..."
    /// Lines without depth or score, and bound (non-exact) scores, yield `None`.
    fn parse_info_line(line: &str) -> Option<SearchInfo> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let mut depth: Option<u32> = None;
        let mut cp: Option<i32> = None;
        let mut mate: Option<i32> = None;
        let mut nodes: u64 = 0;
        let mut pv: Vec<String> = Vec::new();
        let mut in_pv = false;

        let mut i = 0;
        while i < parts.len() {
            if in_pv {
                pv.push(parts[i].to_string());
                i += 1;
                continue;
            }
            match parts[i] {
                "depth" => {
                    depth = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 1;
                }
                "score" => {
                    match parts.get(i + 1).copied() {
                        Some("cp") => cp = parts.get(i + 2).and_then(|s| s.parse().ok()),
                        Some("mate") => mate = parts.get(i + 2).and_then(|s| s.parse().ok()),
                        _ => {}
                    }
                    i += 2;
                }
                "lowerbound" | "upperbound" => return None,
                "nodes" => {
                    nodes = parts.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                    i += 1;
                }
                "pv" => in_pv = true,
                _ => {}
            }
            i += 1;
        }

        Some(SearchInfo {
            depth: depth?,
            evaluation: Evaluation::from_uci_score(cp, mate)?,
            nodes,
            pv,
        })
    }

    async fn sync_ready(&mut self) -> Result<(), EngineError> {
        self.send_command("isready").await?;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed);
            }
            lines_read += 1;
            if self.read_line().await? == "readyok" {
                return Ok(());
            }
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<(), EngineError> {
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        match self.stdout.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(EngineError::InvalidResponse(
                "Engine closed unexpectedly".to_string(),
            )),
        }
    }
}

/// Reads the active color field of a FEN. Anything but `b` counts as White.
fn side_to_move(fen: &str) -> Color {
    match fen.split_whitespace().nth(1) {
        Some("b") => Color::Black,
        _ => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_engine_not_found() {
        let result = UciEngine::spawn("/nonexistent/path/to/stockfish").await;
        match result {
            Err(EngineError::NotFound(path)) => {
                assert_eq!(path, "/nonexistent/path/to/stockfish");
            }
            Err(other) => panic!("Expected NotFound error, got {other}"),
            Ok(_) => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_bare_name_missing_from_path() {
        let result = UciEngine::spawn("definitely-not-a-chess-engine-binary").await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_engine_error_display() {
        let spawn_err = EngineError::SpawnError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(spawn_err.to_string().contains("Failed to spawn engine"));

        let not_found = EngineError::NotFound("/path/to/engine".to_string());
        assert!(not_found.to_string().contains("/path/to/engine"));

        assert_eq!(
            EngineError::InitFailed.to_string(),
            "Engine initialization failed"
        );

        let invalid = EngineError::InvalidResponse("bad response".to_string());
        assert!(invalid.to_string().contains("bad response"));
    }

    #[test]
    fn test_parse_info_line_centipawn() {
        let line = "info depth 15 seldepth 20 multipv 1 score cp 35 nodes 50000 nps 900000 pv e2e4 e7e5 g1f3";
        let info = UciEngine::parse_info_line(line).unwrap();
        assert_eq!(info.depth, 15);
        assert_eq!(info.evaluation, Evaluation::Centipawns(35));
        assert_eq!(info.nodes, 50000);
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_parse_info_line_mate() {
        let line = "info depth 12 score mate 3 nodes 10000 pv d1h5 g6h5";
        let info = UciEngine::parse_info_line(line).unwrap();
        assert_eq!(info.depth, 12);
        assert_eq!(info.evaluation, Evaluation::Mate(3));
        assert_eq!(info.pv.len(), 2);
    }

    #[test]
    fn test_parse_info_line_terminal_position() {
        let info = UciEngine::parse_info_line("info depth 0 score mate 0").unwrap();
        assert_eq!(info.depth, 0);
        assert_eq!(info.evaluation, Evaluation::Mate(0));
        assert!(info.pv.is_empty());
    }

    #[test]
    fn test_parse_info_line_skips_bounds() {
        let line = "info depth 18 score cp 40 lowerbound nodes 120000 pv d2d4";
        assert!(UciEngine::parse_info_line(line).is_none());
        let line = "info depth 18 score cp 20 upperbound nodes 120000 pv d2d4";
        assert!(UciEngine::parse_info_line(line).is_none());
    }

    #[test]
    fn test_parse_info_line_missing_fields() {
        assert!(UciEngine::parse_info_line("info score cp 35 nodes 50000 pv e2e4").is_none());
        assert!(UciEngine::parse_info_line("info depth 15 nodes 50000 pv e2e4").is_none());
        assert!(UciEngine::parse_info_line("info depth 10 currmove e2e4 currmovenumber 1").is_none());
    }

    #[test]
    fn test_parse_info_line_pv_keywords_are_moves() {
        // Everything after "pv" belongs to the variation.
        let line = "info depth 3 score cp -12 pv g1f3 d7d5";
        let info = UciEngine::parse_info_line(line).unwrap();
        assert_eq!(info.evaluation, Evaluation::Centipawns(-12));
        assert_eq!(info.nodes, 0);
        assert_eq!(info.pv, vec!["g1f3", "d7d5"]);
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(
            UciEngine::parse_bestmove("bestmove e2e4 ponder e7e5").unwrap(),
            Some("e2e4".to_string())
        );
        assert_eq!(UciEngine::parse_bestmove("bestmove (none)").unwrap(), None);
        assert!(UciEngine::parse_bestmove("bestmove").is_err());
    }

    #[test]
    fn test_side_to_move_from_fen() {
        assert_eq!(
            side_to_move("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"),
            Color::Black
        );
        assert_eq!(
            side_to_move("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Color::White
        );
    }

    #[test]
    fn test_max_lines_constant() {
        assert!(MAX_UCI_LINES >= 1000);
    }
}
