//! UCI (Universal Chess Interface) protocol vocabulary for driving engines.
//!
//! This crate is the GUI side of the protocol: it formats the commands a
//! controller sends to an engine and parses the lines the engine answers with.
//!
//! # Commands sent to the engine
//!
//! - `uci` / `isready` - Handshake and synchronisation
//! - `setoption name <id> value <x>` - Engine configuration (e.g. `MultiPV`)
//! - `ucinewgame` - Clear search state
//! - `position fen <fen> [moves <move>...]` - Set position
//! - `go depth <d>` - Start search
//! - `stop` / `quit`
//!
//! # Messages read from the engine
//!
//! - `id name <name>` / `id author <author>`
//! - `uciok`, `readyok`
//! - `info ... multipv <n> score cp <x> ... pv <moves>`
//! - `bestmove <move> [ponder <move>]`

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{Bound, EngineInfo, Score};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found. `mv` is `None` when the engine reports `(none)`,
    /// i.e. the side to move has no legal move.
    BestMove { mv: Option<String>, ponder: Option<String> },
    /// Anything else (`option ...`, `copyprotection`, banners).
    Other(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next().unwrap_or("") {
            "uciok" => Ok(EngineMessage::UciOk),
            "readyok" => Ok(EngineMessage::ReadyOk),
            "id" => {
                let field = parts.next().unwrap_or("");
                let value = parts.collect::<Vec<_>>().join(" ");
                match field {
                    "name" => Ok(EngineMessage::Id { name: Some(value), author: None }),
                    "author" => Ok(EngineMessage::Id { name: None, author: Some(value) }),
                    _ => Ok(EngineMessage::Other(line.to_string())),
                }
            }
            "info" => EngineInfo::parse(line)
                .map(EngineMessage::Info)
                .ok_or_else(|| UciError::ParseError(format!("Malformed info line: {}", line))),
            "bestmove" => {
                let mv = parts
                    .next()
                    .ok_or_else(|| UciError::ParseError("bestmove without a move".to_string()))?;
                let mv = match mv {
                    "(none)" | "0000" => None,
                    other => Some(other.to_string()),
                };
                let ponder = match (parts.next(), parts.next()) {
                    (Some("ponder"), Some(p)) => Some(p.to_string()),
                    _ => None,
                };
                Ok(EngineMessage::BestMove { mv, ponder })
            }
            _ => Ok(EngineMessage::Other(line.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handshake_lines() {
        assert_eq!(EngineMessage::parse("uciok").unwrap(), EngineMessage::UciOk);
        assert_eq!(EngineMessage::parse("readyok\n").unwrap(), EngineMessage::ReadyOk);
        assert_eq!(
            EngineMessage::parse("id name Stockfish 16.1").unwrap(),
            EngineMessage::Id {
                name: Some("Stockfish 16.1".to_string()),
                author: None
            }
        );
    }

    #[test]
    fn parse_bestmove_with_ponder() {
        let msg = EngineMessage::parse("bestmove e2e4 ponder e7e5").unwrap();
        assert_eq!(
            msg,
            EngineMessage::BestMove {
                mv: Some("e2e4".to_string()),
                ponder: Some("e7e5".to_string())
            }
        );
    }

    #[test]
    fn parse_bestmove_none() {
        let msg = EngineMessage::parse("bestmove (none)").unwrap();
        assert_eq!(msg, EngineMessage::BestMove { mv: None, ponder: None });
    }

    #[test]
    fn parse_bestmove_missing_move_is_error() {
        assert!(EngineMessage::parse("bestmove").is_err());
    }

    #[test]
    fn parse_unknown_line() {
        let msg = EngineMessage::parse("option name Hash type spin default 16").unwrap();
        assert!(matches!(msg, EngineMessage::Other(_)));
    }

    #[test]
    fn parse_info_message() {
        let msg = EngineMessage::parse("info depth 3 multipv 2 score cp -12 pv d2d4").unwrap();
        match msg {
            EngineMessage::Info(info) => {
                assert_eq!(info.multipv, Some(2));
                assert_eq!(info.score, Some(Score::Cp(-12)));
            }
            other => panic!("Expected Info, got {:?}", other),
        }
    }
}
