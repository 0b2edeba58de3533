//! Positions as the engine sees them: a base position plus the moves played.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uci::GuiCommand;

/// Why a FEN string was refused.
///
/// Only the shape is checked; whether the position is reachable is left to
/// the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid FEN: contains control characters")]
    ControlCharacter,

    #[error("invalid FEN: expected 6 parts, got {0}")]
    InvalidPartCount(usize),

    #[error("invalid piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("invalid active color: expected 'w' or 'b', got '{0}'")]
    InvalidActiveColor(String),

    #[error("invalid castling rights: {0}")]
    InvalidCastlingRights(String),

    #[error("invalid en passant square: {0}")]
    InvalidEnPassantSquare(String),

    #[error("invalid move counter: {0}")]
    InvalidMoveCounter(String),
}

/// A position expressed the way UCI addresses it.
///
/// The board itself is never materialised here: the engine resolves
/// `position fen <fen> moves <m1> <m2> ...` on its side. `fen: None` stands
/// for the standard starting position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Base position in FEN notation, `None` for the starting position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    /// Moves in UCI notation played from the base position.
    #[serde(default)]
    pub moves: Vec<String>,
}

impl Position {
    /// The standard starting position.
    pub fn startpos() -> Self {
        Self::default()
    }

    /// A position given in FEN notation.
    ///
    /// The FEN ends up verbatim on the engine's command line, so anything
    /// that is not six well-formed fields is refused.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        if fen.chars().any(char::is_control) {
            return Err(FenError::ControlCharacter);
        }
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() != 6 {
            return Err(FenError::InvalidPartCount(parts.len()));
        }

        let ranks: Vec<&str> = parts[0].split('/').collect();
        let placement_ok = ranks.len() == 8
            && ranks.iter().all(|rank| {
                !rank.is_empty() && rank.chars().all(|c| "pnbrqkPNBRQK12345678".contains(c))
            });
        if !placement_ok {
            return Err(FenError::InvalidPiecePlacement(parts[0].to_string()));
        }
        if !matches!(parts[1], "w" | "b") {
            return Err(FenError::InvalidActiveColor(parts[1].to_string()));
        }
        if parts[2] != "-" && !parts[2].chars().all(|c| "KQkq".contains(c)) {
            return Err(FenError::InvalidCastlingRights(parts[2].to_string()));
        }
        if !is_en_passant_field(parts[3]) {
            return Err(FenError::InvalidEnPassantSquare(parts[3].to_string()));
        }
        for counter in &parts[4..] {
            counter
                .parse::<u32>()
                .map_err(|_| FenError::InvalidMoveCounter(counter.to_string()))?;
        }

        Ok(Self {
            fen: Some(parts.join(" ")),
            moves: Vec::new(),
        })
    }

    /// The position reached by playing `mv` from here.
    ///
    /// No legality check happens at this level; callers validate moves
    /// before extending a line.
    pub fn with_move(&self, mv: &str) -> Self {
        let mut next = self.clone();
        next.moves.push(mv.to_string());
        next
    }

    /// The `position ...` command that sets this position up in the engine.
    pub fn to_command(&self) -> GuiCommand {
        GuiCommand::Position {
            fen: self.fen.clone(),
            moves: self.moves.clone(),
        }
    }

    /// Number of moves played on top of the base position.
    pub fn ply(&self) -> usize {
        self.moves.len()
    }
}

fn is_en_passant_field(field: &str) -> bool {
    match field.as_bytes() {
        b"-" => true,
        [file, rank] => (b'a'..=b'h').contains(file) && matches!(rank, b'3' | b'6'),
        _ => false,
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fen {
            Some(fen) => write!(f, "fen {}", fen)?,
            None => write!(f, "startpos")?,
        }
        if !self.moves.is_empty() {
            write!(f, " moves {}", self.moves.join(" "))?;
        }
        Ok(())
    }
}
