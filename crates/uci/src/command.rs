//! UCI command formatting.

use std::fmt;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Set an engine option.
    SetOption { name: String, value: String },
    /// Forget search state from previous positions.
    UciNewGame,
    /// Set up position. `fen: None` means the standard starting position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search exactly this many nodes.
    pub nodes: Option<u64>,
    /// Search indefinitely until `stop`.
    pub infinite: bool,
}

impl GoOptions {
    /// Fixed-depth search.
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }
}

impl GuiCommand {
    /// Shorthand for `setoption name <name> value <value>`.
    pub fn set_option(name: &str, value: impl fmt::Display) -> Self {
        GuiCommand::SetOption {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Format as the line written to the engine (without newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::SetOption { name, value } => {
                format!("setoption name {} value {}", name, value)
            }
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            GuiCommand::Position { fen, moves } => {
                let mut line = match fen {
                    Some(fen) => format!("position fen {}", fen),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    line.push_str(" moves ");
                    line.push_str(&moves.join(" "));
                }
                line
            }
            GuiCommand::Go(opts) => {
                let mut parts = vec!["go".to_string()];
                if let Some(d) = opts.depth {
                    parts.push(format!("depth {}", d));
                }
                if let Some(n) = opts.nodes {
                    parts.push(format!("nodes {}", n));
                }
                if let Some(t) = opts.movetime {
                    parts.push(format!("movetime {}", t));
                }
                if opts.infinite {
                    parts.push("infinite".to_string());
                }
                parts.join(" ")
            }
            GuiCommand::Stop => "stop".to_string(),
            GuiCommand::Quit => "quit".to_string(),
        }
    }
}

impl fmt::Display for GuiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_handshake() {
        assert_eq!(GuiCommand::Uci.to_uci(), "uci");
        assert_eq!(GuiCommand::IsReady.to_uci(), "isready");
        assert_eq!(GuiCommand::UciNewGame.to_uci(), "ucinewgame");
    }

    #[test]
    fn format_setoption() {
        let cmd = GuiCommand::set_option("MultiPV", 3);
        assert_eq!(cmd.to_uci(), "setoption name MultiPV value 3");
    }

    #[test]
    fn format_position_startpos() {
        let cmd = GuiCommand::Position {
            fen: None,
            moves: vec![],
        };
        assert_eq!(cmd.to_uci(), "position startpos");
    }

    #[test]
    fn format_position_startpos_with_moves() {
        let cmd = GuiCommand::Position {
            fen: None,
            moves: vec!["e2e4".to_string(), "e7e5".to_string()],
        };
        assert_eq!(cmd.to_uci(), "position startpos moves e2e4 e7e5");
    }

    #[test]
    fn format_position_fen() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let cmd = GuiCommand::Position {
            fen: Some(fen.to_string()),
            moves: vec!["c7c5".to_string()],
        };
        assert_eq!(cmd.to_uci(), format!("position fen {} moves c7c5", fen));
    }

    #[test]
    fn format_go_depth() {
        let cmd = GuiCommand::Go(GoOptions::depth(18));
        assert_eq!(cmd.to_string(), "go depth 18");
    }

    #[test]
    fn format_go_infinite() {
        let cmd = GuiCommand::Go(GoOptions {
            infinite: true,
            ..GoOptions::default()
        });
        assert_eq!(cmd.to_uci(), "go infinite");
    }
}
