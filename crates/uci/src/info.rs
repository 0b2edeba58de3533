//! UCI info line parsing.

use serde::{Deserialize, Serialize};

/// Score in centipawns or mate distance, from the side to move's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated).
    Mate(i32),
}

/// Marks a score reported from an aspiration window fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

/// Search information from engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// 1-based index of the line when the engine runs with `MultiPV > 1`.
    pub multipv: Option<u32>,
    /// Score evaluation.
    pub score: Option<Score>,
    /// Set when the score is only a bound, not exact.
    pub bound: Option<Bound>,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Current move being searched.
    pub currmove: Option<String>,
    /// Hash table usage (per mille).
    pub hashfull: Option<u32>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    /// Create a new empty info.
    pub fn new() -> Self {
        Self::default()
    }

    /// True for lines that describe a finished iteration of one PV line:
    /// they carry depth, an exact score and a non-empty PV.
    pub fn is_complete_line(&self) -> bool {
        self.depth.is_some() && self.score.is_some() && self.bound.is_none() && !self.pv.is_empty()
    }

    /// Parse UCI info line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with("info") {
            return None;
        }

        let mut info = EngineInfo::new();
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mut i = 1; // Skip "info"

        while i < parts.len() {
            match parts[i] {
                "depth" => {
                    i += 1;
                    info.depth = parts.get(i).and_then(|s| s.parse().ok());
                }
                "seldepth" => {
                    i += 1;
                    info.seldepth = parts.get(i).and_then(|s| s.parse().ok());
                }
                "multipv" => {
                    i += 1;
                    info.multipv = parts.get(i).and_then(|s| s.parse().ok());
                }
                "score" => {
                    i += 1;
                    let kind = parts.get(i).copied();
                    i += 1;
                    let value = parts.get(i).and_then(|s| s.parse().ok());
                    info.score = match (kind, value) {
                        (Some("cp"), Some(cp)) => Some(Score::Cp(cp)),
                        (Some("mate"), Some(m)) => Some(Score::Mate(m)),
                        _ => None,
                    };
                }
                "lowerbound" => info.bound = Some(Bound::Lower),
                "upperbound" => info.bound = Some(Bound::Upper),
                "nodes" => {
                    i += 1;
                    info.nodes = parts.get(i).and_then(|s| s.parse().ok());
                }
                "nps" => {
                    i += 1;
                    info.nps = parts.get(i).and_then(|s| s.parse().ok());
                }
                "time" => {
                    i += 1;
                    info.time = parts.get(i).and_then(|s| s.parse().ok());
                }
                "hashfull" => {
                    i += 1;
                    info.hashfull = parts.get(i).and_then(|s| s.parse().ok());
                }
                "currmove" => {
                    i += 1;
                    info.currmove = parts.get(i).map(|s| s.to_string());
                }
                "pv" => {
                    i += 1;
                    // Collect all remaining moves until another keyword or end
                    while i < parts.len() && !is_info_keyword(parts[i]) {
                        info.pv.push(parts[i].to_string());
                        i += 1;
                    }
                    continue;
                }
                "string" => {
                    // String consumes rest of line
                    info.string = Some(parts[i + 1..].join(" "));
                    break;
                }
                _ => {}
            }
            i += 1;
        }

        Some(info)
    }
}

fn is_info_keyword(s: &str) -> bool {
    matches!(
        s,
        "depth"
            | "seldepth"
            | "multipv"
            | "score"
            | "nodes"
            | "nps"
            | "time"
            | "pv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "tbhits"
            | "string"
    )
}
