//! Raw engine output and the structured result handed back to callers.

use serde::{Deserialize, Serialize};

use crate::evaluation::Evaluation;
use crate::scorer::ConfidenceScorer;

/// Per-request engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Search depth in plies.
    pub depth: u32,
    /// Number of principal variations to report (`MultiPV`).
    pub line_count: u32,
}

impl AnalysisOptions {
    pub fn new(depth: u32, line_count: u32) -> Self {
        Self {
            depth,
            line_count: line_count.max(1),
        }
    }
}

/// One principal variation as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvLine {
    /// 1-based rank of the line.
    pub multipv: u32,
    /// Depth at which this line was last completed.
    pub depth: u32,
    /// Evaluation from the side to move's perspective.
    pub evaluation: Evaluation,
    /// Moves of the line, first move first.
    pub pv: Vec<String>,
}

impl PvLine {
    /// The first move of the line.
    pub fn first_move(&self) -> Option<&str> {
        self.pv.first().map(String::as_str)
    }
}

/// Everything the engine said about one position, before scoring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineReport {
    /// Move from the `bestmove` line, `None` when the engine had no move.
    pub best_move: Option<String>,
    /// Deepest completed iteration.
    pub depth: u32,
    /// Lines ordered by rank (best first).
    pub lines: Vec<PvLine>,
}

/// An alternative move found at the analyzed position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// The move in UCI notation.
    #[serde(rename = "move")]
    pub mv: String,
    pub evaluation: Evaluation,
    pub evaluation_centipawns: i32,
    pub confidence_percent: u8,
    /// Continuation after the move, starting with the move itself.
    pub pv: Vec<String>,
}

/// Structured analysis of one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// `None` when the side to move has no legal move.
    pub best_move: Option<String>,
    pub evaluation: Evaluation,
    pub evaluation_centipawns: i32,
    pub confidence_percent: u8,
    pub principal_variation: Vec<String>,
    /// One entry per reported line, best first.
    pub candidates: Vec<Candidate>,
    pub depth: u32,
}

impl AnalysisResult {
    /// Translates raw engine output, scoring every line with `scorer`.
    ///
    /// A position without any reported line (checkmate, stalemate) is fully
    /// certain: there is nothing left to search.
    pub fn from_report(report: &EngineReport, scorer: &dyn ConfidenceScorer) -> Self {
        let candidates: Vec<Candidate> = report
            .lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| {
                let mv = line.first_move()?.to_string();
                Some(Candidate {
                    mv,
                    evaluation: line.evaluation,
                    evaluation_centipawns: line.evaluation.to_centipawns(),
                    confidence_percent: scorer.score(report, idx).min(100),
                    pv: line.pv.clone(),
                })
            })
            .collect();

        let (evaluation, principal_variation, confidence_percent) = match report.lines.first() {
            Some(best) => (
                best.evaluation,
                best.pv.clone(),
                candidates.first().map_or(0, |c| c.confidence_percent),
            ),
            None => (Evaluation::default(), Vec::new(), 100),
        };

        let best_move = report
            .best_move
            .clone()
            .or_else(|| principal_variation.first().cloned());

        Self {
            best_move,
            evaluation,
            evaluation_centipawns: evaluation.to_centipawns(),
            confidence_percent,
            principal_variation,
            candidates,
            depth: report.depth,
        }
    }

    /// Looks up the candidate starting with `mv`.
    pub fn candidate(&self, mv: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.mv == mv)
    }
}
