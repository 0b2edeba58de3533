//! Confidence scoring seam.
//!
//! How a raw engine result maps to a 0-100 confidence is owned outside this
//! crate. The queue takes any [`ConfidenceScorer`]; [`SearchStabilityScorer`]
//! is a stand-in used when nothing better is configured.

use serde::{Deserialize, Serialize};

use crate::report::EngineReport;

/// Converts one line of an engine report into a confidence percentage.
pub trait ConfidenceScorer: Send + Sync {
    /// Confidence (0-100) in the evaluation of `report.lines[line]`.
    fn score(&self, report: &EngineReport, line: usize) -> u8;
}

impl<F> ConfidenceScorer for F
where
    F: Fn(&EngineReport, usize) -> u8 + Send + Sync,
{
    fn score(&self, report: &EngineReport, line: usize) -> u8 {
        self(report, line)
    }
}

/// Stand-in heuristic: deeper searches and lines well separated from their
/// nearest competitor are trusted more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStabilityScorer {
    /// Depth at which the depth component saturates.
    #[serde(default = "default_reference_depth")]
    pub reference_depth: u32,
    /// Margin (centipawns) to the nearest other line that counts as decisive.
    #[serde(default = "default_decisive_margin")]
    pub decisive_margin_cp: i32,
}

fn default_reference_depth() -> u32 {
    20
}

fn default_decisive_margin() -> i32 {
    150
}

impl Default for SearchStabilityScorer {
    fn default() -> Self {
        Self {
            reference_depth: default_reference_depth(),
            decisive_margin_cp: default_decisive_margin(),
        }
    }
}

impl ConfidenceScorer for SearchStabilityScorer {
    fn score(&self, report: &EngineReport, line: usize) -> u8 {
        let Some(target) = report.lines.get(line) else {
            return 0;
        };

        let depth_factor =
            (f64::from(target.depth) / f64::from(self.reference_depth.max(1))).min(1.0);

        let own = target.evaluation.to_centipawns();
        let nearest_gap = report
            .lines
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != line)
            .map(|(_, other)| (own - other.evaluation.to_centipawns()).abs())
            .min();

        // A single reported line means there was nothing to compare against.
        let gap_factor = match nearest_gap {
            Some(gap) => (f64::from(gap) / f64::from(self.decisive_margin_cp.max(1))).min(1.0),
            None if target.evaluation.is_mate() => 1.0,
            None => 0.5,
        };

        (40.0 * depth_factor + 60.0 * gap_factor).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Evaluation;
    use crate::report::PvLine;

    fn report(depth: u32, cps: &[i32]) -> EngineReport {
        EngineReport {
            best_move: None,
            depth,
            lines: cps
                .iter()
                .enumerate()
                .map(|(i, cp)| PvLine {
                    multipv: i as u32 + 1,
                    depth,
                    evaluation: Evaluation::Centipawns(*cp),
                    pv: vec![format!("a{}a{}", i + 1, i + 2)],
                })
                .collect(),
        }
    }

    #[test]
    fn decisive_gap_at_full_depth_is_certain() {
        let scorer = SearchStabilityScorer::default();
        assert_eq!(scorer.score(&report(20, &[300, 0]), 0), 100);
    }

    #[test]
    fn close_lines_are_uncertain() {
        let scorer = SearchStabilityScorer::default();
        let close = scorer.score(&report(20, &[30, 25]), 0);
        let wide = scorer.score(&report(20, &[130, 25]), 0);
        assert!(close < wide);
        assert!(close < 50);
    }

    #[test]
    fn shallow_search_is_trusted_less() {
        let scorer = SearchStabilityScorer::default();
        let shallow = scorer.score(&report(5, &[200, 0]), 0);
        let deep = scorer.score(&report(20, &[200, 0]), 0);
        assert!(shallow < deep);
    }

    #[test]
    fn missing_line_scores_zero() {
        let scorer = SearchStabilityScorer::default();
        assert_eq!(scorer.score(&report(20, &[10]), 3), 0);
    }

    #[test]
    fn closures_are_scorers() {
        let scorer = |_: &EngineReport, line: usize| (line * 10) as u8;
        assert_eq!(scorer.score(&EngineReport::default(), 4), 40);
    }
}
