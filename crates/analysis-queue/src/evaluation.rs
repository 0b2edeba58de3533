//! Chess position evaluation types.

use serde::{Deserialize, Serialize};
use uci::Score;

/// Centipawn value assigned to "mate in 0". Mates further away score
/// slightly less so that shorter mates always compare higher.
pub const MATE_CENTIPAWNS: i32 = 10_000;

/// Represents a chess position evaluation.
///
/// Evaluations can be either centipawn scores (for normal positions)
/// or mate scores (when a forced mate is found). Scores are always from the
/// perspective of the side to move in the analyzed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Evaluation {
    /// Centipawn evaluation (positive = side to move is better)
    Centipawns(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated)
    Mate(i32),
}

impl Evaluation {
    /// Builds an evaluation from the raw UCI score fields.
    ///
    /// A mate score wins over a centipawn score when both are present.
    pub fn from_uci_score(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (cp, mate) {
            (_, Some(m)) => Some(Evaluation::Mate(m)),
            (Some(cp), None) => Some(Evaluation::Centipawns(cp)),
            (None, None) => None,
        }
    }

    /// Collapses the evaluation onto a single centipawn scale.
    pub fn to_centipawns(self) -> i32 {
        match self {
            Evaluation::Centipawns(cp) => cp,
            Evaluation::Mate(n) if n > 0 => MATE_CENTIPAWNS - n,
            // "mate 0" and negative mates: the side to move is being mated.
            Evaluation::Mate(n) => -MATE_CENTIPAWNS - n,
        }
    }

    /// The same evaluation seen from the opponent's side.
    pub fn flip(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(-cp),
            Evaluation::Mate(n) => Evaluation::Mate(-n),
        }
    }

    pub fn is_mate(self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }
}

impl From<Score> for Evaluation {
    fn from(score: Score) -> Self {
        match score {
            Score::Cp(cp) => Evaluation::Centipawns(cp),
            Score::Mate(m) => Evaluation::Mate(m),
        }
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Evaluation::Centipawns(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_uci_score_prefers_mate() {
        assert_eq!(
            Evaluation::from_uci_score(Some(30), Some(2)),
            Some(Evaluation::Mate(2))
        );
        assert_eq!(
            Evaluation::from_uci_score(Some(-45), None),
            Some(Evaluation::Centipawns(-45))
        );
        assert_eq!(Evaluation::from_uci_score(None, None), None);
    }

    #[test]
    fn mate_orders_above_any_centipawn_score() {
        let mate_in_3 = Evaluation::Mate(3).to_centipawns();
        let mate_in_1 = Evaluation::Mate(1).to_centipawns();
        assert!(mate_in_1 > mate_in_3);
        assert!(mate_in_3 > Evaluation::Centipawns(2_500).to_centipawns());
    }

    #[test]
    fn being_mated_orders_below_any_centipawn_score() {
        let mated_now = Evaluation::Mate(0).to_centipawns();
        let mated_in_2 = Evaluation::Mate(-2).to_centipawns();
        assert_eq!(mated_now, -MATE_CENTIPAWNS);
        assert!(mated_in_2 > mated_now);
        assert!(mated_in_2 < Evaluation::Centipawns(-2_500).to_centipawns());
    }

    #[test]
    fn flip_negates() {
        assert_eq!(Evaluation::Centipawns(35).flip(), Evaluation::Centipawns(-35));
        assert_eq!(Evaluation::Mate(4).flip(), Evaluation::Mate(-4));
    }

    #[test]
    fn serializes_tagged() {
        let json = serde_json::to_string(&Evaluation::Mate(2)).unwrap();
        assert_eq!(json, r#"{"kind":"mate","value":2}"#);
    }
}
