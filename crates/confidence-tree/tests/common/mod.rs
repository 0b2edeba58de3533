//! Scripting helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use analysis_queue::scripted::{centipawns_as_confidence, line, ScriptedLauncher};
use analysis_queue::{AnalysisQueue, Position, QueueConfig};
use confidence_tree::{BuildConfig, ConfidenceTreeBuilder};

pub const SPINE_MOVES: [&str; 10] = [
    "e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "d2d3", "f8c5", "c2c3", "d7d6",
];

/// Moves never played on the spine, used as alternatives.
pub const ALTERNATIVES: [&str; 2] = ["h2h3", "a7a5"];

/// A scripted line: spine confidences per ply (root first) and the
/// confidences of the two alternatives offered at each spine position.
///
/// Confidence doubles as the centipawn score, see
/// [`centipawns_as_confidence`].
#[derive(Debug, Clone)]
pub struct Line {
    pub root: Position,
    pub confidences: Vec<u8>,
    pub alternatives: Vec<[u8; 2]>,
}

impl Line {
    /// Alternatives default to 20 and 10, clearly worse than any spine move
    /// scripted above 40.
    pub fn new(confidences: &[u8]) -> Self {
        Self {
            root: Position::startpos(),
            confidences: confidences.to_vec(),
            alternatives: vec![[20, 10]; confidences.len()],
        }
    }

    pub fn with_alternatives(mut self, ply: usize, alternatives: [u8; 2]) -> Self {
        self.alternatives[ply] = alternatives;
        self
    }

    /// Spine position at `ply`.
    pub fn position(&self, ply: usize) -> Position {
        SPINE_MOVES[..ply]
            .iter()
            .fold(self.root.clone(), |pos, mv| pos.with_move(mv))
    }

    /// Registers replies for every spine position.
    ///
    /// Each position answers with the spine move first and the alternatives
    /// after it, so seeding (one line) sees only the spine move. The root's
    /// line is the whole principal variation.
    pub fn script(&self, launcher: &ScriptedLauncher) {
        let spine_len = self.confidences.len() - 1;
        for (ply, conf) in self.confidences.iter().enumerate() {
            let pv: Vec<&str> = if ply == 0 {
                SPINE_MOVES[..spine_len].to_vec()
            } else {
                // Past the tail the engine still suggests something.
                vec![SPINE_MOVES.get(ply).copied().unwrap_or("a2a3")]
            };
            let [a1, a2] = self.alternatives[ply];
            launcher.reply(
                &self.position(ply),
                vec![
                    line(&pv, *conf as i32),
                    line(&[ALTERNATIVES[0]], a1 as i32),
                    line(&[ALTERNATIVES[1]], a2 as i32),
                ],
            );
        }
    }
}

pub fn start_queue(launcher: &ScriptedLauncher) -> AnalysisQueue {
    AnalysisQueue::start(
        launcher.clone(),
        Arc::new(centipawns_as_confidence),
        QueueConfig::default(),
    )
}

pub fn builder(launcher: &ScriptedLauncher) -> ConfidenceTreeBuilder {
    ConfidenceTreeBuilder::new(start_queue(launcher), BuildConfig::default())
}
