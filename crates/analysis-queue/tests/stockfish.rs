//! Integration tests against a real engine.
//!
//! These tests require Stockfish to be installed and available in PATH.
//! Run with: `cargo test -p analysis-queue --test stockfish -- --ignored`

use std::sync::Arc;

use analysis_queue::{
    AnalysisOptions, AnalysisQueue, Engine, EngineSettings, Position, QueueConfig,
    SearchStabilityScorer, UciEngine, UciLauncher,
};

/// Check if Stockfish is available in PATH.
fn stockfish_available() -> bool {
    std::process::Command::new("stockfish")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_engine_multipv_analysis() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let mut engine = UciEngine::start(&EngineSettings::default())
        .await
        .expect("Failed to start engine");
    assert!(engine.name().to_lowercase().contains("stockfish"));

    let report = engine
        .analyze(&Position::startpos(), AnalysisOptions::new(10, 3))
        .await
        .expect("Failed to analyze starting position");

    assert!(report.best_move.is_some());
    assert!(report.depth >= 10);
    assert_eq!(report.lines.len(), 3);
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_queue_reports_checkmate_as_certain() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let queue = AnalysisQueue::start(
        UciLauncher::new(EngineSettings::default()),
        Arc::new(SearchStabilityScorer::default()),
        QueueConfig::default(),
    );

    // Fool's mate: white is checkmated
    let mated = Position::startpos()
        .with_move("f2f3")
        .with_move("e7e5")
        .with_move("g2g4")
        .with_move("d8h4");
    let result = queue
        .submit(mated, AnalysisOptions::new(8, 1))
        .await
        .expect("Failed to analyze mated position");

    assert!(result.best_move.is_none());
    assert_eq!(result.confidence_percent, 100);
    assert_eq!(queue.health().total_processed, 1);
}
