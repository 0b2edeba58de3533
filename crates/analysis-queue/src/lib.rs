//! Serialized access to one external analysis engine.
//!
//! A UCI engine process is a single-session resource: concurrent commands
//! corrupt its state. This crate puts a FIFO queue in front of it.
//!
//! # Overview
//!
//! - [`AnalysisQueue`] - Concurrent `submit`, one engine call in flight,
//!   bounded pending count, retries after crashes, health counters
//! - [`UciEngine`] / [`UciLauncher`] - Engine worker for Stockfish-style processes
//! - [`Engine`] / [`EngineLauncher`] - Seams the queue drives engines through
//! - [`AnalysisResult`] - Structured result: best move, evaluation, PV,
//!   confidence and candidate moves
//! - [`ConfidenceScorer`] - Pluggable raw-output-to-confidence heuristic
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use analysis_queue::{AnalysisOptions, AnalysisQueue, EngineSettings, Position,
//!     QueueConfig, SearchStabilityScorer, UciLauncher};
//!
//! let launcher = UciLauncher::new(EngineSettings::default());
//! let queue = AnalysisQueue::start(launcher, Arc::new(SearchStabilityScorer::default()),
//!     QueueConfig::default());
//! let result = queue.submit(Position::startpos(), AnalysisOptions::new(16, 3)).await?;
//! println!("{:?} at {}%", result.best_move, result.confidence_percent);
//! ```

pub mod engine;
pub mod evaluation;
pub mod position;
pub mod queue;
pub mod report;
pub mod scorer;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

pub use engine::{Engine, EngineError, EngineLauncher, EngineSettings, UciEngine, UciLauncher};
pub use evaluation::Evaluation;
pub use position::{FenError, Position};
pub use queue::{AnalysisError, AnalysisQueue, QueueConfig, QueueHealth};
pub use report::{AnalysisOptions, AnalysisResult, Candidate, EngineReport, PvLine};
pub use scorer::{ConfidenceScorer, SearchStabilityScorer};
