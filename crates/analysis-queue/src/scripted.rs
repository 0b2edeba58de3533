//! Scripted in-process engine for tests.
//!
//! Replies are looked up by position; faults and latency can be injected,
//! and the launcher records how many calls were made, how many sessions
//! were started and how many calls ever overlapped.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::{Engine, EngineError, EngineLauncher};
use crate::evaluation::Evaluation;
use crate::position::Position;
use crate::report::{AnalysisOptions, EngineReport, PvLine};

/// Builds a scripted line from UCI moves and a centipawn score.
pub fn line(pv: &[&str], cp: i32) -> PvLine {
    PvLine {
        multipv: 0,
        depth: 0,
        evaluation: Evaluation::Centipawns(cp),
        pv: pv.iter().map(|m| m.to_string()).collect(),
    }
}

/// Scorer that reads a line's centipawn value as its confidence, so scripts
/// can state confidences directly.
pub fn centipawns_as_confidence(report: &EngineReport, line: usize) -> u8 {
    report
        .lines
        .get(line)
        .map_or(0, |l| l.evaluation.to_centipawns().clamp(0, 100) as u8)
}

#[derive(Default)]
struct Script {
    replies: Mutex<HashMap<Position, Vec<PvLine>>>,
    crash_calls: Mutex<HashSet<u64>>,
    crash_positions: Mutex<HashSet<Position>>,
    latency: Mutex<Duration>,
    refuse_launch: AtomicBool,
    calls: AtomicU64,
    launches: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    history: Mutex<Vec<(Position, AnalysisOptions)>>,
}

/// Launcher handing out [`ScriptedEngine`]s that share one script.
#[derive(Clone, Default)]
pub struct ScriptedLauncher {
    script: Arc<Script>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines returned for `position`, best first. Unscripted positions
    /// answer with no lines, like a checkmated side to move.
    pub fn reply(&self, position: &Position, lines: Vec<PvLine>) -> &Self {
        let lines = lines
            .into_iter()
            .enumerate()
            .map(|(i, l)| PvLine {
                multipv: i as u32 + 1,
                ..l
            })
            .collect();
        lock(&self.script.replies).insert(position.clone(), lines);
        self
    }

    /// The `n`th engine call (1-based, across all sessions) crashes.
    pub fn crash_on_call(&self, n: u64) -> &Self {
        lock(&self.script.crash_calls).insert(n);
        self
    }

    /// Every call analyzing `position` crashes.
    pub fn crash_at(&self, position: &Position) -> &Self {
        lock(&self.script.crash_positions).insert(position.clone());
        self
    }

    /// Every call takes at least `latency`.
    pub fn with_latency(&self, latency: Duration) -> &Self {
        *lock(&self.script.latency) = latency;
        self
    }

    /// Launch attempts fail while set.
    pub fn refuse_launch(&self, refuse: bool) -> &Self {
        self.script.refuse_launch.store(refuse, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> u64 {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> u64 {
        self.script.launches.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were ever running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.script.max_in_flight.load(Ordering::SeqCst)
    }

    /// Positions analyzed, in call order.
    pub fn history(&self) -> Vec<Position> {
        lock(&self.script.history)
            .iter()
            .map(|(position, _)| position.clone())
            .collect()
    }

    /// Every call made so far with the options it was made with.
    pub fn requests(&self) -> Vec<(Position, AnalysisOptions)> {
        lock(&self.script.history).clone()
    }
}

impl EngineLauncher for ScriptedLauncher {
    type Engine = ScriptedEngine;

    async fn launch(&self) -> Result<ScriptedEngine, EngineError> {
        if self.script.refuse_launch.load(Ordering::SeqCst) {
            return Err(EngineError::InitFailed);
        }
        self.script.launches.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedEngine {
            script: Arc::clone(&self.script),
        })
    }
}

/// One session of the scripted engine.
pub struct ScriptedEngine {
    script: Arc<Script>,
}

impl ScriptedEngine {
    fn answer(&self, call: u64, position: &Position, options: AnalysisOptions) -> Result<EngineReport, EngineError> {
        lock(&self.script.history).push((position.clone(), options));

        if lock(&self.script.crash_calls).contains(&call)
            || lock(&self.script.crash_positions).contains(position)
        {
            return Err(EngineError::Crashed);
        }

        let mut lines = lock(&self.script.replies)
            .get(position)
            .cloned()
            .unwrap_or_default();
        lines.truncate(options.line_count as usize);
        for line in &mut lines {
            line.depth = options.depth;
        }

        Ok(EngineReport {
            best_move: lines.first().and_then(|l| l.pv.first().cloned()),
            depth: options.depth,
            lines,
        })
    }
}

impl Engine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn analyze(
        &mut self,
        position: &Position,
        options: AnalysisOptions,
    ) -> Result<EngineReport, EngineError> {
        let call = self.script.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _running = InFlight::enter(&self.script);

        let outcome = self.answer(call, position, options);
        let latency = *lock(&self.script.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        outcome
    }
}

/// Counts a call as running until dropped, including when the queue
/// abandons the call on timeout.
struct InFlight<'a> {
    script: &'a Script,
}

impl<'a> InFlight<'a> {
    fn enter(script: &'a Script) -> Self {
        let running = script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        script.max_in_flight.fetch_max(running, Ordering::SeqCst);
        Self { script }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.script.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
