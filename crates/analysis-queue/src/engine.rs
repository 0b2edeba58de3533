//! Engine worker: owns one external UCI engine process.
//!
//! The queue talks to engines only through [`Engine`] and [`EngineLauncher`].
//! [`UciEngine`] is the production implementation, driving a Stockfish-style
//! process over stdin/stdout.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, MAIN_SEPARATOR};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};
use uci::{EngineInfo, EngineMessage, GoOptions, GuiCommand};

use crate::evaluation::Evaluation;
use crate::position::Position;
use crate::report::{AnalysisOptions, EngineReport, PvLine};

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 20_000;

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process or talk to it.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[from] std::io::Error),
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed")]
    InitFailed,
    /// The engine process exited while a request was running.
    #[error("Engine process exited unexpectedly")]
    Crashed,
    /// The engine answered something the protocol does not allow here.
    #[error("Engine protocol out of sync: {0}")]
    Desync(String),
    /// The engine did not finish within the allotted time.
    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),
}

/// A live engine session able to analyze one position at a time.
pub trait Engine: Send + 'static {
    /// Name reported by the engine during the handshake.
    fn name(&self) -> &str;

    /// Analyzes `position` with the given depth and line count.
    fn analyze(
        &mut self,
        position: &Position,
        options: AnalysisOptions,
    ) -> impl Future<Output = Result<EngineReport, EngineError>> + Send;
}

/// Starts fresh engine sessions, initially and after crashes.
pub trait EngineLauncher: Send + Sync + 'static {
    type Engine: Engine;

    fn launch(&self) -> impl Future<Output = Result<Self::Engine, EngineError>> + Send;
}

/// How to start the engine process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Path to the UCI engine executable.
    /// Defaults to "stockfish" (assumes it's in PATH).
    #[serde(default = "default_engine_path")]
    pub path: String,
    /// Value for the `Threads` option.
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Value for the `Hash` option, in megabytes.
    #[serde(default = "default_hash_mb")]
    pub hash_mb: u32,
}

fn default_engine_path() -> String {
    "stockfish".to_string()
}

fn default_threads() -> u32 {
    1
}

fn default_hash_mb() -> u32 {
    64
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            threads: default_threads(),
            hash_mb: default_hash_mb(),
        }
    }
}

/// Launches [`UciEngine`] processes from [`EngineSettings`].
#[derive(Debug, Clone)]
pub struct UciLauncher {
    settings: EngineSettings,
}

impl UciLauncher {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl EngineLauncher for UciLauncher {
    type Engine = UciEngine;

    async fn launch(&self) -> Result<UciEngine, EngineError> {
        UciEngine::start(&self.settings).await
    }
}

/// Wrapper for UCI-compatible analysis engines like Stockfish.
///
/// The process is killed when the wrapper is dropped, which is how the queue
/// discards an engine that crashed or stopped answering.
pub struct UciEngine {
    /// The engine process handle.
    process: Child,
    /// Writer for sending commands to the engine.
    stdin: ChildStdin,
    /// Reader for receiving responses from the engine.
    stdout: Lines<BufReader<ChildStdout>>,
    /// The engine's name (reported via UCI id).
    name: String,
    /// `MultiPV` value currently configured in the engine.
    line_count: u32,
}

impl UciEngine {
    /// Spawns the engine process, performs the UCI handshake and applies
    /// the configured options.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if an explicit engine path doesn't exist
    /// - `EngineError::SpawnError` if the engine process fails to start
    /// - `EngineError::InitFailed` if UCI initialization fails
    pub async fn start(settings: &EngineSettings) -> Result<Self, EngineError> {
        // Bare names are resolved through PATH by the OS
        if settings.path.contains(MAIN_SEPARATOR) && !Path::new(&settings.path).exists() {
            return Err(EngineError::NotFound(settings.path.clone()));
        }

        let mut process = Command::new(&settings.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = process.stdin.take().ok_or(EngineError::InitFailed)?;
        let stdout = process.stdout.take().ok_or(EngineError::InitFailed)?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            name: String::new(),
            line_count: 1,
        };

        engine.handshake().await?;
        engine
            .send(&GuiCommand::set_option("Threads", settings.threads))
            .await?;
        engine
            .send(&GuiCommand::set_option("Hash", settings.hash_mb))
            .await?;
        engine.wait_ready().await?;

        info!(engine = %engine.name, pid = ?engine.process.id(), "Engine started");
        Ok(engine)
    }

    async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::Uci).await?;

        let mut name = String::new();
        for _ in 0..MAX_UCI_LINES {
            match self.read_message().await {
                Ok(EngineMessage::Id { name: Some(n), .. }) => name = n,
                Ok(EngineMessage::UciOk) => {
                    self.name = if name.is_empty() {
                        "Unknown Engine".to_string()
                    } else {
                        name
                    };
                    return Ok(());
                }
                Ok(_) => {}
                Err(EngineError::Crashed) => return Err(EngineError::InitFailed),
                Err(e) => return Err(e),
            }
        }
        Err(EngineError::InitFailed)
    }

    /// Sends `isready` and waits for `readyok`.
    async fn wait_ready(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::IsReady).await?;
        for _ in 0..MAX_UCI_LINES {
            if self.read_message().await? == EngineMessage::ReadyOk {
                return Ok(());
            }
        }
        Err(EngineError::Desync("no readyok".to_string()))
    }

    async fn run_analysis(
        &mut self,
        position: &Position,
        options: AnalysisOptions,
    ) -> Result<EngineReport, EngineError> {
        if options.line_count != self.line_count {
            self.send(&GuiCommand::set_option("MultiPV", options.line_count))
                .await?;
            self.line_count = options.line_count;
        }
        self.wait_ready().await?;

        self.send(&position.to_command()).await?;
        self.send(&GuiCommand::Go(GoOptions::depth(options.depth)))
            .await?;

        let mut collector = ReportCollector::default();
        for _ in 0..MAX_UCI_LINES {
            match self.read_message().await? {
                EngineMessage::Info(info) => collector.observe(info),
                EngineMessage::BestMove { mv, .. } => return Ok(collector.finish(mv)),
                _ => {}
            }
        }

        Err(EngineError::Desync(
            "Too many lines without bestmove".to_string(),
        ))
    }

    /// Send a command to the engine.
    async fn send(&mut self, command: &GuiCommand) -> Result<(), EngineError> {
        let line = command.to_uci();
        debug!(engine = %self.name, "> {}", line);
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read and parse the next line from the engine's output.
    async fn read_message(&mut self) -> Result<EngineMessage, EngineError> {
        let line = self
            .stdout
            .next_line()
            .await?
            .ok_or(EngineError::Crashed)?;
        EngineMessage::parse(&line).map_err(|e| EngineError::Desync(e.to_string()))
    }
}

impl Engine for UciEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &mut self,
        position: &Position,
        options: AnalysisOptions,
    ) -> Result<EngineReport, EngineError> {
        self.run_analysis(position, options).await
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        // kill_on_drop reaps the process; this only asks it to leave first
        let _ = self.process.start_kill();
    }
}

/// Folds `info` lines of one search into an [`EngineReport`].
///
/// Only complete lines count: bound scores and `currmove` chatter are
/// ignored, and a later line for the same `multipv` rank replaces an
/// earlier one.
#[derive(Debug, Default)]
pub struct ReportCollector {
    lines: BTreeMap<u32, PvLine>,
    depth: u32,
}

impl ReportCollector {
    pub fn observe(&mut self, info: EngineInfo) {
        if !info.is_complete_line() {
            return;
        }
        let (Some(depth), Some(score)) = (info.depth, info.score) else {
            return;
        };
        let rank = info.multipv.unwrap_or(1);
        self.depth = self.depth.max(depth);
        self.lines.insert(
            rank,
            PvLine {
                multipv: rank,
                depth,
                evaluation: Evaluation::from(score),
                pv: info.pv,
            },
        );
    }

    pub fn finish(self, best_move: Option<String>) -> EngineReport {
        EngineReport {
            best_move,
            depth: self.depth,
            lines: self.lines.into_values().collect(),
        }
    }
}
