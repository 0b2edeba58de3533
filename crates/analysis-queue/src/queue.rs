//! Analysis request queue.
//!
//! Many callers submit analysis requests concurrently; a single worker task
//! owns the engine and serves them strictly in arrival order, so the engine
//! never sees two requests at once. Each request is answered through its own
//! oneshot channel.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{Engine, EngineError, EngineLauncher};
use crate::position::Position;
use crate::report::{AnalysisOptions, AnalysisResult};
use crate::scorer::ConfidenceScorer;

/// Errors returned to callers of [`AnalysisQueue::submit`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The engine crashed or could not be started, and retries ran out.
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),
    /// The request exceeded its time bound.
    #[error("Analysis timed out after {0:?}")]
    AnalysisTimeout(Duration),
    /// Too many requests are already waiting; nothing was queued.
    #[error("Analysis queue overloaded: {pending} pending, limit {limit}")]
    QueueOverloaded { pending: usize, limit: usize },
}

impl From<EngineError> for AnalysisError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Timeout(limit) => AnalysisError::AnalysisTimeout(limit),
            other => AnalysisError::EngineUnavailable(other.to_string()),
        }
    }
}

/// Queue limits and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Requests waiting or running beyond which new submissions are refused.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    /// Engine calls made for one request before it fails (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Bound on a single engine call; the engine is restarted when exceeded.
    #[serde(default = "default_engine_timeout_ms")]
    pub engine_timeout_ms: u64,
    /// Bound on a whole submission, queueing included.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,
}

fn default_max_pending() -> usize {
    64
}

fn default_max_attempts() -> u32 {
    3
}

fn default_engine_timeout_ms() -> u64 {
    30_000
}

fn default_submit_timeout_ms() -> u64 {
    120_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
            max_attempts: default_max_attempts(),
            engine_timeout_ms: default_engine_timeout_ms(),
            submit_timeout_ms: default_submit_timeout_ms(),
        }
    }
}

impl QueueConfig {
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_timeout_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

/// Snapshot of queue health and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueHealth {
    /// Worker running and the last engine interaction succeeded.
    pub ok: bool,
    /// Requests queued or in flight.
    pub pending_count: usize,
    /// Requests the worker finished, successfully or not.
    pub total_processed: u64,
    /// Finished requests that ended in an error.
    pub total_errors: u64,
    /// Service time of the most recently finished request.
    pub last_latency_ms: u64,
    /// Engine launches after the first one.
    pub engine_restarts: u64,
}

#[derive(Debug)]
struct QueueStats {
    pending: AtomicUsize,
    total_processed: AtomicU64,
    total_errors: AtomicU64,
    last_latency_ms: AtomicU64,
    launches: AtomicU64,
    engine_healthy: AtomicBool,
    next_request_id: AtomicU64,
}

impl Default for QueueStats {
    fn default() -> Self {
        Self {
            pending: AtomicUsize::new(0),
            total_processed: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            last_latency_ms: AtomicU64::new(0),
            launches: AtomicU64::new(0),
            engine_healthy: AtomicBool::new(true),
            next_request_id: AtomicU64::new(1),
        }
    }
}

type Reply = oneshot::Sender<Result<AnalysisResult, AnalysisError>>;

struct Request {
    id: u64,
    position: Position,
    options: AnalysisOptions,
    enqueued_at: Instant,
    reply: Reply,
}

/// Handle to the analysis queue. Cheap to clone; all clones feed the same
/// worker.
#[derive(Clone)]
pub struct AnalysisQueue {
    sender: mpsc::Sender<Request>,
    stats: Arc<QueueStats>,
    max_pending: usize,
    submit_timeout: Duration,
}

impl AnalysisQueue {
    /// Spawns the worker task and returns a handle to it.
    ///
    /// The engine is launched lazily, on the first request. Must be called
    /// from within a tokio runtime. The worker stops once every handle has
    /// been dropped.
    pub fn start<L: EngineLauncher>(
        launcher: L,
        scorer: Arc<dyn ConfidenceScorer>,
        config: QueueConfig,
    ) -> Self {
        let max_pending = config.max_pending.max(1);
        let (sender, receiver) = mpsc::channel(max_pending);
        let stats = Arc::new(QueueStats::default());

        let worker = Worker {
            launcher,
            engine: None,
            scorer,
            max_attempts: config.max_attempts.max(1),
            engine_timeout: config.engine_timeout(),
            stats: Arc::clone(&stats),
        };
        tokio::spawn(worker.run(receiver));

        Self {
            sender,
            stats,
            max_pending,
            submit_timeout: config.submit_timeout(),
        }
    }

    /// Queues an analysis request and waits for its result.
    ///
    /// Fails immediately with [`AnalysisError::QueueOverloaded`] when the
    /// pending ceiling is reached. Dropping the returned future abandons the
    /// request: it is skipped if still queued, or finishes with its result
    /// discarded if already running.
    pub async fn submit(
        &self,
        position: Position,
        options: AnalysisOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let pending = self.stats.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if pending > self.max_pending {
            self.stats.pending.fetch_sub(1, Ordering::SeqCst);
            warn!(pending = pending - 1, limit = self.max_pending, "Analysis queue overloaded");
            return Err(AnalysisError::QueueOverloaded {
                pending: pending - 1,
                limit: self.max_pending,
            });
        }

        let id = self.stats.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (reply, response) = oneshot::channel();
        let request = Request {
            id,
            position,
            options,
            enqueued_at: Instant::now(),
            reply,
        };

        if let Err(err) = self.sender.try_send(request) {
            self.stats.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(match err {
                mpsc::error::TrySendError::Full(_) => AnalysisError::QueueOverloaded {
                    pending: self.max_pending,
                    limit: self.max_pending,
                },
                mpsc::error::TrySendError::Closed(_) => {
                    AnalysisError::EngineUnavailable("analysis worker stopped".to_string())
                }
            });
        }
        debug!(request = id, pending, "Analysis request queued");

        match tokio::time::timeout(self.submit_timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AnalysisError::EngineUnavailable(
                "analysis worker stopped".to_string(),
            )),
            Err(_) => {
                warn!(request = id, timeout = ?self.submit_timeout, "Analysis request timed out");
                Err(AnalysisError::AnalysisTimeout(self.submit_timeout))
            }
        }
    }

    /// Current health snapshot.
    pub fn health(&self) -> QueueHealth {
        let launches = self.stats.launches.load(Ordering::SeqCst);
        QueueHealth {
            ok: !self.sender.is_closed() && self.stats.engine_healthy.load(Ordering::SeqCst),
            pending_count: self.stats.pending.load(Ordering::SeqCst),
            total_processed: self.stats.total_processed.load(Ordering::SeqCst),
            total_errors: self.stats.total_errors.load(Ordering::SeqCst),
            last_latency_ms: self.stats.last_latency_ms.load(Ordering::SeqCst),
            engine_restarts: launches.saturating_sub(1),
        }
    }
}

/// Sole owner of the engine session.
struct Worker<L: EngineLauncher> {
    launcher: L,
    engine: Option<L::Engine>,
    scorer: Arc<dyn ConfidenceScorer>,
    max_attempts: u32,
    engine_timeout: Duration,
    stats: Arc<QueueStats>,
}

impl<L: EngineLauncher> Worker<L> {
    async fn run(mut self, mut receiver: mpsc::Receiver<Request>) {
        while let Some(request) = receiver.recv().await {
            if request.reply.is_closed() {
                debug!(request = request.id, "Skipping abandoned analysis request");
                self.stats.pending.fetch_sub(1, Ordering::SeqCst);
                continue;
            }

            let queued_for = request.enqueued_at.elapsed();
            let started = Instant::now();
            let outcome = self.serve(&request.position, request.options).await;
            let latency = started.elapsed();

            self.stats
                .last_latency_ms
                .store(latency.as_millis() as u64, Ordering::SeqCst);
            self.stats.total_processed.fetch_add(1, Ordering::SeqCst);
            if outcome.is_err() {
                self.stats.total_errors.fetch_add(1, Ordering::SeqCst);
            }
            self.stats.pending.fetch_sub(1, Ordering::SeqCst);

            debug!(
                request = request.id,
                queued_ms = queued_for.as_millis() as u64,
                latency_ms = latency.as_millis() as u64,
                ok = outcome.is_ok(),
                "Analysis request finished"
            );

            if request.reply.send(outcome).is_err() {
                debug!(request = request.id, "Requester went away, result discarded");
            }
        }
        debug!("Analysis queue closed, worker exiting");
    }

    /// Runs one request, restarting the engine and retrying on failure.
    async fn serve(
        &mut self,
        position: &Position,
        options: AnalysisOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut attempt = 1;
        loop {
            match self.attempt(position, options).await {
                Ok(report) => {
                    self.stats.engine_healthy.store(true, Ordering::SeqCst);
                    return Ok(AnalysisResult::from_report(&report, self.scorer.as_ref()));
                }
                Err(err) => {
                    // Whatever went wrong, the session state can't be trusted
                    self.engine = None;
                    if attempt >= self.max_attempts {
                        self.stats.engine_healthy.store(false, Ordering::SeqCst);
                        warn!(%position, attempt, error = %err, "Analysis failed, giving up");
                        return Err(err.into());
                    }
                    warn!(%position, attempt, error = %err, "Engine call failed, restarting engine");
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &mut self,
        position: &Position,
        options: AnalysisOptions,
    ) -> Result<crate::report::EngineReport, EngineError> {
        let timeout = self.engine_timeout;
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                let engine = tokio::time::timeout(timeout, self.launcher.launch())
                    .await
                    .map_err(|_| EngineError::Timeout(timeout))??;
                let launches = self.stats.launches.fetch_add(1, Ordering::SeqCst) + 1;
                info!(engine = engine.name(), launches, "Engine session ready");
                engine
            }
        };
        let engine = self.engine.insert(engine);

        match tokio::time::timeout(timeout, engine.analyze(position, options)).await {
            Ok(report) => report,
            Err(_) => Err(EngineError::Timeout(timeout)),
        }
    }
}
