//! HTTP handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use analysis_queue::{AnalysisError, Position, QueueHealth};
use confidence_tree::{BuildError, BuildRequest, MoveRules, TreeError, TreeReport, UciNotation};

use crate::AppState;

/// Body of `POST /api/confidence-tree`.
///
/// Omitted parameters fall back to the `[build]` defaults of the server
/// configuration. The root is the standard start position unless `fen` is
/// given; `moves` are played from it first.
#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    #[serde(default)]
    pub fen: Option<String>,
    #[serde(default)]
    pub moves: Vec<String>,
    pub target_confidence: Option<u8>,
    pub max_ply: Option<u32>,
    pub max_iterations: Option<u32>,
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/queue/health
pub async fn queue_health(State(state): State<AppState>) -> Json<QueueHealth> {
    Json(state.builder.queue().health())
}

/// POST /api/confidence-tree
///
/// Builds a confidence tree and returns it as a flat node list.
///
/// # Errors
/// * 400 Bad Request - Malformed FEN or move, or target above 100
/// * 502 Bad Gateway - Engine failed on the root position
/// * 503 Service Unavailable - Analysis queue is full
/// * 504 Gateway Timeout - Root analysis timed out
pub async fn build_tree(
    State(state): State<AppState>,
    Json(query): Json<TreeQuery>,
) -> Result<Json<TreeReport>, (StatusCode, String)> {
    let request = build_request(&state, query)?;
    let outcome = state
        .builder
        .build(&request)
        .await
        .map_err(|e| (build_error_status(&e), e.to_string()))?;
    Ok(Json(outcome.report()))
}

fn build_request(state: &AppState, query: TreeQuery) -> Result<BuildRequest, (StatusCode, String)> {
    let defaults = state.defaults;
    let target = query
        .target_confidence
        .unwrap_or(defaults.default_target_confidence);
    if target > 100 {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("target_confidence must be at most 100, got {target}"),
        ));
    }

    let base = match query.fen {
        Some(fen) => {
            Position::from_fen(&fen).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
        }
        None => Position::startpos(),
    };
    let position = query
        .moves
        .iter()
        .try_fold(base, |pos, mv| UciNotation.apply(&pos, mv))
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(BuildRequest::new(
        position,
        target,
        query.max_ply.unwrap_or(defaults.default_max_ply),
        query.max_iterations.unwrap_or(defaults.default_max_iterations),
    ))
}

/// Maps a failed build to the status reported to the client.
pub fn build_error_status(err: &BuildError) -> StatusCode {
    match err {
        BuildError::Seed(e) | BuildError::Analysis(e) => match e {
            AnalysisError::QueueOverloaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AnalysisError::AnalysisTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AnalysisError::EngineUnavailable(_) => StatusCode::BAD_GATEWAY,
        },
        // A move the engine itself suggested did not parse.
        BuildError::Tree(TreeError::IllegalMove { .. }) => StatusCode::BAD_GATEWAY,
        BuildError::Tree(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
