//! Confidence Server Library
//!
//! HTTP front end for confidence tree builds. All builds share one
//! analysis queue, and therefore one engine process.

pub mod api;
pub mod config;
pub mod middleware;

use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Router};
use confidence_tree::ConfidenceTreeBuilder;
use tower_http::cors::{Any, CorsLayer};

use config::RequestDefaults;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Builder holding the shared analysis queue.
    pub builder: ConfidenceTreeBuilder,
    /// Fallbacks for parameters a request leaves out.
    pub defaults: RequestDefaults,
}

/// All routes, with CORS and request timing applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health))
        .route("/api/queue/health", get(api::queue_health))
        .route("/api/confidence-tree", post(api::build_tree))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::timing_layer))
        .layer(cors)
}
