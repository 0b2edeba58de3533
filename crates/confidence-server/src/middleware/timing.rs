//! Request timing middleware.
//!
//! Tree builds take seconds, so the slow-request threshold only applies to
//! the cheap endpoints. Build requests are always logged at info.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::{Duration, Instant};
use tracing::Level;

const SLOW_REQUEST: Duration = Duration::from_millis(100);
const BUILD_ROUTE: &str = "/api/confidence-tree";

/// Level a finished request is logged at.
fn completion_level(path: &str, duration: Duration) -> Level {
    if path == BUILD_ROUTE {
        Level::INFO
    } else if duration > SLOW_REQUEST {
        Level::WARN
    } else {
        Level::DEBUG
    }
}

/// Logs method, path, status and duration of every request.
pub async fn timing_layer(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();
    let duration_ms = duration.as_millis() as u64;

    let level = completion_level(&path, duration);
    if level == Level::INFO {
        tracing::info!(%method, %path, status, duration_ms, "Build request completed");
    } else if level == Level::WARN {
        tracing::warn!(%method, %path, status, duration_ms, "Slow request");
    } else {
        tracing::debug!(%method, %path, status, duration_ms, "Request completed");
    }

    response
}
