//! End-to-end HTTP tests against the scripted engine.

use std::sync::Arc;

use analysis_queue::scripted::{centipawns_as_confidence, line, ScriptedLauncher};
use analysis_queue::{AnalysisQueue, Position, QueueConfig};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use confidence_server::config::RequestDefaults;
use confidence_server::{router, AppState};
use confidence_tree::{BuildConfig, ConfidenceTreeBuilder};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Spine e2e4 e7e5 g1f3 with confidences 85, 65, 72, 81; every spine
/// position also offers two weak alternatives.
fn scripted_engine() -> ScriptedLauncher {
    let launcher = ScriptedLauncher::new();
    let spine = ["e2e4", "e7e5", "g1f3"];
    let confidences = [85, 65, 72, 81];
    let mut position = Position::startpos();
    for (ply, conf) in confidences.iter().enumerate() {
        let pv: Vec<&str> = if ply == 0 {
            spine.to_vec()
        } else {
            vec![spine.get(ply).copied().unwrap_or("b8c6")]
        };
        launcher.reply(
            &position,
            vec![line(&pv, *conf), line(&["h2h3"], 20), line(&["a7a5"], 10)],
        );
        if let Some(mv) = spine.get(ply) {
            position = position.with_move(mv);
        }
    }
    launcher
}

fn app(launcher: &ScriptedLauncher, queue: QueueConfig) -> Router {
    let queue = AnalysisQueue::start(launcher.clone(), Arc::new(centipawns_as_confidence), queue);
    router(AppState {
        builder: ConfidenceTreeBuilder::new(queue, BuildConfig::default()),
        defaults: RequestDefaults::default(),
    })
}

async fn post(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/confidence-tree")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_health() {
    let launcher = ScriptedLauncher::new();
    let (status, body) = get(app(&launcher, QueueConfig::default()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_build_returns_flat_tree() {
    let launcher = scripted_engine();
    let (status, body) = post(
        app(&launcher, QueueConfig::default()),
        json!({ "target_confidence": 80, "max_iterations": 1 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let nodes = body["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 6);
    assert_eq!(body["iterations_used"], 1);
    assert_eq!(body["failed_extensions"], 0);
    assert_eq!(body["termination_reason"], "iteration_cap_reached");
    assert_eq!(body["target_confidence"], 80);
    assert_eq!(body["stats"]["branch_nodes"], 2);

    let branched = &nodes[1];
    assert_eq!(branched["move"], "e2e4");
    assert_eq!(branched["has_branches"], true);
    assert_eq!(branched["shape"], "triangle");
    for branch in &nodes[4..] {
        assert_eq!(branch["kind"], "branch");
        assert_eq!(branch["parent"], 1);
        assert_eq!(branch["shape"], "circle");
    }
}

#[tokio::test]
async fn test_build_uses_configured_defaults() {
    let launcher = scripted_engine();
    let (status, body) = post(app(&launcher, QueueConfig::default()), json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target_confidence"], 80);
    assert_eq!(body["max_ply"], 18);
}

#[tokio::test]
async fn test_malformed_move_is_bad_request() {
    let launcher = scripted_engine();
    let (status, _) = post(
        app(&launcher, QueueConfig::default()),
        json!({ "moves": ["e2e4", "Nf6"] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(launcher.calls(), 0);
}

#[tokio::test]
async fn test_fen_with_embedded_commands_is_bad_request() {
    let launcher = scripted_engine();
    let (status, _) = post(
        app(&launcher, QueueConfig::default()),
        json!({ "fen": "8/8/8/8/8/8/8/K6k w - - 0 1\nsetoption name MultiPV value 7\nquit" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(launcher.calls(), 0);
}

#[tokio::test]
async fn test_fen_with_wrong_field_count_is_bad_request() {
    let launcher = scripted_engine();
    let (status, _) = post(
        app(&launcher, QueueConfig::default()),
        json!({ "fen": "8/8/8/8/8/8/8/K6k w - - 0 1 go infinite" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(launcher.calls(), 0);
}

#[tokio::test]
async fn test_valid_fen_is_sent_to_engine() {
    let launcher = ScriptedLauncher::new();
    let fen = "8/8/8/8/8/8/8/K6k w - - 0 1";
    let root = Position::from_fen(fen).unwrap();
    launcher.reply(&root, vec![line(&["a1b1"], 60)]);
    launcher.reply(&root.with_move("a1b1"), vec![line(&["h1g1"], 70)]);

    let (status, body) = post(
        app(&launcher, QueueConfig::default()),
        json!({ "fen": fen, "max_iterations": 0 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(launcher.history()[0], root);
}

#[tokio::test]
async fn test_target_above_hundred_is_bad_request() {
    let launcher = scripted_engine();
    let (status, _) = post(
        app(&launcher, QueueConfig::default()),
        json!({ "target_confidence": 150 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dead_engine_is_bad_gateway() {
    let launcher = ScriptedLauncher::new();
    launcher.refuse_launch(true);
    let (status, _) = post(app(&launcher, QueueConfig::default()), json!({})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_queue_health_reports_counters() {
    let launcher = scripted_engine();
    let app = app(&launcher, QueueConfig::default());

    let (status, _) = post(app.clone(), json!({ "max_iterations": 0 })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(app, "/api/queue/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["ok"], true);
    assert_eq!(health["total_processed"], 4);
    assert_eq!(health["total_errors"], 0);
    assert_eq!(health["pending_count"], 0);
}
