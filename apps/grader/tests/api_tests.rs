//! Integration tests for the grader HTTP API.
//!
//! Uses axum-test to drive the router in-process without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum_test::TestServer;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use grader::api::{
    AppState, ErrorResponse, ExplanationToggleResponse, HealthResponse, ImageUpload,
    InferResponse, ModelResponse, StageJson, StagesResponse, create_router,
};
use grader::config::ServerConfig;
use grader_core::{
    GraderError, ImagePayload, InferenceOrchestrator, PipelineConfig, ScorerKind, Stage,
};
use serde_json::{Value, json};
use std::future::IntoFuture;
use std::time::Duration;
use tower::ServiceExt;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Server settings with the rate limiter off so tests never trip it.
fn server_config() -> ServerConfig {
    ServerConfig {
        rate_limit: 0,
        ..ServerConfig::default()
    }
}

/// State with a seeded reference pipeline and the given settle delay.
fn create_state(settle_delay: Duration) -> AppState {
    let orchestrator = InferenceOrchestrator::reference(Some(42)).with_settle_delay(settle_delay);
    AppState::new(orchestrator, server_config())
}

fn create_server(state: AppState) -> TestServer {
    TestServer::new(create_router(state)).unwrap()
}

/// Test server with a zero settle delay.
fn create_test_server() -> TestServer {
    create_server(create_state(Duration::ZERO))
}

fn upload() -> ImageUpload {
    ImageUpload::new(STANDARD.encode(b"\x89PNG fake mango bytes"))
}

fn status_of(body: &Value) -> &str {
    body["state"]["status"].as_str().unwrap()
}

// =============================================================================
// HEALTH AND MODEL TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_model_endpoint_reports_strategies() {
    let server = create_test_server();

    let response = server.get("/model").await;

    response.assert_status_ok();
    let model: ModelResponse = response.json();
    assert_eq!(model.model.scorer, "reference-random");
    assert_eq!(model.model.confidence, "reference-random");
    assert_eq!(model.settle_delay_ms, 0);
    assert_eq!(model.timeout_ms, None);
}

// =============================================================================
// CATALOG TESTS
// =============================================================================

#[tokio::test]
async fn test_stages_lists_catalog_in_order() {
    let server = create_test_server();

    let response = server.get("/stages").await;

    response.assert_status_ok();
    let stages: StagesResponse = response.json();
    let order: Vec<Stage> = stages.stages.iter().map(|s| s.stage).collect();
    assert_eq!(order, Stage::ALL.to_vec());
    assert_eq!(stages.decision_factors.len(), 4);
    assert!(stages.stages.iter().all(|s| !s.characteristics.is_empty()));
}

#[tokio::test]
async fn test_stage_lookup_accepts_aliases() {
    let server = create_test_server();

    let response = server.get("/stages/mature-green").await;

    response.assert_status_ok();
    let stage: StageJson = response.json();
    assert_eq!(stage.stage, Stage::MatureGreen);
    assert_eq!(stage.number, 2);
}

#[tokio::test]
async fn test_unknown_stage_is_not_found() {
    let server = create_test_server();

    let response = server.get("/stages/bruised").await;

    response.assert_status_not_found();
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "unknown_stage");
}

// =============================================================================
// INFER TESTS
// =============================================================================

#[tokio::test]
async fn test_infer_returns_prediction_and_explanation() {
    let server = create_test_server();

    let response = server.post("/infer").json(&upload()).await;

    response.assert_status_ok();
    let result: InferResponse = response.json();
    assert!((85.0..=97.0).contains(&result.prediction.confidence_percent));
    assert_eq!(result.prediction.heatmap.len(), 10);
    assert_eq!(result.stage_info.stage, result.prediction.stage);
    assert_eq!(result.explanation, result.prediction.explanation());
    assert_eq!(result.rationale.len(), 5);
}

#[tokio::test]
async fn test_infer_accepts_data_url() {
    let server = create_test_server();
    let data_url = format!(
        "data:image/jpeg;base64,{}",
        STANDARD.encode(b"\xFF\xD8 camera frame")
    );

    let response = server
        .post("/infer")
        .json(&ImageUpload::new(data_url))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_infer_empty_image_is_unprocessable() {
    let server = create_test_server();

    let response = server.post("/infer").json(&ImageUpload::new("")).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "invalid_image");
}

#[tokio::test]
async fn test_infer_invalid_base64_is_bad_request() {
    let server = create_test_server();

    let response = server
        .post("/infer")
        .json(&ImageUpload::new("not base64 !!!"))
        .await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "malformed_upload");
}

#[tokio::test]
async fn test_infer_missing_field_is_bad_request() {
    let server = create_test_server();

    let response = server.post("/infer").json(&json!({ "image": "abc" })).await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_infer_pixel_scorer_rejects_undecodable_image() {
    let config = PipelineConfig {
        settle_delay_ms: 0,
        scorer: ScorerKind::Pixel,
        ..PipelineConfig::default()
    };
    let orchestrator = InferenceOrchestrator::from_config(&config).unwrap();
    let server = create_server(AppState::new(orchestrator, server_config()));

    let response = server.post("/infer").json(&upload()).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_infer_pixel_scorer_grades_real_png() {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    let config = PipelineConfig {
        settle_delay_ms: 0,
        scorer: ScorerKind::Pixel,
        ..PipelineConfig::default()
    };
    let orchestrator = InferenceOrchestrator::from_config(&config).unwrap();
    let server = create_server(AppState::new(orchestrator, server_config()));

    let img = RgbImage::from_fn(48, 48, |x, y| {
        let dx = x as f64 - 23.5;
        let dy = y as f64 - 23.5;
        if dx * dx + dy * dy < 18.0 * 18.0 {
            Rgb([230, 120, 20])
        } else {
            Rgb([250, 250, 250])
        }
    });
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageFormat::Png).unwrap();
    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner()));

    let response = server.post("/infer").json(&ImageUpload::new(data_url)).await;

    response.assert_status_ok();
    let result: InferResponse = response.json();
    assert_eq!(result.prediction.model.scorer, "pixel-heuristic");
    assert!(result.prediction.features.color > 50.0);
}

// =============================================================================
// SESSION TESTS
// =============================================================================

#[tokio::test]
async fn test_session_starts_idle() {
    let server = create_test_server();

    let response = server.get("/session").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(status_of(&body), "idle");
    assert!(body["image_bytes"].is_null());
    assert_eq!(body["explanation_visible"], false);
}

#[tokio::test]
async fn test_session_upload_resolves() {
    let server = create_test_server();

    let response = server.post("/session/image").json(&upload()).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(status_of(&body), "resolved");
    assert_eq!(body["state"]["heatmap"].as_array().unwrap().len(), 10);
    assert!(body["image_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_session_upload_failure_is_recorded() {
    let server = create_test_server();

    let response = server.post("/session/image").json(&ImageUpload::new("")).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = server.get("/session").await.json();
    assert_eq!(status_of(&body), "rejected");
    assert_eq!(body["state"]["kind"], "invalid_image");
}

#[tokio::test]
async fn test_session_upload_while_pending_conflicts() {
    let state = create_state(Duration::ZERO);
    let ticket = state
        .session
        .write()
        .await
        .begin(ImagePayload::new(vec![1, 2, 3]))
        .unwrap();
    let server = create_server(state.clone());

    let response = server.post("/session/image").json(&upload()).await;

    response.assert_status(StatusCode::CONFLICT);
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, GraderError::SlotBusy.kind());

    // The pending request still owns the slot.
    let mut session = state.session.write().await;
    assert!(session.state().is_pending());
    assert!(session.complete(ticket, Err(GraderError::Timeout { limit_ms: 1 })));
}

#[tokio::test]
async fn test_reset_during_inference_supersedes_result() {
    let server = create_server(create_state(Duration::from_millis(300)));

    let (uploaded, reset) = tokio::join!(
        server.post("/session/image").json(&upload()).into_future(),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            server.post("/session/reset").await
        }
    );

    reset.assert_status_ok();
    uploaded.assert_status(StatusCode::CONFLICT);
    let error: ErrorResponse = uploaded.json();
    assert_eq!(error.error, "superseded");

    let body: Value = server.get("/session").await.json();
    assert_eq!(status_of(&body), "idle");
}

#[tokio::test]
async fn test_abandoned_upload_still_settles_slot() {
    let state = create_state(Duration::from_millis(200));
    let request = Request::post("/session/image")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&upload()).unwrap()))
        .unwrap();

    // The client gives up while the upload is still settling.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        create_router(state.clone()).oneshot(request),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(state.session.read().await.state().is_pending());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!state.session.read().await.state().is_pending());
    assert!(state.session.read().await.state().prediction().is_some());

    // The slot accepts the next upload.
    let server = create_server(state);
    let response = server.post("/session/image").json(&upload()).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(status_of(&body), "resolved");
}

#[tokio::test]
async fn test_explanation_toggle_requires_result() {
    let server = create_test_server();

    let response = server.post("/session/explanation").await;

    response.assert_status(StatusCode::CONFLICT);
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "no_prediction");
}

#[tokio::test]
async fn test_explanation_toggle_flips_visibility() {
    let server = create_test_server();
    server.post("/session/image").json(&upload()).await.assert_status_ok();

    let shown: ExplanationToggleResponse = server.post("/session/explanation").await.json();
    assert!(shown.visible);
    assert_eq!(shown.explanation.as_ref().unwrap().heatmap.len(), 10);
    assert_eq!(shown.rationale.as_ref().unwrap().len(), 5);

    let hidden: ExplanationToggleResponse = server.post("/session/explanation").await.json();
    assert!(!hidden.visible);
    assert!(hidden.explanation.is_none());
}

#[tokio::test]
async fn test_reset_clears_slot() {
    let server = create_test_server();
    server.post("/session/image").json(&upload()).await.assert_status_ok();
    server.post("/session/explanation").await.assert_status_ok();

    let response = server.post("/session/reset").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(status_of(&body), "idle");
    assert!(body["image_bytes"].is_null());
    assert_eq!(body["explanation_visible"], false);

    // A fresh upload is accepted after reset.
    server.post("/session/image").json(&upload()).await.assert_status_ok();
}

// =============================================================================
// MIDDLEWARE TESTS
// =============================================================================

fn create_auth_test_server(api_key: &str) -> TestServer {
    let orchestrator = InferenceOrchestrator::reference(Some(1)).with_settle_delay(Duration::ZERO);
    let server = ServerConfig {
        api_key: Some(api_key.to_string()),
        ..server_config()
    };
    create_server(AppState::new(orchestrator, server))
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let server = create_auth_test_server("test-secret-key-12345");

    let response = server
        .get("/stages")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer test-secret-key-12345"),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("test-secret-key-12345");

    let response = server
        .get("/stages")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer wrong"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("test-secret-key-12345");

    let response = server.post("/infer").json(&upload()).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let server = create_auth_test_server("test-secret-key-12345");

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let orchestrator = InferenceOrchestrator::reference(Some(1)).with_settle_delay(Duration::ZERO);
    let config = ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    };
    let server = create_server(AppState::new(orchestrator, config));

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_body_limit_rejects_large_upload() {
    let orchestrator = InferenceOrchestrator::reference(Some(1)).with_settle_delay(Duration::ZERO);
    let config = ServerConfig {
        max_upload_bytes: 256,
        ..server_config()
    };
    let server = create_server(AppState::new(orchestrator, config));

    let big = ImageUpload::new(STANDARD.encode(vec![7u8; 4096]));
    let response = server.post("/infer").json(&big).await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}
