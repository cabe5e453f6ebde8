//! # Grader HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /model` - Pipeline strategies and timing
//! - `GET /stages` - Stage catalog and decision factors
//! - `GET /stages/{stage}` - One catalog entry
//! - `POST /infer` - One-shot inference on a base64 image
//! - `GET /session` - Grading slot state
//! - `POST /session/image` - Upload into the slot and analyze
//! - `POST /session/reset` - Clear the slot
//! - `POST /session/explanation` - Toggle the explanation panel
//!
//! ## Security Configuration
//!
//! From `[server]` in `grader.toml` or the matching environment variables:
//! - `cors_origins`: comma-separated allowed origins, or "*" (default: localhost only)
//! - `rate_limit`: requests per second (default: 100, 0 to disable)
//! - `api_key`: if set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ApiKey, api_key_auth_middleware, keys_match};
pub use handlers::status_for;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    DecisionFactorJson, ErrorResponse, ExplanationToggleResponse, HealthResponse, ImageUpload,
    InferResponse, ModelResponse, StageJson, StagesResponse,
};

use crate::config::{AppConfig, ServerConfig};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use grader_core::{GraderError, GradingSession, InferenceOrchestrator};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the pipeline, the grading slot and server settings.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<InferenceOrchestrator>,
    pub session: Arc<RwLock<GradingSession>>,
    pub server: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: InferenceOrchestrator, server: ServerConfig) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            session: Arc::new(RwLock::new(GradingSession::new())),
            server: Arc::new(server),
        }
    }

    /// Build the pipeline described by the configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, GraderError> {
        let orchestrator = InferenceOrchestrator::from_config(&config.pipeline)?;
        Ok(Self::new(orchestrator, config.server.clone()))
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `"*"`: all origins, with a warning
/// - unset: localhost only
/// - otherwise: the comma-separated list, falling back to localhost if none parse
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins (cors_origins = \"*\"). This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Restrictive CORS layer for localhost front ends.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit - caps upload size
/// 4. Rate Limiting - protects against floods (if enabled)
/// 5. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let server = Arc::clone(&state.server);
    let cors = build_cors_layer(server.cors_origins.as_deref());

    let rate_limiter = if server.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", server.rate_limit);
        Some(create_rate_limiter(server.rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let api_key: Option<ApiKey> = server.api_key().map(Arc::from);
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set GRADER_API_KEY or [server] api_key to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/model", get(handlers::model_handler))
        .route("/stages", get(handlers::stages_handler))
        .route("/stages/{stage}", get(handlers::stage_handler))
        .route("/infer", post(handlers::infer_handler))
        .route("/session", get(handlers::session_handler))
        .route("/session/image", post(handlers::session_image_handler))
        .route("/session/reset", post(handlers::session_reset_handler))
        .route("/session/explanation", post(handlers::session_explanation_handler));

    if let Some(key) = api_key {
        router = router.layer(axum_middleware::from_fn_with_state(
            key,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(server.max_upload_bytes)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(state: AppState) -> Result<(), GraderError> {
    let addr = state.server.addr();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GraderError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Grader HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| GraderError::Io(format!("Server error: {}", e)))
}
