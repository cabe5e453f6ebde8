//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ErrorResponse, ExplanationToggleResponse, HealthResponse, ImageUpload, InferResponse,
        ModelResponse, StageJson, StagesResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use grader_core::{GraderError, ImagePayload, Stage, catalog};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// HTTP status for a pipeline error.
#[must_use]
pub fn status_for(error: &GraderError) -> StatusCode {
    match error {
        GraderError::InvalidImage(_) | GraderError::InvalidFeatureScore { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        GraderError::SlotBusy => StatusCode::CONFLICT,
        GraderError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        GraderError::ScoringUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GraderError::UnknownStage(_) => StatusCode::NOT_FOUND,
        GraderError::Config(_) | GraderError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &GraderError) -> Response {
    (status_for(error), Json(ErrorResponse::from(error))).into_response()
}

fn malformed_upload(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("malformed_upload", message)),
    )
        .into_response()
}

/// Unwrap the JSON body and decode the image.
///
/// Oversized bodies answer 413; every other body problem answers 400.
fn decode_upload(body: Result<Json<ImageUpload>, JsonRejection>) -> Result<ImagePayload, Response> {
    let Json(upload) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse::new("payload_too_large", e.body_text())),
            )
                .into_response()
        } else {
            malformed_upload(e.body_text())
        }
    })?;
    upload.decode().map_err(malformed_upload)
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Strategies and timing of the running pipeline.
pub async fn model_handler(State(state): State<AppState>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    Json(ModelResponse {
        model: orchestrator.model_info(),
        settle_delay_ms: orchestrator.settle_delay().as_millis() as u64,
        timeout_ms: orchestrator.timeout().map(|t| t.as_millis() as u64),
    })
}

// =============================================================================
// CATALOG HANDLERS
// =============================================================================

/// List every stage in ripening order.
pub async fn stages_handler() -> impl IntoResponse {
    Json(StagesResponse::from_catalog(catalog::entries()))
}

/// Look up one stage by identifier.
pub async fn stage_handler(Path(name): Path<String>) -> Response {
    match name.parse::<Stage>() {
        Ok(stage) => Json(StageJson::from(catalog::lookup(stage))).into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// INFER HANDLER
// =============================================================================

/// One-shot inference, independent of the session slot.
pub async fn infer_handler(
    State(state): State<AppState>,
    body: Result<Json<ImageUpload>, JsonRejection>,
) -> Response {
    let image = match decode_upload(body) {
        Ok(image) => image,
        Err(response) => return response,
    };

    match state.orchestrator.infer(&image).await {
        Ok(prediction) => Json(InferResponse::from_prediction(prediction)).into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

/// Current slot state.
pub async fn session_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.read().await.snapshot())
}

/// Upload into the slot and run inference.
///
/// Refused with 409 while another upload is pending. If the slot is reset
/// before inference finishes, the result is dropped and 409 `superseded` is
/// returned.
///
/// Inference and completion run on a spawned task, so the slot still leaves
/// Pending when the client disconnects mid-analysis.
pub async fn session_image_handler(
    State(state): State<AppState>,
    body: Result<Json<ImageUpload>, JsonRejection>,
) -> Response {
    let image = match decode_upload(body) {
        Ok(image) => image,
        Err(response) => return response,
    };

    // The lock is released before inference so reads and resets stay live.
    let ticket = match state.session.write().await.begin(image.clone()) {
        Ok(ticket) => ticket,
        Err(e) => return error_response(&e),
    };

    let task = tokio::spawn(async move {
        let result = state.orchestrator.infer(&image).await;
        let failure = result.as_ref().err().cloned();

        let mut session = state.session.write().await;
        if !session.complete(ticket, result) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new(
                    "superseded",
                    "The image was discarded before analysis finished",
                )),
            )
                .into_response();
        }

        match failure {
            Some(e) => error_response(&e),
            None => Json(session.snapshot()).into_response(),
        }
    });

    task.await.unwrap_or_else(|e| {
        tracing::error!("session inference task failed: {}", e);
        error_response(&GraderError::Io(format!("Inference task failed: {}", e)))
    })
}

/// Clear the slot ("analyze another").
pub async fn session_reset_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.write().await;
    session.reset();
    Json(session.snapshot())
}

/// Toggle the explanation panel of a resolved slot.
pub async fn session_explanation_handler(State(state): State<AppState>) -> Response {
    let mut session = state.session.write().await;
    let Some(visible) = session.toggle_explanation() else {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(
                "no_prediction",
                "There is no analysis result to explain",
            )),
        )
            .into_response();
    };

    let (explanation, rationale) = if visible {
        (
            session.explanation(),
            session.state().prediction().map(grader_core::rationale),
        )
    } else {
        (None, None)
    };

    Json(ExplanationToggleResponse {
        visible,
        explanation,
        rationale,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_status() {
        assert_eq!(
            status_for(&GraderError::InvalidImage("x".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(&GraderError::SlotBusy), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&GraderError::Timeout { limit_ms: 10 }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&GraderError::ScoringUnavailable("x".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&GraderError::UnknownStage("x".to_string())),
            StatusCode::NOT_FOUND
        );
    }
}
