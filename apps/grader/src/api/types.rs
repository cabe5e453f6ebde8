//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use grader_core::{
    DecisionFactor, Explanation, FeatureKind, GraderError, ImagePayload, ModelInfo, Prediction,
    Stage, StageInfo, decision_factor,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx response produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable snake_case error kind.
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl From<&GraderError> for ErrorResponse {
    fn from(e: &GraderError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

// =============================================================================
// STAGE CATALOG
// =============================================================================

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageJson {
    pub stage: Stage,
    pub number: u8,
    pub name: String,
    pub description: String,
    pub characteristics: Vec<String>,
    pub recommendation: String,
    pub time_to_ripe: String,
    pub color: String,
}

impl From<&StageInfo> for StageJson {
    fn from(info: &StageInfo) -> Self {
        Self {
            stage: info.stage,
            number: info.number,
            name: info.name.to_string(),
            description: info.description.to_string(),
            characteristics: info.characteristics.iter().map(|c| c.to_string()).collect(),
            recommendation: info.recommendation.to_string(),
            time_to_ripe: info.time_to_ripe.to_string(),
            color: info.color.to_string(),
        }
    }
}

/// The full catalog plus the decision factor copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesResponse {
    pub stages: Vec<StageJson>,
    pub decision_factors: Vec<DecisionFactorJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFactorJson {
    pub feature: FeatureKind,
    pub title: String,
    pub detail: String,
}

impl From<DecisionFactor> for DecisionFactorJson {
    fn from(factor: DecisionFactor) -> Self {
        Self {
            feature: factor.feature,
            title: factor.title.to_string(),
            detail: factor.detail.to_string(),
        }
    }
}

impl StagesResponse {
    #[must_use]
    pub fn from_catalog(entries: &[StageInfo]) -> Self {
        Self {
            stages: entries.iter().map(StageJson::from).collect(),
            decision_factors: FeatureKind::ALL
                .iter()
                .map(|&f| decision_factor(f).into())
                .collect(),
        }
    }
}

// =============================================================================
// IMAGE UPLOAD
// =============================================================================

/// Image upload body for `/infer` and `/session/image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUpload {
    /// Raw base64, or a `data:image/...;base64,` URL from a camera capture.
    pub image_base64: String,
}

impl ImageUpload {
    pub fn new(image_base64: impl Into<String>) -> Self {
        Self {
            image_base64: image_base64.into(),
        }
    }

    /// Decode the upload into an image payload.
    ///
    /// Only the transport encoding is checked here. An empty or undecodable
    /// image is left for the pipeline to reject.
    pub fn decode(&self) -> Result<ImagePayload, String> {
        let encoded = self.image_base64.trim();
        let encoded = match encoded.strip_prefix("data:") {
            Some(rest) => match rest.split_once(',') {
                Some((meta, data)) if meta.ends_with(";base64") => data,
                Some(_) => return Err("data URL is not base64 encoded".to_string()),
                None => return Err("data URL has no payload".to_string()),
            },
            None => encoded,
        };

        STANDARD
            .decode(encoded)
            .map(ImagePayload::from)
            .map_err(|e| format!("invalid base64: {}", e))
    }
}

// =============================================================================
// INFER RESPONSE
// =============================================================================

/// Result of a one-shot inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferResponse {
    pub prediction: Prediction,
    pub stage_info: StageJson,
    pub explanation: Explanation,
    pub rationale: Vec<String>,
}

impl InferResponse {
    #[must_use]
    pub fn from_prediction(prediction: Prediction) -> Self {
        let stage_info = StageJson::from(grader_core::catalog::lookup(prediction.stage));
        let explanation = prediction.explanation();
        let rationale = grader_core::rationale(&prediction);
        Self {
            prediction,
            stage_info,
            explanation,
            rationale,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Result of toggling the explanation panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationToggleResponse {
    pub visible: bool,
    /// Present only while visible.
    pub explanation: Option<Explanation>,
    pub rationale: Option<Vec<String>>,
}

/// Model description for `/health`-adjacent introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub model: ModelInfo,
    pub settle_delay_ms: u64,
    pub timeout_ms: Option<u64>,
}
