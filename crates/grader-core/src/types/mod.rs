//! # Core Type Definitions
//!
//! Value objects that flow through the grading pipeline:
//! - Input payload (`ImagePayload`)
//! - Feature cues (`FeatureKind`, `FeatureScores`, `FeaturePercentages`)
//! - Explanation data (`RegionImportance`, `FeatureContribution`, `Explanation`)
//! - Output record (`Prediction`, `ModelInfo`)
//! - Error types (`GraderError`)
//!
//! ## Invariants
//!
//! All types in this module are constructed once per inference call and never
//! mutated afterwards. Range invariants are checked at construction:
//! - Feature scores are finite and in `[0, 1]`
//! - Percentages and region importances are in `[0, 100]`

use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IMAGE PAYLOAD
// =============================================================================

/// Opaque image data handed to the core by the acquisition layer.
///
/// The core only requires the payload to be non-empty; decoding is the
/// business of the selected scoring strategy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImagePayload {
    data: Vec<u8>,
}

impl ImagePayload {
    /// Wrap raw bytes (file contents or an encoded camera frame).
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reject empty payloads before any strategy sees them.
    pub fn ensure_non_empty(&self) -> Result<(), GraderError> {
        if self.is_empty() {
            return Err(GraderError::InvalidImage("image payload is empty".to_string()));
        }
        Ok(())
    }
}

impl From<Vec<u8>> for ImagePayload {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for ImagePayload {
    fn from(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

// =============================================================================
// FEATURES
// =============================================================================

/// The four visual cues that drive classification, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Color,
    Texture,
    Shape,
    Size,
}

impl FeatureKind {
    /// All features in their canonical order.
    pub const ALL: [FeatureKind; 4] = [
        FeatureKind::Color,
        FeatureKind::Texture,
        FeatureKind::Shape,
        FeatureKind::Size,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Color => "color",
            FeatureKind::Texture => "texture",
            FeatureKind::Shape => "shape",
            FeatureKind::Size => "size",
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized feature scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureScores {
    color: f64,
    texture: f64,
    shape: f64,
    size: f64,
}

impl FeatureScores {
    /// Build a score set, rejecting any value that is not finite or lies
    /// outside `[0, 1]`.
    pub fn new(color: f64, texture: f64, shape: f64, size: f64) -> Result<Self, GraderError> {
        let scores = Self {
            color,
            texture,
            shape,
            size,
        };
        for feature in FeatureKind::ALL {
            let value = scores.get(feature);
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(GraderError::InvalidFeatureScore { feature, value });
            }
        }
        Ok(scores)
    }

    /// Build a score set by clamping each value into `[0, 1]`.
    ///
    /// NaN is treated as `0`. Used by strategies whose raw measurements can
    /// overshoot the normalized range.
    #[must_use]
    pub fn clamped(color: f64, texture: f64, shape: f64, size: f64) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            color: clamp(color),
            texture: clamp(texture),
            shape: clamp(shape),
            size: clamp(size),
        }
    }

    #[must_use]
    pub fn get(&self, feature: FeatureKind) -> f64 {
        match feature {
            FeatureKind::Color => self.color,
            FeatureKind::Texture => self.texture,
            FeatureKind::Shape => self.shape,
            FeatureKind::Size => self.size,
        }
    }

    #[must_use]
    pub fn color(&self) -> f64 {
        self.color
    }

    #[must_use]
    pub fn texture(&self) -> f64 {
        self.texture
    }

    #[must_use]
    pub fn shape(&self) -> f64 {
        self.shape
    }

    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Scale every score to a percentage.
    #[must_use]
    pub fn to_percentages(&self) -> FeaturePercentages {
        FeaturePercentages {
            color: self.color * 100.0,
            texture: self.texture * 100.0,
            shape: self.shape * 100.0,
            size: self.size * 100.0,
        }
    }
}

/// Feature scores scaled to `[0, 100]`, same keys as [`FeatureScores`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeaturePercentages {
    pub color: f64,
    pub texture: f64,
    pub shape: f64,
    pub size: f64,
}

impl FeaturePercentages {
    #[must_use]
    pub fn get(&self, feature: FeatureKind) -> f64 {
        match feature {
            FeatureKind::Color => self.color,
            FeatureKind::Texture => self.texture,
            FeatureKind::Shape => self.shape,
            FeatureKind::Size => self.size,
        }
    }
}

// =============================================================================
// EXPLANATION DATA
// =============================================================================

/// Importance of one spatial region of the image, in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionImportance {
    pub region: String,
    pub importance: f64,
}

impl RegionImportance {
    /// Label for the 0-based region index: "Region 1" .. "Region N".
    #[must_use]
    pub fn label(index: usize) -> String {
        format!("Region {}", index.saturating_add(1))
    }
}

/// How much one feature moved the weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: FeatureKind,
    /// Feature score as a percentage.
    pub percent: f64,
    /// Classifier weight for this feature.
    pub weight: f64,
    /// `weight * score`; contributions sum to the weighted total.
    pub contribution: f64,
}

/// Output of an explanation synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub features_percent: FeaturePercentages,
    pub contributions: Vec<FeatureContribution>,
    pub heatmap: Vec<RegionImportance>,
}

// =============================================================================
// PREDICTION
// =============================================================================

/// Names of the strategies that produced a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub scorer: String,
    pub confidence: String,
    pub explainer: String,
}

/// The record returned by one successful inference.
///
/// Immutable once built; the caller owns it for as long as it is displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub stage: Stage,
    /// Always in `[85, 97]`.
    pub confidence_percent: f64,
    /// Weighted total in `[0, 1]` that selected the stage.
    pub weighted_total: f64,
    pub features: FeaturePercentages,
    pub contributions: Vec<FeatureContribution>,
    /// Exactly ten entries, "Region 1" .. "Region 10".
    pub heatmap: Vec<RegionImportance>,
    pub model: ModelInfo,
}

impl Prediction {
    /// The explanation view of this prediction. Pure read, nothing is recomputed.
    #[must_use]
    pub fn explanation(&self) -> Explanation {
        Explanation {
            features_percent: self.features,
            contributions: self.contributions.clone(),
            heatmap: self.heatmap.clone(),
        }
    }

    /// The feature with the largest weighted contribution.
    #[must_use]
    pub fn dominant_feature(&self) -> Option<FeatureContribution> {
        self.contributions
            .iter()
            .copied()
            .max_by(|a, b| a.contribution.total_cmp(&b.contribution))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the grading pipeline.
///
/// Every failure is scoped to a single call; the pipeline stays reusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraderError {
    /// The payload is empty or cannot be analyzed.
    #[error("Could not analyze this image: {0}")]
    InvalidImage(String),

    /// A scoring backend could not be reached.
    #[error("Scoring backend unavailable: {0}")]
    ScoringUnavailable(String),

    /// Scoring exceeded the configured time limit.
    #[error("Inference timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    /// A feature score violated the `[0, 1]` range.
    #[error("Feature score out of range: {feature} = {value}")]
    InvalidFeatureScore { feature: FeatureKind, value: f64 },

    /// A stage name did not match any catalog entry.
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// The grading slot already has a request outstanding.
    #[error("An analysis is already in progress")]
    SlotBusy,

    /// Configuration was rejected.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl GraderError {
    /// Stable snake_case label for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            GraderError::InvalidImage(_) => "invalid_image",
            GraderError::ScoringUnavailable(_) => "scoring_unavailable",
            GraderError::Timeout { .. } => "timeout",
            GraderError::InvalidFeatureScore { .. } => "invalid_feature_score",
            GraderError::UnknownStage(_) => "unknown_stage",
            GraderError::SlotBusy => "slot_busy",
            GraderError::Config(_) => "config",
            GraderError::Io(_) => "io",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
