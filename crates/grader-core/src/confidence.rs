//! # Confidence Module
//!
//! Confidence estimation for a classification.
//!
//! - Always in `[85, 97]`: base 85 plus up to 12 of headroom
//! - Reference strategy draws the headroom at random
//! - Margin strategy grows with distance from the nearest stage boundary

use crate::primitives::{CONFIDENCE_BASE, CONFIDENCE_HEADROOM, CONFIDENCE_MAX, STAGE_BAND_WIDTH};
use crate::rng::SharedRng;
use crate::stage::{MaturityClassifier, Stage};
use crate::types::FeatureScores;
use std::sync::Arc;

/// Clamp any raw estimate into the reportable range.
///
/// NaN collapses to the base value.
#[must_use]
pub fn bound_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        return CONFIDENCE_BASE;
    }
    raw.clamp(CONFIDENCE_BASE, CONFIDENCE_MAX)
}

/// Strategy that estimates confidence in a stage assignment.
pub trait ConfidenceEstimator: Send + Sync {
    /// Strategy name reported in `ModelInfo`.
    fn name(&self) -> &'static str;

    /// Raw estimate in percent. Callers pass it through [`bound_confidence`].
    fn estimate(&self, features: &FeatureScores, stage: Stage) -> f64;

    /// Bounded estimate in `[85, 97]`.
    fn estimate_confidence(&self, features: &FeatureScores, stage: Stage) -> f64 {
        bound_confidence(self.estimate(features, stage))
    }
}

/// Reference strategy: `85 + U[0, 12)`.
#[derive(Debug, Clone)]
pub struct RandomConfidence {
    rng: Arc<SharedRng>,
}

impl RandomConfidence {
    #[must_use]
    pub fn new(rng: Arc<SharedRng>) -> Self {
        Self { rng }
    }
}

impl ConfidenceEstimator for RandomConfidence {
    fn name(&self) -> &'static str {
        "reference-random"
    }

    fn estimate(&self, _features: &FeatureScores, _stage: Stage) -> f64 {
        CONFIDENCE_BASE + self.rng.scaled(CONFIDENCE_HEADROOM)
    }
}

/// Margin strategy: headroom scales with distance to the nearest boundary.
///
/// A total sitting on a threshold scores 85; a total half a band (0.1) or
/// more away from every threshold scores 97.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarginConfidence {
    classifier: MaturityClassifier,
}

impl MarginConfidence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfidenceEstimator for MarginConfidence {
    fn name(&self) -> &'static str {
        "threshold-margin"
    }

    fn estimate(&self, features: &FeatureScores, _stage: Stage) -> f64 {
        let total = self.classifier.weighted_total(features);
        let margin = self.classifier.margin(total);
        let ratio = (margin / (STAGE_BAND_WIDTH / 2.0)).min(1.0);
        CONFIDENCE_BASE + CONFIDENCE_HEADROOM * ratio
    }
}

// =============================================================================
// TESTS
// =============================================================================
