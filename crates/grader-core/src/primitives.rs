//! # Pipeline Primitives
//!
//! Fixed contract values for the grading pipeline.
//!
//! These are compiled into the binary and immutable at runtime. Changing the
//! relative importance of a cue means changing a weight here, never retraining
//! an opaque model. Weights and thresholds are the single source of truth for
//! stage assignment.

use crate::types::FeatureKind;

/// Classifier weight for the color cue.
pub const COLOR_WEIGHT: f64 = 0.4;

/// Classifier weight for the texture cue.
pub const TEXTURE_WEIGHT: f64 = 0.3;

/// Classifier weight for the shape cue.
pub const SHAPE_WEIGHT: f64 = 0.2;

/// Classifier weight for the size cue.
pub const SIZE_WEIGHT: f64 = 0.1;

/// Width of each stage band on the weighted total.
pub const STAGE_BAND_WIDTH: f64 = 0.2;

/// Interior decision boundaries between adjacent stages, ascending.
pub const STAGE_THRESHOLDS: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// A weighted total this close to a threshold is read as the threshold itself.
///
/// Absorbs summation rounding, e.g. `0.2 * 0.7 + 0.1 * 0.6` evaluating to
/// `0.19999999999999998`.
pub const BOUNDARY_TOLERANCE: f64 = 1e-12;

/// Lowest confidence ever reported, in percent.
pub const CONFIDENCE_BASE: f64 = 85.0;

/// Headroom above the base; confidence never exceeds base + headroom.
pub const CONFIDENCE_HEADROOM: f64 = 12.0;

/// Highest confidence ever reported, in percent.
pub const CONFIDENCE_MAX: f64 = CONFIDENCE_BASE + CONFIDENCE_HEADROOM;

/// Number of spatial regions in every heatmap.
pub const HEATMAP_REGIONS: usize = 10;

/// Default settle delay before an inference may resolve (milliseconds).
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Weight for a feature.
#[must_use]
pub fn weight(feature: FeatureKind) -> f64 {
    match feature {
        FeatureKind::Color => COLOR_WEIGHT,
        FeatureKind::Texture => TEXTURE_WEIGHT,
        FeatureKind::Shape => SHAPE_WEIGHT,
        FeatureKind::Size => SIZE_WEIGHT,
    }
}
