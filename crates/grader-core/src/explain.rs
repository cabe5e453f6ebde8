//! # Explanation Synthesizer
//!
//! Builds the explanation attached to every prediction:
//! - feature scores as percentages
//! - per-feature weighted contributions (sum to the weighted total)
//! - a fixed-length spatial importance heatmap
//!
//! Synthesizers never read catalog copy.

use crate::primitives::{HEATMAP_REGIONS, weight};
use crate::rng::SharedRng;
use crate::types::{Explanation, FeatureContribution, FeatureKind, FeatureScores, RegionImportance};
use std::sync::Arc;

/// Per-feature contribution breakdown, in canonical feature order.
#[must_use]
pub fn contributions(features: &FeatureScores) -> Vec<FeatureContribution> {
    FeatureKind::ALL
        .iter()
        .map(|&feature| {
            let score = features.get(feature);
            let w = weight(feature);
            FeatureContribution {
                feature,
                percent: score * 100.0,
                weight: w,
                contribution: w * score,
            }
        })
        .collect()
}

/// Strategy that produces the spatial part of an explanation.
pub trait ExplanationSynthesizer: Send + Sync {
    /// Strategy name reported in `ModelInfo`.
    fn name(&self) -> &'static str;

    /// Importance in `[0, 100]` for each of the `HEATMAP_REGIONS` regions,
    /// in region order.
    fn region_importances(&self, features: &FeatureScores) -> Vec<f64>;

    /// Full explanation for a feature set.
    ///
    /// The heatmap is normalized here so every strategy yields exactly
    /// `HEATMAP_REGIONS` labeled entries within `[0, 100]`: missing regions
    /// read as 0, extra values are dropped, NaN reads as 0.
    fn explain(&self, features: &FeatureScores) -> Explanation {
        let mut raw = self.region_importances(features).into_iter();
        let heatmap = (0..HEATMAP_REGIONS)
            .map(|index| {
                let value = raw.next().unwrap_or(0.0);
                RegionImportance {
                    region: RegionImportance::label(index),
                    importance: if value.is_nan() {
                        0.0
                    } else {
                        value.clamp(0.0, 100.0)
                    },
                }
            })
            .collect();

        Explanation {
            features_percent: features.to_percentages(),
            contributions: contributions(features),
            heatmap,
        }
    }
}

/// Reference strategy: independent uniform importance per region.
#[derive(Debug, Clone)]
pub struct RandomHeatmap {
    rng: Arc<SharedRng>,
}

impl RandomHeatmap {
    #[must_use]
    pub fn new(rng: Arc<SharedRng>) -> Self {
        Self { rng }
    }
}

impl ExplanationSynthesizer for RandomHeatmap {
    fn name(&self) -> &'static str {
        "reference-random"
    }

    fn region_importances(&self, _features: &FeatureScores) -> Vec<f64> {
        (0..HEATMAP_REGIONS).map(|_| self.rng.scaled(100.0)).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
