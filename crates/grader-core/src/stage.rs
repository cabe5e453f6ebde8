//! # Maturity Stages and Classification
//!
//! Five ripening stages, totally ordered, and the classifier that maps a
//! weighted feature total onto them.
//!
//! ## Stage Bands
//!
//! | Stage | Number | Weighted Total |
//! |-------|--------|----------------|
//! | Unripe | 1 | `[0.0, 0.2)` |
//! | Mature Green | 2 | `[0.2, 0.4)` |
//! | Turning | 3 | `[0.4, 0.6)` |
//! | Ripe | 4 | `[0.6, 0.8)` |
//! | Overripe | 5 | `[0.8, 1.0]` |
//!
//! A boundary value belongs to the later stage. The last band is closed at 1.0.
//!
//! ## Weighted Total
//!
//! `total = 0.4·color + 0.3·texture + 0.2·shape + 0.1·size`

use crate::primitives::{BOUNDARY_TOLERANCE, STAGE_BAND_WIDTH, STAGE_THRESHOLDS, weight};
use crate::types::{FeatureKind, FeatureScores, GraderError};
use serde::{Deserialize, Serialize};

// =============================================================================
// STAGE ENUM
// =============================================================================

/// Ripening stage, ordered from least to most mature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Unripe,
    MatureGreen,
    Turning,
    Ripe,
    Overripe,
}

impl Stage {
    /// All stages in ripening order.
    pub const ALL: [Stage; 5] = [
        Stage::Unripe,
        Stage::MatureGreen,
        Stage::Turning,
        Stage::Ripe,
        Stage::Overripe,
    ];

    /// Wire identifier (`mature_green`, ...).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Unripe => "unripe",
            Stage::MatureGreen => "mature_green",
            Stage::Turning => "turning",
            Stage::Ripe => "ripe",
            Stage::Overripe => "overripe",
        }
    }

    /// 1-based position in the ripening progression.
    #[must_use]
    pub fn number(&self) -> u8 {
        match self {
            Stage::Unripe => 1,
            Stage::MatureGreen => 2,
            Stage::Turning => 3,
            Stage::Ripe => 4,
            Stage::Overripe => 5,
        }
    }

    /// Inclusive lower bound of this stage's band on the weighted total.
    #[must_use]
    pub fn lower_bound(&self) -> f64 {
        match self {
            Stage::Unripe => 0.0,
            Stage::MatureGreen => STAGE_THRESHOLDS[0],
            Stage::Turning => STAGE_THRESHOLDS[1],
            Stage::Ripe => STAGE_THRESHOLDS[2],
            Stage::Overripe => STAGE_THRESHOLDS[3],
        }
    }

    /// Upper bound of this stage's band (exclusive, except for `Overripe`).
    #[must_use]
    pub fn upper_bound(&self) -> f64 {
        self.lower_bound() + STAGE_BAND_WIDTH
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Unripe => Some(Stage::MatureGreen),
            Stage::MatureGreen => Some(Stage::Turning),
            Stage::Turning => Some(Stage::Ripe),
            Stage::Ripe => Some(Stage::Overripe),
            Stage::Overripe => None,
        }
    }

    /// Get the previous stage, if any.
    #[must_use]
    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::Unripe => None,
            Stage::MatureGreen => Some(Stage::Unripe),
            Stage::Turning => Some(Stage::MatureGreen),
            Stage::Ripe => Some(Stage::Turning),
            Stage::Overripe => Some(Stage::Ripe),
        }
    }

    /// Check if this stage is terminal (Overripe).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Overripe)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = GraderError;

    /// Accepts the wire identifier, case-insensitively, with `-` or space in
    /// place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| GraderError::UnknownStage(s.to_string()))
    }
}

// =============================================================================
// MATURITY CLASSIFIER
// =============================================================================

/// Maturity Classifier - pure function from feature scores to a stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaturityClassifier;

impl MaturityClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Weighted total of the four scores, in `[0, 1]`.
    ///
    /// A sum within `BOUNDARY_TOLERANCE` of a threshold snaps onto it, so an
    /// exact boundary total always reaches the later stage.
    #[must_use]
    pub fn weighted_total(&self, features: &FeatureScores) -> f64 {
        let total: f64 = FeatureKind::ALL
            .iter()
            .map(|f| weight(*f) * features.get(*f))
            .sum();
        STAGE_THRESHOLDS
            .iter()
            .chain(&[1.0])
            .copied()
            .find(|threshold| (total - threshold).abs() <= BOUNDARY_TOLERANCE)
            .unwrap_or(total)
            .clamp(0.0, 1.0)
    }

    /// Classify feature scores into exactly one stage.
    #[must_use]
    pub fn classify(&self, features: &FeatureScores) -> Stage {
        self.stage_for_total(self.weighted_total(features))
    }

    /// Map a weighted total onto its band.
    #[must_use]
    pub fn stage_for_total(&self, total: f64) -> Stage {
        Stage::ALL
            .into_iter()
            .rev()
            .find(|stage| total >= stage.lower_bound())
            .unwrap_or(Stage::Unripe)
    }

    /// Distance from `total` to the nearest interior decision boundary.
    ///
    /// The outer edges 0.0 and 1.0 are not decision boundaries, so a total of
    /// 0.0 has margin 0.2.
    #[must_use]
    pub fn margin(&self, total: f64) -> f64 {
        STAGE_THRESHOLDS
            .iter()
            .map(|threshold| (total - threshold).abs())
            .fold(f64::INFINITY, f64::min)
    }
}

// =============================================================================
// TESTS
// =============================================================================
