//! # Stage Catalog
//!
//! Read-only descriptive data for each maturity stage, plus the decision
//! factor copy used to phrase a textual rationale.
//!
//! The catalog is display copy. The explanation synthesizer never reads it;
//! only [`rationale`] combines catalog text with a finished prediction.

use crate::stage::Stage;
use crate::types::{FeatureKind, Prediction};
use serde::Serialize;

/// Descriptive metadata for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    pub stage: Stage,
    pub number: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub characteristics: &'static [&'static str],
    pub recommendation: &'static str,
    pub time_to_ripe: &'static str,
    /// Display color hint (hex).
    pub color: &'static str,
}

static CATALOG: [StageInfo; 5] = [
    StageInfo {
        stage: Stage::Unripe,
        number: 1,
        name: "Unripe (Stage 1)",
        description: "Hard, green mango - not ready for harvest",
        characteristics: &[
            "Predominantly green",
            "Very firm texture",
            "High acidity",
            "Starch-rich",
        ],
        recommendation: "Keep on tree for 2-3 more weeks",
        time_to_ripe: "15-25 days",
        color: "#16a34a",
    },
    StageInfo {
        stage: Stage::MatureGreen,
        number: 2,
        name: "Mature Green (Stage 2)",
        description: "Ready for harvest - will ripen off tree",
        characteristics: &[
            "Light green",
            "Firm but yields slightly",
            "Shoulder development",
            "Suitable for transport",
        ],
        recommendation: "Optimal for commercial harvest and long-distance transport",
        time_to_ripe: "7-12 days at room temp",
        color: "#4ade80",
    },
    StageInfo {
        stage: Stage::Turning,
        number: 3,
        name: "Turning (Stage 3)",
        description: "Beginning to ripen - color break stage",
        characteristics: &[
            "Yellow patches appearing",
            "Softer texture",
            "Sweet aroma developing",
            "Sugar formation",
        ],
        recommendation: "Good for local markets. Ripen at room temperature",
        time_to_ripe: "3-5 days",
        color: "#eab308",
    },
    StageInfo {
        stage: Stage::Ripe,
        number: 4,
        name: "Ripe (Stage 4)",
        description: "Perfect for consumption",
        characteristics: &[
            "Yellow-orange color",
            "Soft but not mushy",
            "Strong sweet aroma",
            "Peak sweetness",
        ],
        recommendation: "Consume immediately or refrigerate for 2-3 days",
        time_to_ripe: "Ready to eat",
        color: "#f97316",
    },
    StageInfo {
        stage: Stage::Overripe,
        number: 5,
        name: "Overripe (Stage 5)",
        description: "Past optimal ripeness",
        characteristics: &[
            "Dark spots",
            "Very soft/mushy",
            "Fermented smell",
            "Quality degradation",
        ],
        recommendation: "Use immediately for smoothies, processing, or discard",
        time_to_ripe: "Past prime",
        color: "#dc2626",
    },
];

/// Look up the catalog entry for a stage. Total over the closed enumeration.
#[must_use]
pub fn lookup(stage: Stage) -> &'static StageInfo {
    match stage {
        Stage::Unripe => &CATALOG[0],
        Stage::MatureGreen => &CATALOG[1],
        Stage::Turning => &CATALOG[2],
        Stage::Ripe => &CATALOG[3],
        Stage::Overripe => &CATALOG[4],
    }
}

/// All catalog entries in ripening order.
#[must_use]
pub fn entries() -> &'static [StageInfo] {
    &CATALOG
}

// =============================================================================
// DECISION FACTORS
// =============================================================================

/// What the pipeline looks at for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecisionFactor {
    pub feature: FeatureKind,
    pub title: &'static str,
    pub detail: &'static str,
}

#[must_use]
pub fn decision_factor(feature: FeatureKind) -> DecisionFactor {
    let (title, detail) = match feature {
        FeatureKind::Color => (
            "Color Analysis",
            "Evaluated RGB distribution and dominant hues to determine ripeness stage",
        ),
        FeatureKind::Texture => (
            "Texture Detection",
            "Analyzed surface smoothness and spot patterns indicating maturity",
        ),
        FeatureKind::Shape => (
            "Shape Recognition",
            "Assessed fruit fullness and shoulder development",
        ),
        FeatureKind::Size => (
            "Size Estimation",
            "Compared proportions against typical maturity standards",
        ),
    };
    DecisionFactor {
        feature,
        title,
        detail,
    }
}

/// Compose a short textual rationale for a prediction.
///
/// First line states the stage and the band the weighted total fell into,
/// then one line per feature in descending contribution order.
#[must_use]
pub fn rationale(prediction: &Prediction) -> Vec<String> {
    let info = lookup(prediction.stage);
    let mut lines = Vec::with_capacity(prediction.contributions.len().saturating_add(1));

    let band = if prediction.stage.is_terminal() {
        format!(
            "[{:.2}, {:.2}]",
            prediction.stage.lower_bound(),
            prediction.stage.upper_bound()
        )
    } else {
        format!(
            "[{:.2}, {:.2})",
            prediction.stage.lower_bound(),
            prediction.stage.upper_bound()
        )
    };
    lines.push(format!(
        "Classified as {}: weighted score {:.3} falls in {} ({:.1}% confidence).",
        info.name, prediction.weighted_total, band, prediction.confidence_percent
    ));

    let mut ranked = prediction.contributions.clone();
    ranked.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
    for contribution in ranked {
        let factor = decision_factor(contribution.feature);
        lines.push(format!(
            "{}: {:.1}% x weight {:.1} = {:.3}. {}.",
            factor.title,
            contribution.percent,
            contribution.weight,
            contribution.contribution,
            factor.detail
        ));
    }

    lines
}

// =============================================================================
// TESTS
// =============================================================================
