//! # Property-Based Tests
//!
//! Classification totality, strategy bounds and seeded determinism.

use grader_core::{
    ConfidenceEstimator, ExplanationSynthesizer, FeatureScores, InferenceOrchestrator,
    MarginConfidence, MaturityClassifier, RandomConfidence, RandomHeatmap, SharedRng, Stage,
    bound_confidence, contributions,
};
use proptest::prelude::*;
use std::sync::Arc;

fn unit() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

fn features() -> impl Strategy<Value = FeatureScores> {
    (unit(), unit(), unit(), unit()).prop_map(|(c, t, s, z)| {
        FeatureScores::new(c, t, s, z).expect("generated scores are in range")
    })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every total in [0, 1] lands in exactly one stage interval.
    #[test]
    fn intervals_are_exhaustive_and_disjoint(total in unit()) {
        let stage = MaturityClassifier::new().stage_for_total(total);

        let containing: Vec<Stage> = Stage::ALL
            .iter()
            .copied()
            .filter(|s| {
                total >= s.lower_bound()
                    && (total < s.upper_bound() || (s.is_terminal() && total <= s.upper_bound()))
            })
            .collect();

        prop_assert_eq!(containing, vec![stage]);
    }

    /// Classification is a pure function of the features.
    #[test]
    fn classify_is_deterministic(f in features()) {
        let classifier = MaturityClassifier::new();
        prop_assert_eq!(classifier.classify(&f), classifier.classify(&f));
    }

    /// Raising any single feature never moves the stage backwards.
    #[test]
    fn classify_is_monotone(f in features(), bump in unit()) {
        let classifier = MaturityClassifier::new();
        let raised = FeatureScores::clamped(
            (f.color() + bump).min(1.0),
            f.texture(),
            f.shape(),
            f.size(),
        );
        prop_assert!(classifier.classify(&raised) >= classifier.classify(&f));
    }

    /// Contributions always sum to the weighted total.
    #[test]
    fn contributions_sum_to_total(f in features()) {
        let sum: f64 = contributions(&f).iter().map(|c| c.contribution).sum();
        let total = MaturityClassifier::new().weighted_total(&f);
        prop_assert!((sum - total).abs() < 1e-9);
    }

    /// Confidence stays in [85, 97] for both strategies.
    #[test]
    fn confidence_is_bounded(f in features(), seed in any::<u64>()) {
        let stage = MaturityClassifier::new().classify(&f);
        let random = RandomConfidence::new(Arc::new(SharedRng::seeded(seed)));
        let margin = MarginConfidence::new();

        for c in [
            random.estimate_confidence(&f, stage),
            margin.estimate_confidence(&f, stage),
        ] {
            prop_assert!((85.0..=97.0).contains(&c), "confidence = {}", c);
        }
    }

    /// Any raw value clamps into range.
    #[test]
    fn bound_confidence_clamps(raw in any::<f64>()) {
        let c = bound_confidence(raw);
        prop_assert!((85.0..=97.0).contains(&c));
    }

    /// Heatmap always has ten entries within [0, 100].
    #[test]
    fn heatmap_is_well_formed(f in features(), seed in any::<u64>()) {
        let heatmap = RandomHeatmap::new(Arc::new(SharedRng::seeded(seed))).explain(&f).heatmap;

        prop_assert_eq!(heatmap.len(), 10);
        for region in &heatmap {
            prop_assert!((0.0..=100.0).contains(&region.importance));
        }
    }

    /// Same seed and features give the same prediction.
    #[test]
    fn seeded_prediction_is_reproducible(f in features(), seed in any::<u64>()) {
        let a = InferenceOrchestrator::reference(Some(seed)).predict(&f);
        let b = InferenceOrchestrator::reference(Some(seed)).predict(&f);
        prop_assert_eq!(a, b);
    }

    /// Out-of-range scores are rejected.
    #[test]
    fn out_of_range_scores_rejected(bad in prop_oneof![-10.0f64..-1e-9, 1.000_000_1f64..10.0]) {
        prop_assert!(FeatureScores::new(bad, 0.5, 0.5, 0.5).is_err());
        prop_assert!(FeatureScores::new(0.5, 0.5, 0.5, bad).is_err());
    }
}
