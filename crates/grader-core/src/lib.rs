//! # grader-core
//!
//! Fruit maturity inference and explanation pipeline.
//!
//! Given an image, the pipeline scores four visual features, folds them into a
//! weighted total, maps the total to one of five ripeness stages, estimates a
//! bounded confidence and attaches an explanation.
//!
//! ## Pipeline
//!
//! ```text
//! ImagePayload ─► FeatureScorer ─► MaturityClassifier ─► ConfidenceEstimator
//!                                          │
//!                                          └─► ExplanationSynthesizer ─► Prediction
//! ```
//!
//! Scorer, confidence and explanation are strategies behind traits. The
//! reference implementations reproduce the original random behavior, and the
//! pixel scorer and margin confidence are real measurements.
//!
//! ## Constraints
//!
//! - Weights and stage thresholds are fixed constants (see `primitives`)
//! - Every prediction carries exactly one stage
//! - Confidence is always within `[85, 97]`
//! - The heatmap always has ten regions
//! - The only async code is the settle delay in `orchestrator`

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod confidence;
pub mod config;
pub mod explain;
pub mod orchestrator;
pub mod primitives;
pub mod rng;
pub mod scorer;
pub mod session;
pub mod stage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Explanation, FeatureContribution, FeatureKind, FeaturePercentages, FeatureScores,
    GraderError, ImagePayload, ModelInfo, Prediction, RegionImportance,
};

// =============================================================================
// RE-EXPORTS: Pipeline
// =============================================================================

pub use catalog::{DecisionFactor, StageInfo, decision_factor, rationale};
pub use confidence::{ConfidenceEstimator, MarginConfidence, RandomConfidence, bound_confidence};
pub use config::{ConfidenceKind, PipelineConfig, ScorerKind};
pub use explain::{ExplanationSynthesizer, RandomHeatmap, contributions};
pub use orchestrator::InferenceOrchestrator;
pub use rng::SharedRng;
pub use scorer::{FeatureScorer, PixelFeatureScorer, RandomFeatureScorer};
pub use session::{GradingSession, RequestState, SessionSnapshot, Ticket};
pub use stage::{MaturityClassifier, Stage};
