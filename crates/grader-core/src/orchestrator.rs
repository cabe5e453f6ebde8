//! # Inference Orchestrator
//!
//! The single entry point the surrounding UI calls.
//!
//! ## Lifecycle of one call
//!
//! ```text
//! submit ──► Pending ──(settle delay)──► score ──► classify ──► confidence ──► explain ──► Resolved
//!               │                          │
//!               └── empty payload ─────────┴── scorer error / deadline ──────────────────► Rejected
//! ```
//!
//! The only suspension point is the settle delay. Classification, confidence
//! and explanation all run synchronously on the same `FeatureScores` value, so
//! they can never observe a stale or partial sample. A scorer failure aborts
//! the call before the classifier runs.
//!
//! The optional timeout bounds the scoring step only. Its clock starts when
//! the settle delay ends, so any positive limit leaves a resolvable call.

use crate::config::{ConfidenceKind, PipelineConfig, ScorerKind};
use crate::confidence::{ConfidenceEstimator, MarginConfidence, RandomConfidence};
use crate::explain::{ExplanationSynthesizer, RandomHeatmap};
use crate::primitives::DEFAULT_SETTLE_DELAY_MS;
use crate::rng::SharedRng;
use crate::scorer::{FeatureScorer, PixelFeatureScorer, RandomFeatureScorer};
use crate::stage::MaturityClassifier;
use crate::types::{FeatureScores, GraderError, ImagePayload, ModelInfo, Prediction};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Counts a call as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sequences scorer, classifier, confidence estimator and synthesizer.
pub struct InferenceOrchestrator {
    scorer: Arc<dyn FeatureScorer>,
    classifier: MaturityClassifier,
    confidence: Arc<dyn ConfidenceEstimator>,
    explainer: Arc<dyn ExplanationSynthesizer>,
    settle_delay: Duration,
    timeout: Option<Duration>,
    in_flight: AtomicUsize,
}

impl std::fmt::Debug for InferenceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceOrchestrator")
            .field("model", &self.model_info())
            .field("settle_delay", &self.settle_delay)
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl InferenceOrchestrator {
    /// Assemble an orchestrator from explicit strategies, with the default
    /// settle delay and no timeout.
    #[must_use]
    pub fn new(
        scorer: Arc<dyn FeatureScorer>,
        confidence: Arc<dyn ConfidenceEstimator>,
        explainer: Arc<dyn ExplanationSynthesizer>,
    ) -> Self {
        Self {
            scorer,
            classifier: MaturityClassifier::new(),
            confidence,
            explainer,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            timeout: None,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Reference pipeline: every strategy draws from one shared random source.
    #[must_use]
    pub fn reference(seed: Option<u64>) -> Self {
        let rng = Arc::new(SharedRng::from_seed_option(seed));
        Self::new(
            Arc::new(RandomFeatureScorer::new(Arc::clone(&rng))),
            Arc::new(RandomConfidence::new(Arc::clone(&rng))),
            Arc::new(RandomHeatmap::new(rng)),
        )
    }

    /// Build the pipeline described by a configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, GraderError> {
        config.validate()?;

        let rng = Arc::new(SharedRng::from_seed_option(config.seed));
        let scorer: Arc<dyn FeatureScorer> = match config.scorer {
            ScorerKind::Reference => Arc::new(RandomFeatureScorer::new(Arc::clone(&rng))),
            ScorerKind::Pixel => Arc::new(PixelFeatureScorer::new()),
        };
        let confidence: Arc<dyn ConfidenceEstimator> = match config.confidence {
            ConfidenceKind::Reference => Arc::new(RandomConfidence::new(Arc::clone(&rng))),
            ConfidenceKind::Margin => Arc::new(MarginConfidence::new()),
        };
        let explainer = Arc::new(RandomHeatmap::new(rng));

        let mut orchestrator =
            Self::new(scorer, confidence, explainer).with_settle_delay(config.settle_delay());
        orchestrator.timeout = config.timeout();
        Ok(orchestrator)
    }

    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Bound the scoring step. A zero limit leaves the call unbounded.
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = (!limit.is_zero()).then_some(limit);
        self
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Number of calls currently between submit and resolve/reject.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            scorer: self.scorer.name().to_string(),
            confidence: self.confidence.name().to_string(),
            explainer: self.explainer.name().to_string(),
        }
    }

    /// Run one inference.
    ///
    /// Resolves no earlier than the settle delay. Rejects with
    /// `InvalidImage` for an empty payload (immediately) or whatever the
    /// scorer reports, and with `Timeout` if scoring outlasts the configured
    /// bound.
    #[tracing::instrument(name = "infer", skip_all, fields(bytes = image.len()))]
    pub async fn infer(&self, image: &ImagePayload) -> Result<Prediction, GraderError> {
        let _in_flight = InFlight::enter(&self.in_flight);
        let started = Instant::now();
        tracing::debug!("inference submitted");

        if let Err(e) = image.ensure_non_empty() {
            tracing::warn!(kind = e.kind(), "inference rejected: {}", e);
            return Err(e);
        }

        tokio::time::sleep(self.settle_delay).await;
        let scoring_started = Instant::now();

        let features = match self.scorer.score(image) {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(kind = e.kind(), scorer = self.scorer.name(), "inference rejected: {}", e);
                return Err(e);
            }
        };
        tracing::debug!(
            color = features.color(),
            texture = features.texture(),
            shape = features.shape(),
            size = features.size(),
            "features scored"
        );

        let elapsed = scoring_started.elapsed();
        if let Some(limit) = self.timeout {
            if elapsed > limit {
                let e = GraderError::Timeout {
                    limit_ms: limit.as_millis() as u64,
                };
                tracing::warn!(kind = e.kind(), elapsed_ms = elapsed.as_millis() as u64, "inference rejected: {}", e);
                return Err(e);
            }
        }

        let prediction = self.predict(&features);
        tracing::info!(
            stage = %prediction.stage,
            confidence = prediction.confidence_percent,
            weighted_total = prediction.weighted_total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "inference resolved"
        );
        Ok(prediction)
    }

    /// Classify, estimate and explain one scored sample.
    ///
    /// Every step reads the same `features` value.
    #[must_use]
    pub fn predict(&self, features: &FeatureScores) -> Prediction {
        let weighted_total = self.classifier.weighted_total(features);
        let stage = self.classifier.stage_for_total(weighted_total);
        tracing::debug!(%stage, weighted_total, "stage classified");

        let confidence_percent = self.confidence.estimate_confidence(features, stage);
        let explanation = self.explainer.explain(features);

        Prediction {
            stage,
            confidence_percent,
            weighted_total,
            features: explanation.features_percent,
            contributions: explanation.contributions,
            heatmap: explanation.heatmap,
            model: self.model_info(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
