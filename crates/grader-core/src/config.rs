//! # Pipeline Configuration
//!
//! Serializable description of which strategies to run and how long an
//! inference must settle. Loaded by the app from the `[pipeline]` table.

use crate::primitives::DEFAULT_SETTLE_DELAY_MS;
use crate::types::GraderError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Feature scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Uniform random scores.
    #[default]
    Reference,
    /// Decode the image and measure pixels.
    Pixel,
}

/// Confidence estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceKind {
    /// Uniform random headroom.
    #[default]
    Reference,
    /// Headroom from distance to the nearest stage boundary.
    Margin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum time before an inference resolves.
    pub settle_delay_ms: u64,
    /// Upper bound on a whole inference; `None` disables the bound.
    pub timeout_ms: Option<u64>,
    /// Seed for every random strategy; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub scorer: ScorerKind,
    pub confidence: ConfidenceKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            timeout_ms: None,
            seed: None,
            scorer: ScorerKind::Reference,
            confidence: ConfidenceKind::Reference,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Reject a timeout that could never be met.
    ///
    /// The timeout bounds scoring alone, so it is independent of the settle
    /// delay.
    pub fn validate(&self) -> Result<(), GraderError> {
        if self.timeout_ms == Some(0) {
            return Err(GraderError::Config("timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}
