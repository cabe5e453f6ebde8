//! # Feature Scorer
//!
//! Derives the four normalized feature scores from an image payload.
//!
//! - [`RandomFeatureScorer`]: reference strategy, uniform draws per feature
//! - [`PixelFeatureScorer`]: decodes the image and measures hue, surface
//!   variation, fill ratio and frame coverage of the fruit region
//!
//! Both reject empty payloads with `GraderError::InvalidImage` and keep no
//! state between calls beyond their random source.

use crate::rng::SharedRng;
use crate::types::{FeatureScores, GraderError, ImagePayload};
use std::sync::Arc;

// =============================================================================
// FEATURE SCORER TRAIT
// =============================================================================

/// Strategy that turns an image payload into feature scores.
///
/// Implementors must be `Send + Sync`; the orchestrator shares one instance
/// across concurrent inferences. A trained model satisfies the same contract:
/// four values in `[0, 1]`, or an error.
pub trait FeatureScorer: Send + Sync {
    /// Strategy name reported in `ModelInfo`.
    fn name(&self) -> &'static str;

    /// Score the payload.
    ///
    /// Returns `GraderError::InvalidImage` if the payload is empty or cannot
    /// be analyzed.
    fn score(&self, image: &ImagePayload) -> Result<FeatureScores, GraderError>;
}

// =============================================================================
// REFERENCE STRATEGY
// =============================================================================

/// Draws each score independently and uniformly from `[0, 1)`.
#[derive(Debug, Clone)]
pub struct RandomFeatureScorer {
    rng: Arc<SharedRng>,
}

impl RandomFeatureScorer {
    #[must_use]
    pub fn new(rng: Arc<SharedRng>) -> Self {
        Self { rng }
    }
}

impl FeatureScorer for RandomFeatureScorer {
    fn name(&self) -> &'static str {
        "reference-random"
    }

    fn score(&self, image: &ImagePayload) -> Result<FeatureScores, GraderError> {
        image.ensure_non_empty()?;
        FeatureScores::new(
            self.rng.unit(),
            self.rng.unit(),
            self.rng.unit(),
            self.rng.unit(),
        )
    }
}

// =============================================================================
// PIXEL STRATEGY
// =============================================================================

/// Longest edge the image is reduced to before measuring.
pub const DEFAULT_SAMPLE_EDGE: u32 = 128;

/// Minimum HSV saturation for a pixel to count as fruit.
const MIN_SATURATION: f64 = 0.2;

/// Minimum HSV value (brightness) for a pixel to count as fruit.
const MIN_BRIGHTNESS: f64 = 0.15;

/// Hue of an unripe fruit (pure green), in degrees.
const GREEN_HUE: f64 = 120.0;

/// Hue distance from green at which the color cue saturates.
const HUE_SPAN: f64 = 100.0;

/// Mean neighbour luminance difference that maps to a full texture score.
const TEXTURE_SATURATION: f64 = 0.125;

/// Fill ratio below which the shape cue is zero.
const MIN_FILL: f64 = 0.5;

/// Fill ratio range over which the shape cue rises to one.
const FILL_SPAN: f64 = 0.4;

/// Frame coverage that maps to a full size score.
const FULL_COVERAGE: f64 = 0.6;

/// Measures visual cues directly from decoded pixels.
///
/// The fruit region is every pixel that is both saturated and bright enough,
/// which separates a fruit from a plain light or dark backdrop.
/// - color: mean hue shift from green towards orange/red
/// - texture: neighbour luminance variation inside the fruit (spotting)
/// - shape: share of the bounding box the fruit fills (fullness)
/// - size: share of the frame the fruit covers
#[derive(Debug, Clone, Copy)]
pub struct PixelFeatureScorer {
    sample_edge: u32,
}

impl Default for PixelFeatureScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelFeatureScorer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sample_edge: DEFAULT_SAMPLE_EDGE,
        }
    }

    /// Use a different sampling resolution (at least 8 pixels).
    #[must_use]
    pub fn with_sample_edge(sample_edge: u32) -> Self {
        Self {
            sample_edge: sample_edge.max(8),
        }
    }
}

impl FeatureScorer for PixelFeatureScorer {
    fn name(&self) -> &'static str {
        "pixel-heuristic"
    }

    fn score(&self, image: &ImagePayload) -> Result<FeatureScores, GraderError> {
        image.ensure_non_empty()?;

        let decoded = image::load_from_memory(image.as_bytes())
            .map_err(|e| GraderError::InvalidImage(format!("undecodable image: {}", e)))?;

        let sampled = if decoded.width() > self.sample_edge || decoded.height() > self.sample_edge
        {
            decoded.thumbnail(self.sample_edge, self.sample_edge)
        } else {
            decoded
        };
        let rgb = sampled.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(GraderError::InvalidImage("image has no pixels".to_string()));
        }

        let pixels: Vec<PixelSample> = rgb
            .pixels()
            .map(|p| PixelSample::from_rgb(p.0[0], p.0[1], p.0[2]))
            .collect();

        measure(&pixels, width as usize, height as usize)
    }
}

/// HSV plus luminance of one pixel, all in `[0, 1]` except hue (degrees).
#[derive(Debug, Clone, Copy)]
struct PixelSample {
    hue: f64,
    saturation: f64,
    value: f64,
    luminance: f64,
}

impl PixelSample {
    fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let r = f64::from(r) / 255.0;
        let g = f64::from(g) / 255.0;
        let b = f64::from(b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta <= f64::EPSILON {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let saturation = if max <= f64::EPSILON { 0.0 } else { delta / max };

        Self {
            hue,
            saturation,
            value: max,
            luminance: 0.2126 * r + 0.7152 * g + 0.0722 * b,
        }
    }

    fn is_fruit(&self) -> bool {
        self.saturation >= MIN_SATURATION && self.value >= MIN_BRIGHTNESS
    }

    /// Hue with magenta/red wrapped below zero so reds sit next to orange.
    fn unwrapped_hue(&self) -> f64 {
        if self.hue >= 300.0 {
            self.hue - 360.0
        } else {
            self.hue
        }
    }
}

fn measure(pixels: &[PixelSample], width: usize, height: usize) -> Result<FeatureScores, GraderError> {
    let mut fruit = 0usize;
    let mut hue_sum = 0.0;
    let mut diff_sum = 0.0;
    let mut diff_pairs = 0usize;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (width, height, 0usize, 0usize);

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let px = pixels[idx];
            if !px.is_fruit() {
                continue;
            }

            fruit += 1;
            hue_sum += px.unwrapped_hue();
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            if x + 1 < width && pixels[idx + 1].is_fruit() {
                diff_sum += (px.luminance - pixels[idx + 1].luminance).abs();
                diff_pairs += 1;
            }
            if y + 1 < height && pixels[idx + width].is_fruit() {
                diff_sum += (px.luminance - pixels[idx + width].luminance).abs();
                diff_pairs += 1;
            }
        }
    }

    if fruit == 0 {
        return Err(GraderError::InvalidImage(
            "no fruit region detected".to_string(),
        ));
    }

    let mean_hue = hue_sum / fruit as f64;
    let color = (GREEN_HUE - mean_hue) / HUE_SPAN;

    let texture = if diff_pairs == 0 {
        0.0
    } else {
        (diff_sum / diff_pairs as f64) / TEXTURE_SATURATION
    };

    let box_area = (max_x - min_x + 1) * (max_y - min_y + 1);
    let fill = fruit as f64 / box_area as f64;
    let shape = (fill - MIN_FILL) / FILL_SPAN;

    let coverage = fruit as f64 / (width * height) as f64;
    let size = coverage / FULL_COVERAGE;

    tracing::debug!(
        fruit_pixels = fruit,
        mean_hue,
        fill,
        coverage,
        "pixel features measured"
    );

    Ok(FeatureScores::clamped(color, texture, shape, size))
}

// =============================================================================
// TESTS
// =============================================================================
