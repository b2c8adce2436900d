//! Constant-probability backend
//!
//! Every pixel receives the same probability. Useful for tests, for
//! benchmarking the compositor without a model, and for "keep everything"
//! (`1.0`) or "strokes only" (`0.0`) edits.

use crate::{
    error::{BackdropError, Result},
    segmentation::SegmentationBackend,
    types::ProbabilityMap,
};
use image::RgbImage;
use instant::Duration;

#[derive(Debug, Clone)]
pub struct UniformSegmenter {
    probability: f32,
    initialized: bool,
}

impl UniformSegmenter {
    /// Create a backend reporting `probability` everywhere
    ///
    /// # Errors
    /// - Probability not a finite value in `[0, 1]`
    pub fn new(probability: f32) -> Result<Self> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(BackdropError::config_value_error(
                "uniform probability",
                probability,
                "0.0-1.0",
                None,
            ));
        }
        Ok(Self {
            probability,
            initialized: false,
        })
    }

    #[must_use]
    pub fn probability(&self) -> f32 {
        self.probability
    }
}

impl SegmentationBackend for UniformSegmenter {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        self.initialized = true;
        Ok(Some(Duration::ZERO))
    }

    fn probability_map(&mut self, image: &RgbImage) -> Result<ProbabilityMap> {
        let (width, height) = image.dimensions();
        Ok(ProbabilityMap::uniform(width, height, self.probability))
    }

    fn name(&self) -> &str {
        "uniform"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
