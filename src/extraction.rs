//! Automatic foreground mask extraction from segmentation probabilities

use crate::{
    config::{ComponentSelection, ExtractionConfig},
    error::Result,
    morphology::{close_square, ComponentLabels},
    types::{Mask, ProbabilityMap, BACKGROUND, FOREGROUND},
};
use image::{GrayImage, ImageBuffer, Luma};
use log::debug;

/// Turns a probability map into a single-subject binary mask
#[derive(Debug, Clone, Default)]
pub struct ForegroundExtractor {
    config: ExtractionConfig,
}

impl ForegroundExtractor {
    /// Create an extractor, validating its configuration
    ///
    /// # Errors
    /// - Invalid threshold or closing parameters
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Threshold, close, and keep the subject component
    pub fn extract(&self, probabilities: &ProbabilityMap) -> Result<Mask> {
        let binary = self.threshold(probabilities);
        let closed = close_square(&binary, self.config.closing_radius()?);
        let subject = self.select_subject(&closed);
        Ok(Mask::from_image(&subject))
    }

    /// Pixels with probability strictly above the threshold become foreground
    #[must_use]
    pub fn threshold(&self, probabilities: &ProbabilityMap) -> GrayImage {
        let threshold = self.config.probability_threshold;
        let (width, height) = probabilities.dimensions();
        ImageBuffer::from_fn(width, height, |x, y| {
            if probabilities.get(x, y) > threshold {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        })
    }

    /// Keep exactly one connected component according to the selection policy
    #[must_use]
    pub fn select_subject(&self, binary: &GrayImage) -> GrayImage {
        let components = ComponentLabels::label(binary);
        if components.count() <= 1 {
            return binary.clone();
        }

        let chosen = match self.config.selection {
            ComponentSelection::Largest => components
                .labels()
                .max_by_key(|&l| (components.area(l), components.top_half_area(l), rank(l))),
            ComponentSelection::PreferTopHalf => components
                .labels()
                .max_by_key(|&l| (components.top_half_area(l), components.area(l), rank(l))),
        };

        match chosen {
            Some(label) => {
                debug!(
                    "Keeping component {} of {} ({} px, {} px in top half)",
                    label,
                    components.count(),
                    components.area(label),
                    components.top_half_area(label)
                );
                components.isolate(label)
            },
            None => binary.clone(),
        }
    }
}

/// Lower labels rank higher on full ties
fn rank(label: u32) -> std::cmp::Reverse<u32> {
    std::cmp::Reverse(label)
}
