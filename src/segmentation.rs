//! Segmentation backend abstraction
//!
//! A backend is an opaque oracle that turns an RGB image into per-pixel
//! foreground probabilities. Everything downstream (thresholding, closing,
//! component selection) lives in [`crate::extraction`].

use crate::{error::Result, types::ProbabilityMap};
use image::RgbImage;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for segmentation backends
pub trait SegmentationBackend {
    /// Load models or other resources; called lazily before the first map
    ///
    /// Returns the load time on the first call and `None` once initialized.
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - Model cannot be prepared for inference
    fn initialize(&mut self) -> Result<Option<Duration>>;

    /// Produce a probability map with the same dimensions as `image`
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Inference or tensor conversion failures
    fn probability_map(&mut self, image: &RgbImage) -> Result<ProbabilityMap>;

    /// Short identifier used in logs and metadata
    fn name(&self) -> &str;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}

impl<B: SegmentationBackend + ?Sized> SegmentationBackend for Box<B> {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        (**self).initialize()
    }

    fn probability_map(&mut self, image: &RgbImage) -> Result<ProbabilityMap> {
        (**self).probability_map(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }
}
