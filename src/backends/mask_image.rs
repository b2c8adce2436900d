//! Backend that reads probabilities from a grayscale image
//!
//! Lets a matte produced by another tool (or by hand) drive the compositor.
//! Pixel value `v` becomes probability `v / 255`; the matte is resampled
//! bilinearly when its size differs from the photo.

use crate::{
    error::{BackdropError, Result},
    segmentation::SegmentationBackend,
    types::ProbabilityMap,
};
use image::{GrayImage, RgbImage};
use instant::{Duration, Instant};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MaskImageSegmenter {
    source: Option<PathBuf>,
    probabilities: Option<ProbabilityMap>,
}

impl MaskImageSegmenter {
    /// Backend that loads its matte from `path` on initialization
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: Some(path.as_ref().to_path_buf()),
            probabilities: None,
        }
    }

    /// Backend over an in-memory matte; already initialized
    #[must_use]
    pub fn from_image(matte: &GrayImage) -> Self {
        Self {
            source: None,
            probabilities: Some(ProbabilityMap::from_gray_image(matte)),
        }
    }
}

impl SegmentationBackend for MaskImageSegmenter {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        if self.probabilities.is_some() {
            return Ok(None);
        }
        let path = self
            .source
            .as_ref()
            .ok_or_else(|| BackdropError::segmentation("Mask image backend has no source"))?;

        let start = Instant::now();
        let matte = image::open(path)
            .map_err(|e| {
                BackdropError::segmentation(format!(
                    "Failed to load mask image '{}': {}",
                    path.display(),
                    e
                ))
            })?
            .to_luma8();
        log::debug!(
            "Loaded mask image {} ({}x{})",
            path.display(),
            matte.width(),
            matte.height()
        );
        self.probabilities = Some(ProbabilityMap::from_gray_image(&matte));
        Ok(Some(start.elapsed()))
    }

    fn probability_map(&mut self, image: &RgbImage) -> Result<ProbabilityMap> {
        let probabilities = self
            .probabilities
            .as_ref()
            .ok_or_else(|| BackdropError::segmentation("Mask image backend not initialized"))?;
        let (width, height) = image.dimensions();
        if probabilities.dimensions() != (width, height) {
            log::debug!(
                "Resampling mask image from {}x{} to {}x{}",
                probabilities.width(),
                probabilities.height(),
                width,
                height
            );
        }
        Ok(probabilities.resize(width, height))
    }

    fn name(&self) -> &str {
        "mask-image"
    }

    fn is_initialized(&self) -> bool {
        self.probabilities.is_some()
    }
}
