//! Background replacement processor
//!
//! [`BackgroundReplacer`] owns a segmentation backend and runs the full
//! pipeline: gradient generation, automatic mask extraction, manual mask
//! merge and compositing. It is used by both the CLI and [`EditSession`].
//!
//! [`EditSession`]: crate::session::EditSession

use crate::{
    config::ReplacementConfig,
    error::{BackdropError, Result},
    extraction::ForegroundExtractor,
    gradient::{create_gradient_background, GradientPreset, GradientSpec},
    segmentation::SegmentationBackend,
    types::{Mask, ProcessingMetadata, ProcessingTimings, ReplacementResult},
};
use chrono::Utc;
use image::{ImageBuffer, RgbImage};
use instant::Instant;
use log::{info, log};
use tracing::{debug as trace_debug, info as trace_info, instrument, span, Level};

/// Take `image` where the mask is foreground and `background` elsewhere
///
/// # Errors
/// - `background` or `mask` sized differently from `image`
pub fn composite(image: &RgbImage, background: &RgbImage, mask: &Mask) -> Result<RgbImage> {
    let dimensions = image.dimensions();
    if background.dimensions() != dimensions {
        return Err(BackdropError::dimension_mismatch(
            "Background",
            dimensions,
            background.dimensions(),
        ));
    }
    if mask.dimensions() != dimensions {
        return Err(BackdropError::dimension_mismatch(
            "Mask",
            dimensions,
            mask.dimensions(),
        ));
    }

    Ok(ImageBuffer::from_fn(dimensions.0, dimensions.1, |x, y| {
        if mask.is_foreground(x, y) {
            *image.get_pixel(x, y)
        } else {
            *background.get_pixel(x, y)
        }
    }))
}

/// Replaces photo backgrounds with gradients
pub struct BackgroundReplacer {
    config: ReplacementConfig,
    extractor: ForegroundExtractor,
    backend: Box<dyn SegmentationBackend>,
}

impl std::fmt::Debug for BackgroundReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundReplacer")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl BackgroundReplacer {
    /// Create a replacer around a (possibly uninitialized) backend
    ///
    /// # Errors
    /// - Invalid replacement configuration
    pub fn new(config: ReplacementConfig, backend: Box<dyn SegmentationBackend>) -> Result<Self> {
        config.validate()?;
        let extractor = ForegroundExtractor::new(config.extraction.clone())?;
        Ok(Self {
            config,
            extractor,
            backend,
        })
    }

    /// Initialize the backend if it is not ready yet
    ///
    /// Returns the model load time in milliseconds (0 when already initialized).
    ///
    /// # Errors
    /// - Backend initialization failures
    pub fn initialize(&mut self) -> Result<u64> {
        if self.backend.is_initialized() {
            return Ok(0);
        }
        info!("Initializing segmentation backend '{}'", self.backend.name());
        let load_time = self.backend.initialize()?;
        Ok(load_time.map_or(0, |d| d.as_millis() as u64))
    }

    /// Replace the background of `image` with a preset gradient
    ///
    /// When `manual_mask` is given it is binarized (nonzero becomes
    /// foreground) and OR-ed into the automatic mask.
    ///
    /// # Errors
    /// - Manual mask or backend output sized differently from `image`
    /// - Backend initialization or inference failures
    pub fn change_background(
        &mut self,
        image: &RgbImage,
        preset: GradientPreset,
        manual_mask: Option<&Mask>,
    ) -> Result<ReplacementResult> {
        let spec = preset.spec();
        self.replace_with(image, preset, &spec, manual_mask)
    }

    /// Replace the background with an arbitrary gradient
    ///
    /// # Errors
    /// Same as [`BackgroundReplacer::change_background`].
    pub fn with_gradient(
        &mut self,
        image: &RgbImage,
        spec: &GradientSpec,
        manual_mask: Option<&Mask>,
    ) -> Result<ReplacementResult> {
        // Metadata records the matching preset, or the default one for custom colors
        let preset = GradientPreset::all()
            .into_iter()
            .find(|p| p.spec() == *spec)
            .unwrap_or_default();
        self.replace_with(image, preset, spec, manual_mask)
    }

    /// Compute the mask that would select source pixels, without compositing
    ///
    /// # Errors
    /// Same as [`BackgroundReplacer::change_background`].
    pub fn extract_foreground(
        &mut self,
        image: &RgbImage,
        manual_mask: Option<&Mask>,
    ) -> Result<Mask> {
        if let Some(manual) = manual_mask {
            Self::check_dimensions("Manual mask", image, manual.dimensions())?;
        }
        self.initialize()?;
        let automatic = self.automatic_mask(image)?;
        Self::merge_manual(automatic, manual_mask)
    }

    #[instrument(
        skip(self, image, preset, spec, manual_mask),
        fields(
            backend = %self.backend.name(),
            dimensions = %format!("{}x{}", image.width(), image.height()),
            preset = %preset
        )
    )]
    fn replace_with(
        &mut self,
        image: &RgbImage,
        preset: GradientPreset,
        spec: &GradientSpec,
        manual_mask: Option<&Mask>,
    ) -> Result<ReplacementResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();
        let (width, height) = image.dimensions();

        if let Some(manual) = manual_mask {
            Self::check_dimensions("Manual mask", image, manual.dimensions())?;
        }

        timings.model_load_ms = self.initialize()?;

        trace_info!(
            backend = %self.backend.name(),
            manual_mask = manual_mask.is_some(),
            "Starting background replacement"
        );

        let probabilities = {
            let _span = span!(Level::INFO, "segmentation", backend = %self.backend.name()).entered();
            let start = Instant::now();
            let probabilities = self.backend.probability_map(image)?;
            timings.segmentation_ms = start.elapsed().as_millis() as u64;
            probabilities
        };
        Self::check_dimensions("Probability map", image, probabilities.dimensions())?;

        let mask = {
            let _span = span!(Level::DEBUG, "mask_extraction", width = %width, height = %height)
                .entered();
            let start = Instant::now();
            let automatic = self.extractor.extract(&probabilities)?;
            trace_debug!(
                foreground_pixels = automatic.foreground_pixels(),
                "Automatic mask extracted"
            );
            let mask = Self::merge_manual(automatic, manual_mask)?;
            timings.mask_extraction_ms = start.elapsed().as_millis() as u64;
            mask
        };

        let result_image = {
            let _span = span!(Level::DEBUG, "compositing", preset = %preset).entered();
            let start = Instant::now();
            let background = create_gradient_background(width, height, spec);
            let composed = composite(image, &background, &mask)?;
            timings.compositing_ms = start.elapsed().as_millis() as u64;
            composed
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;

        let metadata = ProcessingMetadata {
            backend_name: self.backend.name().to_string(),
            background: preset,
            manual_mask_applied: manual_mask.is_some(),
            mask_statistics: mask.statistics(),
            timings,
            processed_at: Utc::now(),
        };
        let level = self.report_level();
        log!(level, "Background replacement timings: {}", metadata.timings.summary());
        log!(
            level,
            "Mask: {}/{} foreground pixels ({:.1}%)",
            metadata.mask_statistics.foreground_pixels,
            metadata.mask_statistics.total_pixels,
            metadata.mask_statistics.foreground_ratio * 100.0
        );

        Ok(ReplacementResult {
            image: result_image,
            mask,
            metadata,
        })
    }

    fn automatic_mask(&mut self, image: &RgbImage) -> Result<Mask> {
        let probabilities = self.backend.probability_map(image)?;
        Self::check_dimensions("Probability map", image, probabilities.dimensions())?;
        self.extractor.extract(&probabilities)
    }

    /// OR a binarized manual mask into the automatic one
    fn merge_manual(automatic: Mask, manual_mask: Option<&Mask>) -> Result<Mask> {
        match manual_mask {
            Some(manual) => {
                let binary = Mask::from_raw(manual.as_raw().to_vec(), manual.dimensions())?;
                automatic.combine(&binary)
            },
            None => Ok(automatic),
        }
    }

    fn check_dimensions(what: &str, image: &RgbImage, actual: (u32, u32)) -> Result<()> {
        if actual == image.dimensions() {
            Ok(())
        } else {
            Err(BackdropError::dimension_mismatch(
                what,
                image.dimensions(),
                actual,
            ))
        }
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ReplacementConfig {
        &self.config
    }

    /// Level for per-run timing and mask reports; `debug` config promotes them to info
    fn report_level(&self) -> log::Level {
        if self.config.debug {
            log::Level::Info
        } else {
            log::Level::Debug
        }
    }

    /// Name of the segmentation backend
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Check if the backend is initialized
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{test_utils::MockSegmenter, UniformSegmenter};
    use image::Rgb;

    fn replacer(backend: impl SegmentationBackend + 'static) -> BackgroundReplacer {
        BackgroundReplacer::new(ReplacementConfig::default(), Box::new(backend)).unwrap()
    }

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn test_debug_config_promotes_run_reports() {
        assert_eq!(replacer(UniformSegmenter::new(0.0).unwrap()).report_level(), log::Level::Debug);

        let config = ReplacementConfig::builder().debug(true).build().unwrap();
        let mut debugging =
            BackgroundReplacer::new(config, Box::new(UniformSegmenter::new(0.0).unwrap())).unwrap();
        assert_eq!(debugging.report_level(), log::Level::Info);
        let result = debugging
            .change_background(&white(8, 8), GradientPreset::Blue, None)
            .unwrap();
        assert!(result.mask.is_empty());
    }

    #[test]
    fn test_composite_partitions_pixels() {
        let image = RgbImage::from_pixel(4, 2, Rgb([1, 2, 3]));
        let background = RgbImage::from_pixel(4, 2, Rgb([9, 9, 9]));
        let mask = Mask::from_raw(vec![255, 0, 255, 0, 0, 0, 255, 255], (4, 2)).unwrap();

        let out = composite(&image, &background, &mask).unwrap();
        for (x, y, pixel) in out.enumerate_pixels() {
            let expected = if mask.is_foreground(x, y) {
                image.get_pixel(x, y)
            } else {
                background.get_pixel(x, y)
            };
            assert_eq!(pixel, expected);
        }
    }

    #[test]
    fn test_composite_rejects_mismatched_inputs() {
        let image = RgbImage::new(4, 4);
        assert!(matches!(
            composite(&image, &RgbImage::new(4, 3), &Mask::empty(4, 4)),
            Err(BackdropError::InvalidInput(_))
        ));
        assert!(matches!(
            composite(&image, &RgbImage::new(4, 4), &Mask::empty(3, 4)),
            Err(BackdropError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_full_foreground_keeps_source() {
        let mut replacer = replacer(UniformSegmenter::new(0.5).unwrap());
        let image = white(20, 10);
        let result = replacer
            .change_background(&image, GradientPreset::Blue, None)
            .unwrap();
        assert_eq!(result.image, image);
        assert_eq!(result.mask.foreground_pixels(), 200);
        assert_eq!(result.metadata.backend_name, "uniform");
        assert!(!result.metadata.manual_mask_applied);
    }

    #[test]
    fn test_empty_foreground_gives_pure_gradient() {
        let mut replacer = replacer(UniformSegmenter::new(0.0).unwrap());
        let image = white(12, 30);
        let result = replacer
            .change_background(&image, GradientPreset::Gray, None)
            .unwrap();
        let expected = create_gradient_background(12, 30, &GradientPreset::GRAY);
        assert_eq!(result.image, expected);
        assert!(result.mask.is_empty());
    }

    #[test]
    fn test_manual_mask_is_binarized_and_merged() {
        let mut replacer = replacer(UniformSegmenter::new(0.0).unwrap());
        let image = white(10, 10);
        let mut raw = vec![0u8; 100];
        raw[0] = 1;
        raw[99] = 200;
        let manual = Mask::from_raw(raw, (10, 10)).unwrap();

        let result = replacer
            .change_background(&image, GradientPreset::Blue, Some(&manual))
            .unwrap();
        assert!(result.metadata.manual_mask_applied);
        assert_eq!(result.mask.foreground_pixels(), 2);
        assert_eq!(result.image.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(result.image.get_pixel(9, 9), &Rgb([255, 255, 255]));
        assert_eq!(result.image.get_pixel(5, 0).0, GradientPreset::BLUE.top);
    }

    #[test]
    fn test_manual_mask_size_mismatch() {
        let backend = MockSegmenter::new();
        let history = backend.history_handle();
        let mut replacer = replacer(backend);
        let result =
            replacer.change_background(&white(10, 10), GradientPreset::Blue, Some(&Mask::empty(9, 10)));
        assert!(matches!(result, Err(BackdropError::InvalidInput(_))));
        // Rejected before the backend is touched
        assert!(history.lock().unwrap().is_empty());
    }

    #[test]
    fn test_backend_output_size_mismatch() {
        let mut replacer = replacer(MockSegmenter::new().with_output_size(5, 5));
        let result = replacer.change_background(&white(10, 10), GradientPreset::Blue, None);
        assert!(matches!(result, Err(BackdropError::InvalidInput(_))));
    }

    #[test]
    fn test_backend_initialized_once() {
        let backend = MockSegmenter::new();
        let history = backend.history_handle();
        let mut replacer = replacer(backend);
        assert!(!replacer.is_initialized());

        let image = white(30, 30);
        let first = replacer
            .change_background(&image, GradientPreset::Blue, None)
            .unwrap();
        assert!(first.metadata.timings.model_load_ms <= 1);
        replacer
            .change_background(&image, GradientPreset::Gray, None)
            .unwrap();

        assert_eq!(
            *history.lock().unwrap(),
            vec!["initialize", "probability_map", "probability_map"]
        );
    }

    #[test]
    fn test_backend_failures_propagate() {
        let mut failing = replacer(MockSegmenter::new_failing_init());
        assert!(matches!(
            failing.change_background(&white(4, 4), GradientPreset::Blue, None),
            Err(BackdropError::Model(_))
        ));

        let mut failing = replacer(MockSegmenter::new_failing_inference());
        assert!(matches!(
            failing.change_background(&white(4, 4), GradientPreset::Blue, None),
            Err(BackdropError::Segmentation(_))
        ));
    }

    #[test]
    fn test_extract_foreground_keeps_mock_disc() {
        let mut replacer = replacer(MockSegmenter::new());
        let mask = replacer.extract_foreground(&white(60, 60), None).unwrap();
        assert!(mask.is_foreground(30, 30));
        assert!(!mask.is_foreground(2, 2));
    }

    #[test]
    fn test_custom_gradient() {
        let mut replacer = replacer(UniformSegmenter::new(0.0).unwrap());
        let spec = GradientSpec::new([10, 20, 30], [10, 20, 30]);
        let result = replacer.with_gradient(&white(3, 3), &spec, None).unwrap();
        assert!(result.image.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ReplacementConfig {
            jpeg_quality: 0,
            ..ReplacementConfig::default()
        };
        assert!(BackgroundReplacer::new(config, Box::new(MockSegmenter::new())).is_err());
    }
}
