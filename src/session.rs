//! Interactive editing state, independent of any GUI toolkit
//!
//! An [`EditSession`] holds the current image, the user's stroke path and the
//! drawing toggle. Each background change replaces the current image, so
//! repeated edits compose; strokes persist until cleared.

use crate::{
    config::OutputFormat,
    error::{BackdropError, Result},
    gradient::GradientPreset,
    processor::BackgroundReplacer,
    services::ImageIOService,
    stroke::{Point, StrokePath},
    types::{Mask, ProcessingMetadata},
    viewport::DisplayMapping,
};
use image::RgbImage;
use log::{debug, info};
use std::path::Path;

#[derive(Debug)]
pub struct EditSession {
    replacer: BackgroundReplacer,
    current: Option<RgbImage>,
    strokes: StrokePath,
    drawing_enabled: bool,
    last_metadata: Option<ProcessingMetadata>,
    last_mask: Option<Mask>,
}

impl EditSession {
    #[must_use]
    pub fn new(replacer: BackgroundReplacer) -> Self {
        Self {
            replacer,
            current: None,
            strokes: StrokePath::new(),
            drawing_enabled: false,
            last_metadata: None,
            last_mask: None,
        }
    }

    /// Load an image file and make it the current image
    ///
    /// # Errors
    /// - File missing or not a decodable image
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let image = ImageIOService::load_image(path.as_ref())?;
        info!(
            "Opened {} ({}x{})",
            path.as_ref().display(),
            image.width(),
            image.height()
        );
        self.load_image(image);
        Ok(())
    }

    /// Replace the current image; strokes are kept
    pub fn load_image(&mut self, image: RgbImage) {
        self.current = Some(image);
        self.last_metadata = None;
        self.last_mask = None;
    }

    #[must_use]
    pub fn current_image(&self) -> Option<&RgbImage> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn has_image(&self) -> bool {
        self.current.is_some()
    }

    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        self.drawing_enabled = enabled;
    }

    #[must_use]
    pub fn is_drawing_enabled(&self) -> bool {
        self.drawing_enabled
    }

    /// Append a point in image coordinates
    ///
    /// Ignored unless drawing is enabled and an image is loaded; returns
    /// whether the point was recorded.
    pub fn add_point(&mut self, point: Point) -> bool {
        if !self.drawing_enabled || self.current.is_none() {
            return false;
        }
        self.strokes.push(point);
        true
    }

    /// Append a point given in widget coordinates of a `widget_size` display
    pub fn add_display_point(&mut self, widget_size: (u32, u32), x: i32, y: i32) -> bool {
        match self.display_mapping(widget_size) {
            Some(mapping) => self.add_point(mapping.to_image(x, y)),
            None => false,
        }
    }

    /// How the current image is laid out in a widget of `widget_size`
    #[must_use]
    pub fn display_mapping(&self, widget_size: (u32, u32)) -> Option<DisplayMapping> {
        self.current
            .as_ref()
            .and_then(|image| DisplayMapping::fit(widget_size, image.dimensions()))
    }

    pub fn clear_strokes(&mut self) {
        debug!("Clearing {} stroke points", self.strokes.len());
        self.strokes.clear();
    }

    #[must_use]
    pub fn strokes(&self) -> &StrokePath {
        &self.strokes
    }

    /// Rasterized strokes, if drawing is enabled and there is anything drawn
    #[must_use]
    pub fn manual_mask(&self) -> Option<Mask> {
        let image = self.current.as_ref()?;
        if !self.drawing_enabled || self.strokes.is_empty() {
            return None;
        }
        let (width, height) = image.dimensions();
        Some(
            self.strokes
                .rasterize(width, height, &self.replacer.config().stroke),
        )
    }

    /// Replace the background of the current image
    ///
    /// # Errors
    /// - No image loaded
    /// - Segmentation or compositing failures
    pub fn change_background(&mut self, preset: GradientPreset) -> Result<&ProcessingMetadata> {
        let manual_mask = self.manual_mask();
        let image = self
            .current
            .as_ref()
            .ok_or_else(|| BackdropError::invalid_input("No image loaded"))?;
        let result = self
            .replacer
            .change_background(image, preset, manual_mask.as_ref())?;

        info!(
            "Changed background to {} ({})",
            preset,
            result.metadata.timings.summary()
        );
        self.current = Some(result.image);
        self.last_mask = Some(result.mask);
        Ok(self.last_metadata.insert(result.metadata))
    }

    /// Save the current image; the format follows the extension, or the
    /// configured output format when the path has none
    ///
    /// # Errors
    /// - No image loaded
    /// - Unsupported extension or write failure
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image = self.require_image()?;
        let config = self.replacer.config();
        let format = OutputFormat::from_path_or(path.as_ref(), config.output_format)?;
        ImageIOService::save_image(image, path, format, config.jpeg_quality)
    }

    /// Metadata of the most recent background change on the current image
    #[must_use]
    pub fn last_metadata(&self) -> Option<&ProcessingMetadata> {
        self.last_metadata.as_ref()
    }

    /// Combined mask used by the most recent background change
    #[must_use]
    pub fn last_mask(&self) -> Option<&Mask> {
        self.last_mask.as_ref()
    }

    #[must_use]
    pub fn replacer(&self) -> &BackgroundReplacer {
        &self.replacer
    }

    fn require_image(&self) -> Result<&RgbImage> {
        self.current
            .as_ref()
            .ok_or_else(|| BackdropError::invalid_input("No image loaded"))
    }
}
