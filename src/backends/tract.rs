//! Tract backend for selfie-segmentation models
//!
//! Runs an ONNX person-segmentation model with Tract, a pure Rust inference
//! engine. The default input geometry is the 256x144 landscape layout of the
//! common selfie-segmentation models: NHWC, RGB, values scaled to `[0, 1]`,
//! one foreground-probability channel out.

use crate::{
    error::{BackdropError, Result},
    segmentation::SegmentationBackend,
    types::ProbabilityMap,
};
use image::{imageops::FilterType, RgbImage};
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

// Use instant crate for cross-platform time compatibility
use instant::{Duration, Instant};

/// Default model input width
pub const DEFAULT_INPUT_WIDTH: u32 = 256;
/// Default model input height
pub const DEFAULT_INPUT_HEIGHT: u32 = 144;

/// Tract backend for running segmentation models using pure Rust inference
#[derive(Debug)]
pub struct TractSegmenter {
    model_path: PathBuf,
    input_size: (u32, u32),
    model: Option<TractModel>,
    initialized: bool,
}

impl TractSegmenter {
    /// Create a new uninitialized backend for the model at `model_path`
    #[must_use]
    pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            input_size: (DEFAULT_INPUT_WIDTH, DEFAULT_INPUT_HEIGHT),
            model: None,
            initialized: false,
        }
    }

    /// Override the model's input width and height
    ///
    /// # Errors
    /// - Zero width or height
    pub fn with_input_size(mut self, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BackdropError::invalid_config(format!(
                "Model input size must be non-zero, got {}x{}",
                width, height
            )));
        }
        self.input_size = (width, height);
        Ok(self)
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Model input size as (width, height)
    #[must_use]
    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// Load and initialize the model using Tract
    fn load_model(&mut self) -> Result<Duration> {
        let model_load_start = Instant::now();
        let (width, height) = self.input_size;

        log::info!("Initializing Tract backend");
        log::info!("Model: {}", self.model_path.display());
        log::info!("Input: {}x{} NHWC", width, height);

        if !self.model_path.is_file() {
            return Err(BackdropError::model(format!(
                "Model file not found: {}",
                self.model_path.display()
            )));
        }

        let model = onnx()
            .model_for_path(&self.model_path)
            .map_err(|e| BackdropError::model(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([1, height as usize, width as usize, 3]).into())
            .map_err(|e| BackdropError::model(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| BackdropError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| {
                BackdropError::model(format!("Failed to create runnable model: {e}"))
            })?;

        self.model = Some(model);
        self.initialized = true;

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "Tract backend initialized in {}ms",
            model_load_time.as_millis()
        );

        Ok(model_load_time)
    }

    /// Resize to the model input and pack as NHWC `f32` in `[0, 1]`
    fn input_tensor(&self, image: &RgbImage) -> Result<Tensor> {
        let (width, height) = self.input_size;
        let resized = image::imageops::resize(image, width, height, FilterType::Triangle);
        let data: Vec<f32> = resized
            .as_raw()
            .iter()
            .map(|&v| f32::from(v) / 255.0)
            .collect();
        Tensor::from_shape::<f32>(&[1, height as usize, width as usize, 3], &data).map_err(|e| {
            BackdropError::segmentation(format!("Failed to build input tensor: {e}"))
        })
    }
}

/// Spatial size (height, width) of a single-channel segmentation output
fn output_spatial_dims(shape: &[usize]) -> Option<(usize, usize)> {
    match *shape {
        [1, h, w, 1] | [1, 1, h, w] | [1, h, w] | [h, w] => Some((h, w)),
        _ => None,
    }
}

impl SegmentationBackend for TractSegmenter {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None); // No model loading time for already initialized backend
        }

        let model_load_time = self.load_model()?;
        Ok(Some(model_load_time))
    }

    fn probability_map(&mut self, image: &RgbImage) -> Result<ProbabilityMap> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| BackdropError::segmentation("Tract model not initialized"))?;

        let inference_start = Instant::now();
        let input = self.input_tensor(image)?;
        log::debug!("Running Tract inference, input {:?}", input.shape());

        let outputs = model
            .run(tvec![input.into()])
            .map_err(|e| BackdropError::segmentation(format!("Tract inference failed: {e}")))?;

        let output = outputs
            .first()
            .ok_or_else(|| BackdropError::segmentation("No output tensor found"))?;
        let (out_height, out_width) = output_spatial_dims(output.shape()).ok_or_else(|| {
            BackdropError::segmentation(format!(
                "Expected a single-channel mask output, got shape {:?}",
                output.shape()
            ))
        })?;
        let values = output.as_slice::<f32>().map_err(|e| {
            BackdropError::segmentation(format!("Failed to read output tensor: {e}"))
        })?;

        let map = ProbabilityMap::from_raw(out_width as u32, out_height as u32, values.to_vec())?;
        let (width, height) = image.dimensions();

        log::debug!(
            "Tract inference completed in {}ms, output {}x{}",
            inference_start.elapsed().as_millis(),
            out_width,
            out_height
        );

        Ok(map.resize(width, height))
    }

    fn name(&self) -> &str {
        "tract"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
