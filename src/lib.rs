#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # ID Photo Backdrop
//!
//! Replace the background of a portrait ID photo with a vertical gradient
//! (blue or gray), optionally refined by strokes the user draws over parts
//! of the subject the segmentation missed.
//!
//! ## Pipeline
//!
//! 1. A [`SegmentationBackend`] produces a per-pixel foreground probability map
//! 2. [`ForegroundExtractor`] thresholds it, closes small gaps and keeps the
//!    single subject component
//! 3. The user's [`StrokePath`], rasterized and dilated, is OR-ed in
//! 4. Source pixels are kept under the mask; everything else becomes the
//!    gradient
//!
//! ## Features
//!
//! - **Backends**: Tract (pure Rust ONNX inference for selfie-segmentation
//!   models), constant probability, or a grayscale matte image
//! - **Presets**: blue and gray gradients, or any [`GradientSpec`]
//! - **Editing state**: [`EditSession`] and [`DisplayMapping`] carry the
//!   interactive workflow without tying it to a GUI toolkit
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use idphoto_backdrop::{
//!     backends::{BackendFactory, DefaultBackendFactory, SegmenterSpec},
//!     BackgroundReplacer, GradientPreset, ReplacementConfig, services::ImageIOService,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let spec: SegmenterSpec = "tract:models/selfie_segmenter_landscape.onnx".parse()?;
//! let backend = DefaultBackendFactory.create_backend(&spec)?;
//! let mut replacer = BackgroundReplacer::new(ReplacementConfig::default(), backend)?;
//!
//! let photo = ImageIOService::load_image("portrait.jpg")?;
//! let result = replacer.change_background(&photo, GradientPreset::Blue, None)?;
//! result.save("portrait_blue.jpg", 90)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): Pure Rust ONNX segmentation backend
//! - `cli` (default): Command-line interface and tracing setup
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! idphoto-backdrop = { version = "0.1", default-features = false, features = ["tract"] }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod gradient;
pub mod morphology;
pub mod processor;
pub mod segmentation;
pub mod services;
pub mod session;
pub mod stroke;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod viewport;

use std::path::Path;

// Public API exports
pub use backends::{
    BackendFactory, DefaultBackendFactory, MaskImageSegmenter, SegmenterSpec, UniformSegmenter,
};
#[cfg(feature = "tract")]
pub use backends::TractSegmenter;
pub use config::{
    ComponentSelection, ExtractionConfig, OutputFormat, ReplacementConfig,
    ReplacementConfigBuilder, StrokeConfig,
};
pub use error::{BackdropError, Result};
pub use extraction::ForegroundExtractor;
pub use gradient::{create_gradient_background, GradientPreset, GradientSpec};
pub use processor::{composite, BackgroundReplacer};
pub use segmentation::SegmentationBackend;
pub use services::ImageIOService;
pub use session::EditSession;
pub use stroke::{Point, StrokePath};
pub use types::{
    Mask, MaskStatistics, ProbabilityMap, ProcessingMetadata, ProcessingTimings,
    ReplacementResult,
};
pub use viewport::{DisplayMapping, DisplayRect};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Replace the background of an in-memory image in one call
///
/// Builds the backend described by `segmenter`, rasterizes `strokes` (if any)
/// with the configured stroke settings, and runs a single background change.
///
/// # Examples
/// ```rust,no_run
/// use idphoto_backdrop::{replace_background, GradientPreset, ReplacementConfig, SegmenterSpec};
/// use image::RgbImage;
///
/// # fn example(photo: RgbImage) -> anyhow::Result<()> {
/// let segmenter: SegmenterSpec = "mask:matte.png".parse()?;
/// let result = replace_background(
///     &photo,
///     GradientPreset::Gray,
///     None,
///     &segmenter,
///     &ReplacementConfig::default(),
/// )?;
/// let png_bytes = result.to_bytes(idphoto_backdrop::OutputFormat::Png, 100)?;
/// # Ok(())
/// # }
/// ```
pub fn replace_background(
    image: &image::RgbImage,
    preset: GradientPreset,
    strokes: Option<&StrokePath>,
    segmenter: &SegmenterSpec,
    config: &ReplacementConfig,
) -> Result<ReplacementResult> {
    let backend = DefaultBackendFactory.create_backend(segmenter)?;
    let mut replacer = BackgroundReplacer::new(config.clone(), backend)?;
    let (width, height) = image.dimensions();
    let manual_mask = strokes
        .filter(|path| !path.is_empty())
        .map(|path| path.rasterize(width, height, &config.stroke));
    replacer.change_background(image, preset, manual_mask.as_ref())
}

/// Load an image file and replace its background
///
/// # Errors
/// - Input file missing or undecodable
/// - Same failures as [`replace_background`]
pub fn replace_background_from_file<P: AsRef<Path>>(
    input: P,
    preset: GradientPreset,
    strokes: Option<&StrokePath>,
    segmenter: &SegmenterSpec,
    config: &ReplacementConfig,
) -> Result<ReplacementResult> {
    let image = ImageIOService::load_image(input)?;
    replace_background(&image, preset, strokes, segmenter, config)
}
