//! Configuration types for background replacement operations

use crate::error::{BackdropError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the subject is chosen among the connected components of the thresholded mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentSelection {
    /// Largest component by pixel count; ties go to the one with more pixels in the top half
    #[default]
    Largest,
    /// Component with the most pixels in the top half of the image; ties go to the larger one
    PreferTopHalf,
}

impl std::fmt::Display for ComponentSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Largest => write!(f, "largest"),
            Self::PreferTopHalf => write!(f, "prefer-top-half"),
        }
    }
}

/// Parameters of automatic foreground extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Probabilities strictly greater than this become foreground
    pub probability_threshold: f32,
    /// Side length of the square closing element (odd)
    pub closing_kernel_size: u32,
    /// Closing iterations (dilations, then as many erosions)
    pub closing_iterations: u32,
    /// Subject selection policy
    pub selection: ComponentSelection,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            probability_threshold: 0.1,
            closing_kernel_size: 5,
            closing_iterations: 2,
            selection: ComponentSelection::Largest,
        }
    }
}

impl ExtractionConfig {
    /// Validate extraction parameters
    ///
    /// # Errors
    /// - Threshold outside `0.0..1.0` or not finite
    /// - Even closing kernel size
    /// - Closing radius (kernel radius times iterations) above 255
    pub fn validate(&self) -> Result<()> {
        if !self.probability_threshold.is_finite()
            || !(0.0..1.0).contains(&self.probability_threshold)
        {
            return Err(BackdropError::config_value_error(
                "probability threshold",
                self.probability_threshold,
                "0.0-1.0 (exclusive)",
                Some(0.1),
            ));
        }
        if self.closing_kernel_size == 0 || self.closing_kernel_size % 2 == 0 {
            return Err(BackdropError::config_value_error(
                "closing kernel size",
                self.closing_kernel_size,
                "odd values >= 1",
                Some(5),
            ));
        }
        self.closing_radius()?;
        Ok(())
    }

    /// Radius of the single square element equivalent to the iterated closing element
    pub fn closing_radius(&self) -> Result<u8> {
        let radius = u64::from(self.closing_kernel_size / 2) * u64::from(self.closing_iterations);
        u8::try_from(radius).map_err(|_| {
            BackdropError::config_value_error(
                "closing radius (kernel/2 x iterations)",
                radius,
                "0-255",
                Some(4),
            )
        })
    }
}

/// Parameters of user stroke rasterization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Width of the drawn line segments in pixels
    pub thickness: u32,
    /// Side length of the square dilation element
    pub dilation_kernel_size: u32,
    /// Dilation iterations
    pub dilation_iterations: u32,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            thickness: 5,
            dilation_kernel_size: 10,
            dilation_iterations: 2,
        }
    }
}

impl StrokeConfig {
    /// Validate stroke parameters
    ///
    /// # Errors
    /// - Zero thickness or zero dilation kernel
    pub fn validate(&self) -> Result<()> {
        if self.thickness == 0 {
            return Err(BackdropError::config_value_error(
                "stroke thickness",
                self.thickness,
                ">= 1",
                Some(5),
            ));
        }
        if self.dilation_kernel_size == 0 {
            return Err(BackdropError::config_value_error(
                "stroke dilation kernel size",
                self.dilation_kernel_size,
                ">= 1",
                Some(10),
            ));
        }
        Ok(())
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// JPEG with configurable quality
    Jpeg,
}

impl OutputFormat {
    /// Pick the format from a file extension (`png`, `jpg`, `jpeg`; case-insensitive)
    ///
    /// # Errors
    /// - Missing or unrecognized extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some(other) => Err(BackdropError::unsupported_format(format!(
                "'{}' (expected png, jpg or jpeg) for {}",
                other,
                path.display()
            ))),
            None => Err(BackdropError::unsupported_format(format!(
                "no file extension on {}",
                path.display()
            ))),
        }
    }

    /// Like [`OutputFormat::from_path`], but an extensionless path takes `fallback`
    ///
    /// # Errors
    /// - Unrecognized extension
    pub fn from_path_or(path: &Path, fallback: Self) -> Result<Self> {
        if path.extension().is_none() {
            return Ok(fallback);
        }
        Self::from_path(path)
    }

    /// Canonical file extension
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    #[must_use]
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// Configuration for background replacement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementConfig {
    /// Automatic foreground extraction
    pub extraction: ExtractionConfig,

    /// User stroke rasterization
    pub stroke: StrokeConfig,

    /// Format for generated output names and for session saves to extensionless paths
    pub output_format: OutputFormat,

    /// JPEG quality (1-100, only used for JPEG output)
    pub jpeg_quality: u8,

    /// Enable debug mode (additional logging)
    pub debug: bool,
}

impl Default for ReplacementConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            stroke: StrokeConfig::default(),
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
            debug: false,
        }
    }
}

impl ReplacementConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idphoto_backdrop::{ReplacementConfig, OutputFormat};
    ///
    /// let config = ReplacementConfig::builder()
    ///     .probability_threshold(0.2)
    ///     .output_format(OutputFormat::Jpeg)
    ///     .jpeg_quality(95)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.jpeg_quality, 95);
    /// ```
    #[must_use]
    pub fn builder() -> ReplacementConfigBuilder {
        ReplacementConfigBuilder::default()
    }

    /// Load a configuration from a JSON file; missing fields take their defaults
    ///
    /// # Errors
    /// - File cannot be read
    /// - Invalid JSON or field types
    /// - Values rejected by [`ReplacementConfig::validate`]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BackdropError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            BackdropError::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Invalid extraction or stroke parameters
    /// - JPEG quality outside 1-100
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idphoto_backdrop::ReplacementConfig;
    ///
    /// let mut config = ReplacementConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.jpeg_quality = 150;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;
        self.stroke.validate()?;
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(BackdropError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "1-100",
                Some(90),
            ));
        }
        Ok(())
    }
}

/// Builder for `ReplacementConfig`
#[derive(Debug, Default)]
pub struct ReplacementConfigBuilder {
    config: ReplacementConfig,
}

impl ReplacementConfigBuilder {
    #[must_use]
    pub fn extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.config.extraction = extraction;
        self
    }

    #[must_use]
    pub fn probability_threshold(mut self, threshold: f32) -> Self {
        self.config.extraction.probability_threshold = threshold;
        self
    }

    #[must_use]
    pub fn closing(mut self, kernel_size: u32, iterations: u32) -> Self {
        self.config.extraction.closing_kernel_size = kernel_size;
        self.config.extraction.closing_iterations = iterations;
        self
    }

    #[must_use]
    pub fn component_selection(mut self, selection: ComponentSelection) -> Self {
        self.config.extraction.selection = selection;
        self
    }

    #[must_use]
    pub fn stroke(mut self, stroke: StrokeConfig) -> Self {
        self.config.stroke = stroke;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any parameter rejected by [`ReplacementConfig::validate`]
    pub fn build(self) -> Result<ReplacementConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
