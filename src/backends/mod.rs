//! Segmentation backend implementations
//!
//! This module provides the concrete backends for the background replacer:
//! - Tract backend (pure Rust ONNX inference for selfie-segmentation models)
//! - Uniform backend (constant probability, no model)
//! - Mask image backend (probabilities read from a grayscale matte)
//!
//! [`SegmenterSpec`] names a backend in the `kind:argument` form used on the
//! command line and [`BackendFactory`] turns a spec into a boxed backend.

mod mask_image;
mod uniform;

#[cfg(feature = "tract")]
pub mod tract;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

pub use self::mask_image::MaskImageSegmenter;
pub use self::uniform::UniformSegmenter;

#[cfg(feature = "tract")]
pub use self::tract::TractSegmenter;

use crate::{
    error::{BackdropError, Result},
    segmentation::SegmentationBackend,
};
use std::{fmt, path::PathBuf, str::FromStr};

/// Which segmentation backend to use and how to configure it
#[derive(Debug, Clone, PartialEq)]
pub enum SegmenterSpec {
    /// ONNX model run with Tract
    Tract {
        model_path: PathBuf,
        /// Model input (width, height); backend default when `None`
        input_size: Option<(u32, u32)>,
    },
    /// Constant probability everywhere
    Uniform(f32),
    /// Grayscale matte image
    MaskImage(PathBuf),
}

impl SegmenterSpec {
    /// Backend kind as written before the colon
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tract { .. } => "tract",
            Self::Uniform(_) => "uniform",
            Self::MaskImage(_) => "mask",
        }
    }

    /// Apply a model input size; only meaningful for model backends
    #[must_use]
    pub fn with_input_size(self, size: Option<(u32, u32)>) -> Self {
        match self {
            Self::Tract {
                model_path,
                input_size,
            } => Self::Tract {
                model_path,
                input_size: size.or(input_size),
            },
            other => other,
        }
    }
}

impl fmt::Display for SegmenterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tract { model_path, .. } => write!(f, "tract:{}", model_path.display()),
            Self::Uniform(p) => write!(f, "uniform:{p}"),
            Self::MaskImage(path) => write!(f, "mask:{}", path.display()),
        }
    }
}

impl FromStr for SegmenterSpec {
    type Err = BackdropError;

    /// Parse `tract:<model.onnx>`, `uniform:<probability>` or `mask:<image>`
    fn from_str(s: &str) -> Result<Self> {
        let (kind, argument) = s.split_once(':').ok_or_else(|| {
            BackdropError::invalid_config(format!(
                "Invalid segmenter '{s}'. Expected tract:<model>, uniform:<p> or mask:<image>"
            ))
        })?;
        if argument.is_empty() {
            return Err(BackdropError::invalid_config(format!(
                "Segmenter '{kind}' requires an argument"
            )));
        }

        match kind.to_ascii_lowercase().as_str() {
            "tract" | "onnx" => Ok(Self::Tract {
                model_path: PathBuf::from(argument),
                input_size: None,
            }),
            "uniform" => {
                let probability: f32 = argument.parse().map_err(|_| {
                    BackdropError::invalid_config(format!(
                        "Invalid uniform probability '{argument}'"
                    ))
                })?;
                if !(0.0..=1.0).contains(&probability) {
                    return Err(BackdropError::config_value_error(
                        "uniform probability",
                        probability,
                        "0.0-1.0",
                        None,
                    ));
                }
                Ok(Self::Uniform(probability))
            },
            "mask" => Ok(Self::MaskImage(PathBuf::from(argument))),
            other => Err(BackdropError::invalid_config(format!(
                "Unknown segmenter kind '{other}'. Expected tract, uniform or mask"
            ))),
        }
    }
}

/// Factory trait for creating segmentation backends
pub trait BackendFactory {
    /// Create an uninitialized backend for the given spec
    ///
    /// # Errors
    /// - Backend kind not compiled in
    /// - Invalid backend parameters
    fn create_backend(&self, spec: &SegmenterSpec) -> Result<Box<dyn SegmentationBackend>>;

    /// Backend kinds this factory can create
    fn available_backends(&self) -> Vec<&'static str>;
}

/// Factory for the backends built into this crate
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(&self, spec: &SegmenterSpec) -> Result<Box<dyn SegmentationBackend>> {
        match spec {
            #[cfg(feature = "tract")]
            SegmenterSpec::Tract {
                model_path,
                input_size,
            } => {
                let backend = TractSegmenter::new(model_path);
                let backend = match input_size {
                    Some((width, height)) => backend.with_input_size(*width, *height)?,
                    None => backend,
                };
                Ok(Box::new(backend))
            },
            #[cfg(not(feature = "tract"))]
            SegmenterSpec::Tract { .. } => Err(BackdropError::invalid_config(
                "Tract backend not available. Rebuild with the `tract` feature",
            )),
            SegmenterSpec::Uniform(probability) => {
                Ok(Box::new(UniformSegmenter::new(*probability)?))
            },
            SegmenterSpec::MaskImage(path) => Ok(Box::new(MaskImageSegmenter::from_path(path))),
        }
    }

    fn available_backends(&self) -> Vec<&'static str> {
        let mut backends = Vec::new();
        if cfg!(feature = "tract") {
            backends.push("tract");
        }
        backends.push("uniform");
        backends.push("mask");
        backends
    }
}
