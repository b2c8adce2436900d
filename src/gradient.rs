//! Vertical gradient backgrounds
//!
//! Replacement backgrounds are linear top-to-bottom blends between two colors.
//! The two presets match the conventional backdrops used for ID photos.

use crate::error::{BackdropError, Result};
use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// A pair of colors blended from the first row to the last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradientSpec {
    /// Color of row 0
    pub top: [u8; 3],
    /// Color approached by the last row
    pub bottom: [u8; 3],
}

impl GradientSpec {
    #[must_use]
    pub const fn new(top: [u8; 3], bottom: [u8; 3]) -> Self {
        Self { top, bottom }
    }

    /// Color of row `y` in an image of `height` rows
    #[must_use]
    pub fn color_at(&self, y: u32, height: u32) -> Rgb<u8> {
        let alpha = if height == 0 {
            0.0
        } else {
            f64::from(y) / f64::from(height)
        };
        let mut channels = [0u8; 3];
        for (channel, (&top, &bottom)) in channels
            .iter_mut()
            .zip(self.top.iter().zip(self.bottom.iter()))
        {
            let value = (1.0 - alpha) * f64::from(top) + alpha * f64::from(bottom);
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(channels)
    }
}

/// Named gradient backgrounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientPreset {
    /// Light sky blue fading to a deeper blue
    #[default]
    Blue,
    /// Light gray fading to charcoal
    Gray,
}

impl GradientPreset {
    pub const BLUE: GradientSpec = GradientSpec::new([160, 200, 255], [90, 120, 180]);
    pub const GRAY: GradientSpec = GradientSpec::new([180, 180, 180], [60, 60, 60]);

    /// The colors of this preset
    #[must_use]
    pub fn spec(self) -> GradientSpec {
        match self {
            Self::Blue => Self::BLUE,
            Self::Gray => Self::GRAY,
        }
    }

    /// All presets, in display order
    #[must_use]
    pub fn all() -> [GradientPreset; 2] {
        [Self::Blue, Self::Gray]
    }
}

impl std::fmt::Display for GradientPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blue => write!(f, "blue"),
            Self::Gray => write!(f, "gray"),
        }
    }
}

impl std::str::FromStr for GradientPreset {
    type Err = BackdropError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(Self::Blue),
            "gray" | "grey" => Ok(Self::Gray),
            other => Err(BackdropError::invalid_config(format!(
                "Unknown background preset '{}'. Expected 'blue' or 'gray'",
                other
            ))),
        }
    }
}

/// Render a `width` x `height` image whose rows interpolate between the gradient's colors
#[must_use]
pub fn create_gradient_background(width: u32, height: u32, spec: &GradientSpec) -> RgbImage {
    let rows: Vec<Rgb<u8>> = (0..height).map(|y| spec.color_at(y, height)).collect();
    ImageBuffer::from_fn(width, height, |_, y| {
        rows.get(y as usize).copied().unwrap_or(Rgb(spec.bottom))
    })
}
